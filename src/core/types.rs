// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! src/core/types.rs
//!
//! Core type definitions for key remapping
//!
//! This module defines the fundamental types used throughout the application:
//! - `Modifier` / `Modifiers`: X11 modifier bits (Shift, Control, Mod1, Mod4)
//! - `KeyCombo`: A keysym plus a lock-normalised modifier mask
//! - `MappingId`: Short random identifier for a mapping
//! - `KeyMapping`: Source combo, target sequence and metadata
//! - `Settings`: Persisted application preferences

use serde::{Deserialize, Serialize};
use std::fmt;

/// X11 ShiftMask
pub const MOD_SHIFT: u16 = 1 << 0;
/// X11 LockMask (Caps Lock)
pub const MOD_LOCK: u16 = 1 << 1;
/// X11 ControlMask
pub const MOD_CTRL: u16 = 1 << 2;
/// X11 Mod1Mask (Alt)
pub const MOD_ALT: u16 = 1 << 3;
/// X11 Mod2Mask (Num Lock on almost every layout)
pub const MOD_NUMLOCK: u16 = 1 << 4;
/// X11 Mod4Mask (Super)
pub const MOD_SUPER: u16 = 1 << 6;

/// Keyboard modifier keys that may take part in a mapping
///
/// Declaration order is display order: `Ctrl+Alt+Shift+Super+Key`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Modifier {
    /// Control key
    Ctrl,
    /// Alt key (Mod1)
    Alt,
    /// Shift key
    Shift,
    /// Super/Windows key (Mod4)
    Super,
}

impl Modifier {
    /// All modifiers in display order
    pub const ALL: [Modifier; 4] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift, Modifier::Super];

    /// Order in which modifiers are pressed during synthesis
    pub const PRESS_ORDER: [Modifier; 4] =
        [Modifier::Shift, Modifier::Ctrl, Modifier::Alt, Modifier::Super];

    /// X11 mask bit for this modifier
    pub const fn mask(self) -> u16 {
        match self {
            Modifier::Ctrl => MOD_CTRL,
            Modifier::Alt => MOD_ALT,
            Modifier::Shift => MOD_SHIFT,
            Modifier::Super => MOD_SUPER,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Super => write!(f, "Super"),
        }
    }
}

/// Set of modifier bits, stored exactly as X11 reports them
///
/// The Lock and NumLock bits are always stripped, so two sets that only
/// differ in lock state compare equal.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Modifiers(u16);

impl Modifiers {
    /// No modifiers held
    pub const NONE: Modifiers = Modifiers(0);

    /// Bits a mapping may use
    pub const SUPPORTED: u16 = MOD_SHIFT | MOD_CTRL | MOD_ALT | MOD_SUPER;

    /// Bits ignored when comparing combos
    pub const LOCK_BITS: u16 = MOD_LOCK | MOD_NUMLOCK;

    /// Builds a set from raw X11 bits, dropping the lock bits
    ///
    /// Unknown bits (Mod3, Mod5) are kept so validation can reject them.
    pub const fn from_bits(bits: u16) -> Self {
        Modifiers(bits & !Self::LOCK_BITS)
    }

    /// Raw X11 mask
    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.mask() != 0
    }

    #[must_use]
    pub const fn with(self, modifier: Modifier) -> Self {
        Modifiers(self.0 | modifier.mask())
    }

    #[must_use]
    pub const fn without(self, modifier: Modifier) -> Self {
        Modifiers(self.0 & !modifier.mask())
    }

    /// Bits outside the supported set
    pub const fn unsupported_bits(self) -> u16 {
        self.0 & !Self::SUPPORTED
    }

    /// Held modifiers in display order
    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter().fold(Modifiers::NONE, Modifiers::with)
    }
}

impl From<Modifier> for Modifiers {
    fn from(modifier: Modifier) -> Self {
        Modifiers::NONE.with(modifier)
    }
}

/// A keysym plus the modifiers that must be held with it
///
/// Immutable once built. Equality is exact (keysym and modifier bits) and
/// is what decides whether two mappings fight over the same physical key.
///
/// # Example
/// ```
/// use rekey::core::{KeyCombo, Modifier, Modifiers, keysym};
///
/// let combo = KeyCombo::new(keysym::F1, Modifiers::from(Modifier::Ctrl));
/// assert_eq!(combo.to_string(), "Ctrl+F1");
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "ComboRecord", into = "ComboRecord")]
pub struct KeyCombo {
    symbol: u32,
    modifiers: Modifiers,
}

impl KeyCombo {
    /// Creates a combo, normalising away the lock bits
    pub const fn new(symbol: u32, modifiers: Modifiers) -> Self {
        Self {
            symbol,
            modifiers: Modifiers::from_bits(modifiers.bits()),
        }
    }

    /// Creates a combo from a raw X11 modifier mask
    pub const fn from_raw(symbol: u32, bits: u16) -> Self {
        Self {
            symbol,
            modifiers: Modifiers::from_bits(bits),
        }
    }

    /// Combo with no modifiers
    pub const fn bare(symbol: u32) -> Self {
        Self::from_raw(symbol, 0)
    }

    pub const fn symbol(&self) -> u32 {
        self.symbol
    }

    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::core::keys::KeyNames::global().describe(self))
    }
}

/// On-disk shape of a combo: `{ "symbol": int, "modifiers": int }`
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
struct ComboRecord {
    symbol: u32,
    #[serde(default)]
    modifiers: u16,
}

impl From<ComboRecord> for KeyCombo {
    fn from(record: ComboRecord) -> Self {
        KeyCombo::from_raw(record.symbol, record.modifiers)
    }
}

impl From<KeyCombo> for ComboRecord {
    fn from(combo: KeyCombo) -> Self {
        ComboRecord {
            symbol: combo.symbol,
            modifiers: combo.modifiers.bits(),
        }
    }
}

/// Identifier of a mapping: 8 lowercase hex characters
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MappingId(String);

impl MappingId {
    /// Generates a fresh random id
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        MappingId(uuid[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MappingId {
    fn from(value: &str) -> Self {
        MappingId(value.to_string())
    }
}

impl From<String> for MappingId {
    fn from(value: String) -> Self {
        MappingId(value)
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A complete remapping: pressing `source` types `target` instead
///
/// Among enabled mappings no two share a `source`. Disabled mappings are
/// exempt, so a disabled duplicate may sit next to a live one.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyMapping {
    pub id: MappingId,

    /// Combo that is intercepted
    pub source: KeyCombo,

    /// Sequence synthesised in its place, in order
    pub target: Vec<KeyCombo>,

    pub enabled: bool,

    #[serde(default)]
    pub description: String,
}

impl KeyMapping {
    /// Creates an enabled mapping with a fresh id
    pub fn new(source: KeyCombo, target: Vec<KeyCombo>, description: impl Into<String>) -> Self {
        Self {
            id: MappingId::generate(),
            source,
            target,
            enabled: true,
            description: description.into(),
        }
    }

    /// Target sequence rendered as `Ctrl+C Ctrl+V`
    pub fn target_label(&self) -> String {
        self.target
            .iter()
            .map(|combo| combo.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for KeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.source, self.target_label())?;

        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }

        Ok(())
    }
}

/// Persisted application preferences
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Start without showing the window
    pub start_minimized: bool,

    /// Grab enabled mappings when the application starts
    pub enable_on_startup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_minimized: false,
            enable_on_startup: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keysym;

    #[test]
    fn test_modifier_display() {
        assert_eq!(format!("{}", Modifier::Super), "Super");
        assert_eq!(format!("{}", Modifier::Ctrl), "Ctrl");
    }

    #[test]
    fn test_lock_bits_are_stripped() {
        let plain = KeyCombo::from_raw(keysym::F1, MOD_CTRL);
        let caps = KeyCombo::from_raw(keysym::F1, MOD_CTRL | MOD_LOCK);
        let both = KeyCombo::from_raw(keysym::F1, MOD_CTRL | MOD_LOCK | MOD_NUMLOCK);

        assert_eq!(plain, caps);
        assert_eq!(plain, both);
        assert_eq!(both.modifiers().bits(), MOD_CTRL);
    }

    #[test]
    fn test_modifiers_from_iter_ignores_order() {
        let a: Modifiers = [Modifier::Super, Modifier::Shift].into_iter().collect();
        let b: Modifiers = [Modifier::Shift, Modifier::Super].into_iter().collect();

        assert_eq!(a, b);
        assert_eq!(a.bits(), MOD_SHIFT | MOD_SUPER);
    }

    #[test]
    fn test_mapping_id_shape() {
        let id = MappingId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.start_minimized);
        assert!(settings.enable_on_startup);
    }
}
