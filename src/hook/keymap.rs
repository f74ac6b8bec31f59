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

//! Snapshot of the server's keycode-to-keysym table.
//!
//! Built from the `GetKeyboardMapping` and `GetModifierMapping` replies and
//! rebuilt whenever the server reports a layout change. Nothing in here
//! talks to the server.

use crate::core::{keysym, KeyCombo, Modifier, MOD_NUMLOCK, MOD_SHIFT};

/// Keysyms per keycode, flattened the way the server sends them.
#[derive(Clone, Debug, PartialEq)]
pub struct Keymap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
    numlock_mask: u16,
}

impl Keymap {
    /// Builds a keymap from a `GetKeyboardMapping` reply.
    ///
    /// `keysyms` holds `keysyms_per_keycode` entries for each keycode,
    /// starting at `min_keycode`.
    pub fn new(min_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self {
            min_keycode,
            per_keycode: usize::from(keysyms_per_keycode.max(1)),
            keysyms,
            numlock_mask: MOD_NUMLOCK,
        }
    }

    /// Finds the modifier bit Num_Lock is bound to.
    ///
    /// `keycodes` is the `GetModifierMapping` reply: eight rows (Shift, Lock,
    /// Control, Mod1..Mod5) of equal width. Falls back to Mod2 when Num_Lock
    /// is absent from the table.
    pub fn with_modifier_map(mut self, keycodes: &[u8]) -> Self {
        let width = keycodes.len() / 8;
        let numlock_code = self.keycode_for(keysym::NUM_LOCK).map(|(code, _)| code);

        self.numlock_mask = match (numlock_code, width) {
            (Some(code), w) if w > 0 => keycodes
                .chunks(w)
                .position(|row| row.contains(&code))
                .map(|row| 1u16 << row)
                .unwrap_or(MOD_NUMLOCK),
            _ => MOD_NUMLOCK,
        };

        self
    }

    /// Keycode producing `symbol`, and whether Shift is needed for it.
    ///
    /// Unshifted positions win over shifted ones, so `a` resolves to the
    /// bare key and `A` to the same key with Shift.
    pub fn keycode_for(&self, symbol: u32) -> Option<(u8, bool)> {
        if symbol == 0 {
            return None;
        }

        for level in 0..self.per_keycode.min(2) {
            let found = self
                .keysyms
                .chunks(self.per_keycode)
                .position(|entry| entry.get(level) == Some(&symbol));

            if let Some(index) = found {
                let code = u8::try_from(usize::from(self.min_keycode) + index).ok()?;
                return Some((code, level == 1));
            }
        }

        None
    }

    /// Keycode and modifier mask a combo is pressed with, Shift included
    /// when the keysym sits on the shifted level. `A` and `Shift+a` give
    /// the same answer.
    pub fn physical(&self, combo: KeyCombo) -> Option<(u8, u16)> {
        let (keycode, needs_shift) = self.keycode_for(combo.symbol())?;
        let mask = combo.modifiers().bits() | if needs_shift { MOD_SHIFT } else { 0 };
        Some((keycode, mask))
    }

    /// Keysym at `level` of `keycode`, if any.
    pub fn keysym_at(&self, keycode: u8, level: usize) -> Option<u32> {
        let index = usize::from(keycode.checked_sub(self.min_keycode)?);
        if level >= self.per_keycode {
            return None;
        }

        self.keysyms
            .get(index * self.per_keycode + level)
            .copied()
            .filter(|&sym| sym != 0)
    }

    /// Keycode of the left-hand key for a modifier.
    pub fn modifier_keycode(&self, modifier: Modifier) -> Option<u8> {
        self.keycode_for(keysym::modifier_keysym(modifier))
            .map(|(code, _)| code)
    }

    pub fn numlock_mask(&self) -> u16 {
        self.numlock_mask
    }
}
