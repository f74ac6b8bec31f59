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

//! src/core/keys.rs
//!
//! Key name resolution and combo parsing
//!
//! Translates between X11 keysyms and the names users see and type:
//! - `F1`, `PageUp`, `A` ⇄ keysym
//! - `Ctrl+Shift+A` ⇄ `KeyCombo`
//! - `Ctrl+C Ctrl+V` → sequence of combos
//! - literal text → sequence of combos
//!
//! GDK key values are X11 keysyms, so no separate toolkit table is needed.
//!
//! # Architecture
//! Combo strings are tokenised with nom combinators; the tokens are then
//! resolved against a name table built once per process.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0, multispace1},
    combinator::all_consuming,
    multi::separated_list1,
    sequence::delimited,
    IResult, Parser,
};
use regex::Regex;
use std::{
    collections::HashMap,
    sync::OnceLock,
};
use thiserror::Error;

use crate::core::keysym;
use crate::core::types::{KeyCombo, Modifier, Modifiers};

/// Errors from parsing human-typed key strings
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Key combination is empty")]
    Empty,

    #[error("Unknown key name '{0}'")]
    UnknownKey(String),

    #[error("'{0}' is not a modifier (expected Ctrl, Alt, Shift or Super)")]
    UnknownModifier(String),

    #[error("Malformed key combination '{0}'")]
    Syntax(String),

    #[error("Character {0:?} cannot be typed")]
    UnsupportedChar(char),
}

/// Display names, in the form shown to users
const NAMED_KEYS: &[(&str, u32)] = &[
    // Modifiers
    ("Shift", keysym::SHIFT_L),
    ("Ctrl", keysym::CONTROL_L),
    ("Alt", keysym::ALT_L),
    ("Super", keysym::SUPER_L),
    ("Shift_R", keysym::SHIFT_R),
    ("Ctrl_R", keysym::CONTROL_R),
    ("Alt_R", keysym::ALT_R),
    ("Super_R", keysym::SUPER_R),
    ("CapsLock", keysym::CAPS_LOCK),
    ("NumLock", keysym::NUM_LOCK),
    ("ScrollLock", keysym::SCROLL_LOCK),
    // Navigation
    ("Escape", keysym::ESCAPE),
    ("Tab", keysym::TAB),
    ("Backtab", keysym::ISO_LEFT_TAB),
    ("Backspace", keysym::BACKSPACE),
    ("Return", keysym::RETURN),
    ("Enter", keysym::KP_ENTER),
    ("Insert", keysym::INSERT),
    ("Delete", keysym::DELETE),
    ("Pause", keysym::PAUSE),
    ("Print", keysym::PRINT),
    ("Home", keysym::HOME),
    ("End", keysym::END),
    ("Left", keysym::LEFT),
    ("Up", keysym::UP),
    ("Right", keysym::RIGHT),
    ("Down", keysym::DOWN),
    ("PageUp", keysym::PAGE_UP),
    ("PageDown", keysym::PAGE_DOWN),
    ("Space", keysym::SPACE),
    ("Menu", keysym::MENU),
    // Punctuation
    ("-", 0x2d),
    ("=", 0x3d),
    ("[", 0x5b),
    ("]", 0x5d),
    ("\\", 0x5c),
    (";", 0x3b),
    ("'", 0x27),
    ("`", 0x60),
    (",", 0x2c),
    (".", 0x2e),
    ("/", 0x2f),
    ("Plus", keysym::PLUS),
    // Media
    ("AudioLowerVolume", keysym::XF86_AUDIO_LOWER_VOLUME),
    ("AudioMute", keysym::XF86_AUDIO_MUTE),
    ("AudioRaiseVolume", keysym::XF86_AUDIO_RAISE_VOLUME),
    ("AudioPlay", keysym::XF86_AUDIO_PLAY),
    ("AudioStop", keysym::XF86_AUDIO_STOP),
    ("AudioPrev", keysym::XF86_AUDIO_PREV),
    ("AudioNext", keysym::XF86_AUDIO_NEXT),
];

/// Extra spellings accepted when parsing (X11 names, common abbreviations)
const ALIASES: &[(&str, u32)] = &[
    ("control", keysym::CONTROL_L),
    ("control_l", keysym::CONTROL_L),
    ("control_r", keysym::CONTROL_R),
    ("shift_l", keysym::SHIFT_L),
    ("alt_l", keysym::ALT_L),
    ("super_l", keysym::SUPER_L),
    ("win", keysym::SUPER_L),
    ("meta", keysym::SUPER_L),
    ("caps_lock", keysym::CAPS_LOCK),
    ("num_lock", keysym::NUM_LOCK),
    ("scroll_lock", keysym::SCROLL_LOCK),
    ("esc", keysym::ESCAPE),
    ("iso_left_tab", keysym::ISO_LEFT_TAB),
    ("kp_enter", keysym::KP_ENTER),
    ("ins", keysym::INSERT),
    ("del", keysym::DELETE),
    ("prior", keysym::PAGE_UP),
    ("page_up", keysym::PAGE_UP),
    ("pgup", keysym::PAGE_UP),
    ("next", keysym::PAGE_DOWN),
    ("page_down", keysym::PAGE_DOWN),
    ("pgdn", keysym::PAGE_DOWN),
    ("minus", 0x2d),
    ("equal", 0x3d),
    ("bracketleft", 0x5b),
    ("bracketright", 0x5d),
    ("backslash", 0x5c),
    ("semicolon", 0x3b),
    ("apostrophe", 0x27),
    ("grave", 0x60),
    ("comma", 0x2c),
    ("period", 0x2e),
    ("slash", 0x2f),
];

/// Bidirectional keysym ⇄ name table
pub struct KeyNames {
    by_symbol: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
    hex_pattern: Option<Regex>,
    unicode_pattern: Option<Regex>,
}

impl KeyNames {
    /// Builds the table: named keys, A–Z, 0–9, F1–F24 and keypad digits
    pub fn new() -> Self {
        let mut names = Self {
            by_symbol: HashMap::new(),
            by_name: HashMap::new(),
            hex_pattern: Regex::new(r"^0[xX]([0-9a-fA-F]{1,8})$").ok(),
            unicode_pattern: Regex::new(r"^[uU]\+([0-9a-fA-F]{4,6})$").ok(),
        };

        for (name, symbol) in NAMED_KEYS {
            names.insert(name, *symbol);
        }

        // Letters resolve to the unshifted keysym but display in capitals
        for (offset, letter) in ('A'..='Z').enumerate() {
            names.insert(&letter.to_string(), keysym::LOWER_A + offset as u32);
        }

        for digit in 0..10u32 {
            names.insert(&digit.to_string(), 0x30 + digit);
            names.insert(&format!("KP_{digit}"), keysym::KP_0 + digit);
        }

        for n in 0..24u32 {
            names.insert(&format!("F{}", n + 1), keysym::F1 + n);
        }

        for (alias, symbol) in ALIASES {
            names.by_name.entry((*alias).to_string()).or_insert(*symbol);
        }

        names
    }

    /// Process-wide table
    pub fn global() -> &'static KeyNames {
        static NAMES: OnceLock<KeyNames> = OnceLock::new();
        NAMES.get_or_init(KeyNames::new)
    }

    fn insert(&mut self, name: &str, symbol: u32) {
        self.by_symbol.entry(symbol).or_insert_with(|| name.to_string());
        self.by_name.insert(name.to_lowercase(), symbol);
    }

    /// Human-readable name for a keysym
    ///
    /// Unknown printable keysyms show their character; anything else shows
    /// as hex (`0x1234`), which `name_to_keysym` accepts back.
    pub fn keysym_to_name(&self, symbol: u32) -> String {
        if let Some(name) = self.by_symbol.get(&symbol) {
            return name.clone();
        }

        if let Some(c) = keysym_to_char(symbol) {
            return c.to_string();
        }

        format!("0x{symbol:04x}")
    }

    /// Keysym for a name typed by the user, case-insensitive
    pub fn name_to_keysym(&self, name: &str) -> Option<u32> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(symbol) = self.by_name.get(&trimmed.to_lowercase()) {
            return Some(*symbol);
        }

        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return char_to_keysym(c);
        }

        if let Some(caps) = self.hex_pattern.as_ref().and_then(|re| re.captures(trimmed)) {
            return u32::from_str_radix(&caps[1], 16).ok().filter(|s| *s != 0);
        }

        if let Some(caps) = self.unicode_pattern.as_ref().and_then(|re| re.captures(trimmed)) {
            return u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .and_then(char_to_keysym);
        }

        None
    }

    /// Renders a combo as `Ctrl+Alt+Shift+Super+Key`
    pub fn describe(&self, combo: &KeyCombo) -> String {
        let mut parts: Vec<String> = combo.modifiers().iter().map(|m| m.to_string()).collect();
        parts.push(self.keysym_to_name(combo.symbol()));
        parts.join("+")
    }

    /// Parses one combo such as `Ctrl+Shift+A`
    ///
    /// The last token is the key; every earlier token must be a modifier.
    /// A lone modifier (`Ctrl`) is a key in its own right.
    pub fn parse_combo(&self, input: &str) -> Result<KeyCombo, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let (_, tokens) = all_consuming(combo_tokens)
            .parse(trimmed)
            .map_err(|_| ParseError::Syntax(trimmed.to_string()))?;

        self.combo_from_tokens(&tokens)
    }

    /// Parses a whitespace-separated sequence such as `Ctrl+C Ctrl+V`
    pub fn parse_sequence(&self, input: &str) -> Result<Vec<KeyCombo>, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let (_, combos) = all_consuming(sequence_tokens)
            .parse(input)
            .map_err(|_| ParseError::Syntax(input.trim().to_string()))?;

        combos
            .iter()
            .map(|tokens| self.combo_from_tokens(tokens))
            .collect()
    }

    /// Expands literal text into one unmodified combo per character
    ///
    /// Characters that live on a shifted level (`@`, `A`) are resolved to
    /// Shift at synthesis time, not here.
    pub fn expand_text(&self, text: &str) -> Result<Vec<KeyCombo>, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        text.chars()
            .map(|c| {
                let symbol = match c {
                    '\n' => Some(keysym::RETURN),
                    '\t' => Some(keysym::TAB),
                    other => char_to_keysym(other),
                };
                symbol
                    .map(KeyCombo::bare)
                    .ok_or(ParseError::UnsupportedChar(c))
            })
            .collect()
    }

    fn combo_from_tokens(&self, tokens: &[&str]) -> Result<KeyCombo, ParseError> {
        let (key, modifier_tokens) = tokens.split_last().ok_or(ParseError::Empty)?;

        let modifiers = modifier_tokens
            .iter()
            .map(|token| {
                modifier_from_name(token).ok_or_else(|| ParseError::UnknownModifier(token.to_string()))
            })
            .collect::<Result<Modifiers, _>>()?;

        let symbol = self
            .name_to_keysym(key)
            .ok_or_else(|| ParseError::UnknownKey(key.to_string()))?;

        Ok(KeyCombo::new(symbol, modifiers))
    }
}

impl Default for KeyNames {
    fn default() -> Self {
        Self::new()
    }
}

/// Modifier named by a combo token
pub fn modifier_from_name(name: &str) -> Option<Modifier> {
    match name.trim().to_lowercase().as_str() {
        "ctrl" | "control" | "ctl" => Some(Modifier::Ctrl),
        "alt" | "mod1" => Some(Modifier::Alt),
        "shift" => Some(Modifier::Shift),
        "super" | "win" | "mod4" | "meta" | "logo" => Some(Modifier::Super),
        _ => None,
    }
}

/// Keysym that types a character
///
/// Latin-1 keysyms equal the code point; anything above uses the Unicode
/// keysym range. Control characters have no keysym.
pub fn char_to_keysym(c: char) -> Option<u32> {
    let code = c as u32;
    match code {
        0x20..=0x7e | 0xa0..=0xff => Some(code),
        0x100.. => Some(keysym::UNICODE_OFFSET + code),
        _ => None,
    }
}

/// Character a keysym types, if it is a printable character keysym
pub fn keysym_to_char(symbol: u32) -> Option<char> {
    match symbol {
        0x21..=0x7e | 0xa1..=0xff => char::from_u32(symbol),
        s if s > keysym::UNICODE_OFFSET + 0xff && s <= keysym::UNICODE_OFFSET + 0x10_ffff => {
            char::from_u32(s - keysym::UNICODE_OFFSET)
        }
        _ => None,
    }
}

fn key_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '+' && !c.is_whitespace()).parse(input)
}

fn combo_tokens(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('+'), key_token).parse(input)
}

fn sequence_tokens(input: &str) -> IResult<&str, Vec<Vec<&str>>> {
    delimited(multispace0, separated_list1(multispace1, combo_tokens), multispace0).parse(input)
}
