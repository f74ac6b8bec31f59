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

use crate::core::{
    keys::{KeyNames, ParseError},
    keysym,
    types::{KeyCombo, Modifier, Modifiers, MOD_ALT, MOD_CTRL, MOD_SHIFT, MOD_SUPER},
};

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn test_special_key_names_round_trip() {
    let names = KeyNames::new();

    for name in ["F1", "F24", "Escape", "PageUp", "Backspace", "Space", "Menu", "CapsLock"] {
        let symbol = names.name_to_keysym(name).unwrap();
        assert_eq!(names.keysym_to_name(symbol), name);
    }
}

#[test]
fn test_letters_resolve_to_lowercase_keysym() {
    let names = KeyNames::new();

    assert_eq!(names.name_to_keysym("A"), Some(0x61));
    assert_eq!(names.name_to_keysym("a"), Some(0x61));
    assert_eq!(names.name_to_keysym("z"), Some(0x7a));
    assert_eq!(names.keysym_to_name(0x61), "A");
}

#[test]
fn test_digits_and_keypad() {
    let names = KeyNames::new();

    assert_eq!(names.name_to_keysym("7"), Some(0x37));
    assert_eq!(names.name_to_keysym("KP_7"), Some(keysym::KP_0 + 7));
}

#[test]
fn test_names_are_case_insensitive() {
    let names = KeyNames::new();

    assert_eq!(names.name_to_keysym("escape"), Some(keysym::ESCAPE));
    assert_eq!(names.name_to_keysym("ESCAPE"), Some(keysym::ESCAPE));
    assert_eq!(names.name_to_keysym("pageup"), Some(keysym::PAGE_UP));
}

#[test]
fn test_x11_aliases() {
    let names = KeyNames::new();

    assert_eq!(names.name_to_keysym("Prior"), Some(keysym::PAGE_UP));
    assert_eq!(names.name_to_keysym("BackSpace"), Some(keysym::BACKSPACE));
    assert_eq!(names.name_to_keysym("Control_L"), Some(keysym::CONTROL_L));
    assert_eq!(names.name_to_keysym("Esc"), Some(keysym::ESCAPE));
}

#[test]
fn test_hex_and_unicode_fallbacks() {
    let names = KeyNames::new();

    assert_eq!(names.name_to_keysym("0x1008ff14"), Some(keysym::XF86_AUDIO_PLAY));
    assert_eq!(names.name_to_keysym("U+20AC"), Some(0x0100_20ac));
    assert_eq!(names.name_to_keysym("0x0"), None);
    assert_eq!(names.name_to_keysym("NotAKey"), None);
}

#[test]
fn test_unknown_keysym_display() {
    let names = KeyNames::new();

    assert_eq!(names.keysym_to_name(0x40), "@");
    assert_eq!(names.keysym_to_name(0x0100_20ac), "€");
    assert_eq!(names.keysym_to_name(0xfe03), "0xfe03");
}

// ============================================================================
// Combo parsing
// ============================================================================

#[test]
fn test_parse_simple_combo() {
    let names = KeyNames::new();

    let combo = names.parse_combo("Ctrl+Shift+A").unwrap();
    assert_eq!(combo.symbol(), 0x61);
    assert_eq!(combo.modifiers().bits(), MOD_CTRL | MOD_SHIFT);
}

#[test]
fn test_parse_modifier_aliases() {
    let names = KeyNames::new();

    let combo = names.parse_combo("control+mod1+win+F5").unwrap();
    assert_eq!(combo.modifiers().bits(), MOD_CTRL | MOD_ALT | MOD_SUPER);
    assert_eq!(combo.symbol(), keysym::F1 + 4);
}

#[test]
fn test_parse_modifier_only_combo() {
    let names = KeyNames::new();

    let combo = names.parse_combo("Ctrl+Shift").unwrap();
    assert_eq!(combo.symbol(), keysym::SHIFT_L);
    assert_eq!(combo.modifiers(), Modifiers::from(Modifier::Ctrl));
}

#[test]
fn test_parse_plus_key() {
    let names = KeyNames::new();

    let combo = names.parse_combo("Ctrl+Plus").unwrap();
    assert_eq!(combo.symbol(), keysym::PLUS);
}

#[test]
fn test_parse_errors() {
    let names = KeyNames::new();

    assert_eq!(names.parse_combo(""), Err(ParseError::Empty));
    assert_eq!(names.parse_combo("   "), Err(ParseError::Empty));
    assert_eq!(
        names.parse_combo("Ctrl+Bogus"),
        Err(ParseError::UnknownKey("Bogus".to_string()))
    );
    assert_eq!(
        names.parse_combo("A+B"),
        Err(ParseError::UnknownModifier("A".to_string()))
    );
    assert!(matches!(names.parse_combo("Ctrl+"), Err(ParseError::Syntax(_))));
    assert!(matches!(names.parse_combo("Ctrl+ A"), Err(ParseError::Syntax(_))));
}

#[test]
fn test_parse_sequence() {
    let names = KeyNames::new();

    let sequence = names.parse_sequence("Ctrl+C  Ctrl+V\tReturn").unwrap();
    assert_eq!(
        sequence,
        vec![
            KeyCombo::from_raw(0x63, MOD_CTRL),
            KeyCombo::from_raw(0x76, MOD_CTRL),
            KeyCombo::bare(keysym::RETURN),
        ]
    );
}

#[test]
fn test_parse_sequence_reports_bad_element() {
    let names = KeyNames::new();

    assert_eq!(
        names.parse_sequence("Ctrl+C Nope"),
        Err(ParseError::UnknownKey("Nope".to_string()))
    );
}

// ============================================================================
// Description and text expansion
// ============================================================================

#[test]
fn test_describe_uses_fixed_modifier_order() {
    let names = KeyNames::new();
    let combo = KeyCombo::from_raw(0x61, MOD_SUPER | MOD_SHIFT | MOD_ALT | MOD_CTRL);

    assert_eq!(names.describe(&combo), "Ctrl+Alt+Shift+Super+A");
}

#[test]
fn test_display_and_parse_agree() {
    let names = KeyNames::new();

    for text in ["F1", "Ctrl+Alt+T", "Shift+Super+PageDown", "Alt+Return"] {
        let combo = names.parse_combo(text).unwrap();
        assert_eq!(combo.to_string(), text);
    }
}

#[test]
fn test_expand_text() {
    let names = KeyNames::new();

    let combos = names.expand_text("Hi@\n").unwrap();
    let symbols: Vec<u32> = combos.iter().map(KeyCombo::symbol).collect();

    assert_eq!(symbols, vec![0x48, 0x69, keysym::AT, keysym::RETURN]);
    assert!(combos.iter().all(|c| c.modifiers().is_empty()));
}

#[test]
fn test_expand_text_rejects_control_characters() {
    let names = KeyNames::new();

    assert_eq!(names.expand_text(""), Err(ParseError::Empty));
    assert_eq!(
        names.expand_text("a\u{1b}"),
        Err(ParseError::UnsupportedChar('\u{1b}'))
    );
}
