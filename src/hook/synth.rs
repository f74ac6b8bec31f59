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

//! Turns a target sequence into physical key strokes.

use super::{keymap::Keymap, HookError};
use crate::core::{keysym, KeyCombo, Modifier};

/// One synthetic key transition
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyStroke {
    pub keycode: u8,
    pub pressed: bool,
}

impl KeyStroke {
    pub const fn down(keycode: u8) -> Self {
        Self { keycode, pressed: true }
    }

    pub const fn up(keycode: u8) -> Self {
        Self { keycode, pressed: false }
    }
}

/// Plans the strokes for a whole sequence.
///
/// For each combo: modifiers go down in Shift, Ctrl, Alt, Super order, the
/// key goes down and up, then the modifiers come up in reverse. Shift is
/// added when the keysym sits on the shifted level.
///
/// The plan is built completely before anything is sent, so an unmapped
/// keysym anywhere in the sequence means no key is pressed at all.
pub fn plan(sequence: &[KeyCombo], keymap: &Keymap) -> Result<Vec<KeyStroke>, HookError> {
    let mut strokes = Vec::new();

    for combo in sequence {
        let (keycode, needs_shift) = keymap
            .keycode_for(combo.symbol())
            .ok_or(HookError::UnmappedKeysym(combo.symbol()))?;

        let mut modifiers = combo.modifiers();
        if needs_shift {
            modifiers = modifiers.with(Modifier::Shift);
        }

        let mut held = Vec::new();
        for modifier in Modifier::PRESS_ORDER {
            if !modifiers.contains(modifier) {
                continue;
            }
            let code = keymap
                .modifier_keycode(modifier)
                .ok_or(HookError::UnmappedKeysym(keysym::modifier_keysym(modifier)))?;
            // Modifier-only combos are their own key
            if code != keycode {
                held.push(code);
            }
        }

        strokes.extend(held.iter().map(|&code| KeyStroke::down(code)));
        strokes.push(KeyStroke::down(keycode));
        strokes.push(KeyStroke::up(keycode));
        strokes.extend(held.iter().rev().map(|&code| KeyStroke::up(code)));
    }

    Ok(strokes)
}
