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

//! Recording the next physical combo.
//!
//! Fed raw key transitions (already translated to unshifted keysyms). The
//! first non-modifier press completes the capture with whatever modifiers
//! are held. Tapping a modifier alone captures the modifier key itself.

use crate::core::{keysym, KeyCombo, Modifiers};

#[derive(Debug, Default)]
pub struct CaptureState {
    held: Modifiers,
    /// Modifier pressed last, cleared once anything else happens
    pending_tap: Option<u32>,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a key press. Returns the captured combo once complete.
    pub fn press(&mut self, symbol: u32) -> Option<KeyCombo> {
        match keysym::modifier_of(symbol) {
            Some(modifier) => {
                self.held = self.held.with(modifier);
                self.pending_tap = Some(symbol);
                None
            }
            None => {
                self.pending_tap = None;
                Some(KeyCombo::new(symbol, self.held))
            }
        }
    }

    /// Feeds a key release. Completes only for a lone modifier tap.
    pub fn release(&mut self, symbol: u32) -> Option<KeyCombo> {
        let modifier = keysym::modifier_of(symbol)?;
        let tapped = self.pending_tap.take() == Some(symbol);

        let others = self.held.without(modifier);
        self.held = others;

        tapped.then(|| KeyCombo::new(symbol, others))
    }

    pub fn held(&self) -> Modifiers {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MOD_CTRL, MOD_SHIFT};

    #[test]
    fn test_plain_key() {
        let mut capture = CaptureState::new();
        assert_eq!(capture.press(keysym::F1), Some(KeyCombo::bare(keysym::F1)));
    }

    #[test]
    fn test_key_with_held_modifiers() {
        let mut capture = CaptureState::new();
        assert_eq!(capture.press(keysym::CONTROL_L), None);
        assert_eq!(capture.press(keysym::SHIFT_R), None);
        assert_eq!(
            capture.press(0x74),
            Some(KeyCombo::from_raw(0x74, MOD_CTRL | MOD_SHIFT))
        );
    }

    #[test]
    fn test_released_modifier_no_longer_counts() {
        let mut capture = CaptureState::new();
        capture.press(keysym::CONTROL_L);
        capture.press(keysym::SHIFT_L);
        capture.release(keysym::CONTROL_L);

        assert_eq!(capture.press(0x74), Some(KeyCombo::from_raw(0x74, MOD_SHIFT)));
    }

    #[test]
    fn test_lone_modifier_tap() {
        let mut capture = CaptureState::new();
        assert_eq!(capture.press(keysym::SUPER_L), None);
        assert_eq!(capture.release(keysym::SUPER_L), Some(KeyCombo::bare(keysym::SUPER_L)));
    }

    #[test]
    fn test_modifier_tap_while_holding_another() {
        let mut capture = CaptureState::new();
        capture.press(keysym::CONTROL_L);
        capture.press(keysym::SHIFT_L);

        assert_eq!(
            capture.release(keysym::SHIFT_L),
            Some(KeyCombo::from_raw(keysym::SHIFT_L, MOD_CTRL))
        );
    }

    #[test]
    fn test_release_of_earlier_modifier_is_not_a_tap() {
        let mut capture = CaptureState::new();
        capture.press(keysym::CONTROL_L);
        capture.press(keysym::SHIFT_L);

        assert_eq!(capture.release(keysym::CONTROL_L), None);
        assert_eq!(capture.held(), Modifiers::from_bits(MOD_SHIFT));
    }

    #[test]
    fn test_non_modifier_release_ignored() {
        let mut capture = CaptureState::new();
        assert_eq!(capture.release(0x74), None);
    }
}
