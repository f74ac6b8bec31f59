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
    keysym,
    types::{KeyCombo, KeyMapping, MOD_CTRL},
    validator::{
        validate_combo, validate_description, validate_mapping, validate_target,
        ValidationError, MAX_DESCRIPTION_LEN, MAX_TARGET_LEN,
    },
};

#[test]
fn test_valid_combo() {
    assert!(validate_combo(&KeyCombo::from_raw(keysym::F1, MOD_CTRL)).is_ok());
}

#[test]
fn test_zero_symbol_rejected() {
    assert_eq!(
        validate_combo(&KeyCombo::bare(0)),
        Err(ValidationError::NoSymbol)
    );
}

#[test]
fn test_mod3_and_mod5_rejected() {
    // Mod3 (1<<5) and Mod5 (1<<7)
    assert_eq!(
        validate_combo(&KeyCombo::from_raw(keysym::F1, 1 << 5)),
        Err(ValidationError::UnsupportedModifiers(1 << 5))
    );
    assert_eq!(
        validate_combo(&KeyCombo::from_raw(keysym::F1, MOD_CTRL | 1 << 7)),
        Err(ValidationError::UnsupportedModifiers(1 << 7))
    );
}

#[test]
fn test_lock_bits_never_reach_validation() {
    // Lock and NumLock are stripped at construction
    assert!(validate_combo(&KeyCombo::from_raw(keysym::F1, 0b1_0010)).is_ok());
}

#[test]
fn test_empty_target_rejected() {
    assert_eq!(validate_target(&[]), Err(ValidationError::EmptyTarget));
}

#[test]
fn test_target_length_limit() {
    let long = vec![KeyCombo::bare(0x61); MAX_TARGET_LEN + 1];
    assert_eq!(
        validate_target(&long),
        Err(ValidationError::TargetTooLong(MAX_TARGET_LEN + 1))
    );

    let max = vec![KeyCombo::bare(0x61); MAX_TARGET_LEN];
    assert!(validate_target(&max).is_ok());
}

#[test]
fn test_target_elements_validated() {
    let target = vec![KeyCombo::bare(keysym::F2), KeyCombo::bare(0)];
    assert_eq!(validate_target(&target), Err(ValidationError::NoSymbol));
}

#[test]
fn test_description_limits() {
    assert!(validate_description("Open terminal").is_ok());
    assert!(validate_description("").is_ok());

    let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
    assert_eq!(
        validate_description(&long),
        Err(ValidationError::DescriptionTooLong(MAX_DESCRIPTION_LEN + 1))
    );
    assert_eq!(
        validate_description("line\nbreak"),
        Err(ValidationError::ControlCharacters)
    );
}

#[test]
fn test_validate_mapping() {
    let good = KeyMapping::new(
        KeyCombo::bare(keysym::F1),
        vec![KeyCombo::bare(keysym::F2)],
        "swap",
    );
    assert!(validate_mapping(&good).is_ok());

    let mut bad = good.clone();
    bad.target.clear();
    assert_eq!(validate_mapping(&bad), Err(ValidationError::EmptyTarget));
}
