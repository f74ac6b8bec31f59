// Copyright 2025 bakri (tidynest@proton.me)
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

//! Structural validation of combos and mappings
//!
//! Rejects anything the engine cannot grab or synthesise before it reaches
//! the X server: empty keysyms, modifier bits outside Shift/Ctrl/Alt/Super,
//! empty or runaway target sequences, and descriptions that would break
//! the table view.

use thiserror::Error;
use crate::core::types::{KeyCombo, KeyMapping};

/// Longest target sequence accepted
pub const MAX_TARGET_LEN: usize = 256;

/// Longest description accepted, in characters
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Keysym 0 is NoSymbol
    #[error("Combo has no key")]
    NoSymbol,

    /// Modifier bits other than Shift, Ctrl, Alt and Super
    #[error("Unsupported modifier bits {0:#06x} (only Shift, Ctrl, Alt and Super)")]
    UnsupportedModifiers(u16),

    #[error("Target sequence is empty")]
    EmptyTarget,

    #[error("Target sequence too long: {0} keys (max {MAX_TARGET_LEN})")]
    TargetTooLong(usize),

    #[error("Description too long: {0} characters (max {MAX_DESCRIPTION_LEN})")]
    DescriptionTooLong(usize),

    #[error("Description contains control characters")]
    ControlCharacters,
}

/// Validates a single combo
pub fn validate_combo(combo: &KeyCombo) -> Result<(), ValidationError> {
    if combo.symbol() == 0 {
        return Err(ValidationError::NoSymbol);
    }

    let extra = combo.modifiers().unsupported_bits();
    if extra != 0 {
        return Err(ValidationError::UnsupportedModifiers(extra));
    }

    Ok(())
}

/// Validates a target sequence
pub fn validate_target(target: &[KeyCombo]) -> Result<(), ValidationError> {
    if target.is_empty() {
        return Err(ValidationError::EmptyTarget);
    }

    if target.len() > MAX_TARGET_LEN {
        return Err(ValidationError::TargetTooLong(target.len()));
    }

    target.iter().try_for_each(validate_combo)
}

/// Validates a description
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong(len));
    }

    if description.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters);
    }

    Ok(())
}

/// Validates a complete mapping
pub fn validate_mapping(mapping: &KeyMapping) -> Result<(), ValidationError> {
    validate_combo(&mapping.source)?;
    validate_target(&mapping.target)?;
    validate_description(&mapping.description)
}
