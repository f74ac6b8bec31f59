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

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::{KeyCombo, MappingId, ValidationError};
use crate::hook::HookError;

/// Errors returned by mapping operations.
///
/// None of these are fatal: the caller reports them and carries on.
#[derive(Debug, Error)]
pub enum RemapError {
    /// An enabled mapping already owns this source
    #[error("{source_combo} is already used by mapping {existing}")]
    DuplicateSource {
        source_combo: KeyCombo,
        existing: MappingId,
    },

    #[error("Invalid mapping: {0}")]
    InvalidCombo(#[from] ValidationError),

    /// Mapping was stored but could not be made live
    #[error("Could not grab {source_combo} for mapping {id}: {cause}")]
    GrabFailed {
        id: MappingId,
        source_combo: KeyCombo,
        cause: HookError,
    },

    #[error("No mapping with id {0}")]
    UnknownMapping(MappingId),

    /// Display connection is gone; interception is off
    #[error("Display connection lost: {0}")]
    Connection(HookError),

    #[error("Could not save mappings: {0}")]
    Persistence(#[from] ConfigError),
}

impl RemapError {
    /// Category used in `RemapEvent::ErrorOccurred`
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemapError::DuplicateSource { .. } | RemapError::InvalidCombo(_) => ErrorKind::Invalid,
            RemapError::GrabFailed { .. } => ErrorKind::Grab,
            RemapError::UnknownMapping(_) => ErrorKind::Invalid,
            RemapError::Connection(_) => ErrorKind::Connection,
            RemapError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

/// Broad category of a reported failure
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Request rejected before anything changed
    Invalid,
    /// A grab could not be registered or was lost
    Grab,
    /// A target sequence could not be typed
    Simulate,
    Connection,
    Persistence,
}
