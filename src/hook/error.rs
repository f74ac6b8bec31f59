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
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

use crate::core::{KeyCombo, MappingId};

/// Errors raised by the interception engine.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HookError {
    /// Another client already holds one of the physical grabs.
    #[error("{combo} is already grabbed by another application")]
    GrabConflict { combo: KeyCombo },

    /// Another mapping already holds the same physical key and modifiers,
    /// e.g. `A` and `Shift+a`.
    #[error("{combo} is the same key press as mapping {holder}")]
    SharedKey { combo: KeyCombo, holder: MappingId },

    /// No key on the current layout produces the combo, or the server
    /// rejected its modifiers.
    #[error("{0} cannot be grabbed on the current keyboard layout")]
    InvalidCombo(KeyCombo),

    /// A keysym in a target sequence has no key on the current layout.
    #[error("No key on the current layout types keysym {0:#x}")]
    UnmappedKeysym(u32),

    /// A required X extension is not available.
    #[error("X server does not support {0}")]
    MissingExtension(&'static str),

    /// The X connection failed or was closed.
    #[error("X connection error: {0}")]
    Connection(String),
}

impl From<ConnectError> for HookError {
    fn from(e: ConnectError) -> Self {
        HookError::Connection(e.to_string())
    }
}

impl From<ConnectionError> for HookError {
    fn from(e: ConnectionError) -> Self {
        HookError::Connection(e.to_string())
    }
}

impl From<ReplyError> for HookError {
    fn from(e: ReplyError) -> Self {
        HookError::Connection(e.to_string())
    }
}
