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

//! src/core/mod.rs
//!
//! Core domain types and pure logic
//!
//! This module contains the data structures and algorithms that do not
//! touch the X server, the file system or GTK:
//! - Type definitions for combos, mappings and settings
//! - Key name resolution and combo parsing
//! - Duplicate-source detection
//! - Structural validation
//!
//! Everything here is unit-testable without a display server.

pub mod conflict;
pub mod keys;
pub mod keysym;
pub mod types;
pub mod validator;

pub use conflict::{Conflict, ConflictDetector};
pub use keys::{KeyNames, ParseError};
pub use types::*;
pub use validator::{validate_mapping, ValidationError};

#[cfg(test)]
mod tests;
