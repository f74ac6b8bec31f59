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

//! Duplicate-source detection across a mapping set
//!
//! The orchestrator keeps enabled mappings conflict-free on its own. This
//! detector answers the wider question the user asks: which sources are
//! claimed by more than one mapping, counting disabled ones too?
//!
//! # Performance
//! - Add mapping: O(1) average case
//! - Check source: O(1) average case
//! - List all conflicts: O(n) where n = number of unique sources

use std::collections::HashMap;
use crate::core::types::{KeyCombo, KeyMapping};

/// Groups mappings by source combo using HashMap-based indexing.
///
/// A conflict exists when any group holds more than one mapping.
pub struct ConflictDetector {
    /// Maps source combo to every mapping claiming it, in insertion order.
    mappings: HashMap<KeyCombo, Vec<KeyMapping>>,
}

/// A source combo claimed by two or more mappings.
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    pub source: KeyCombo,

    /// All mappings using this source (always 2 or more)
    pub mappings: Vec<KeyMapping>,
}

impl Conflict {
    /// Number of claimants that are currently enabled (0 or 1 when the
    /// orchestrator's invariant holds)
    pub fn enabled_count(&self) -> usize {
        self.mappings.iter().filter(|m| m.enabled).count()
    }
}

impl ConflictDetector {
    /// Creates a new empty conflict detector.
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Builds a detector over a whole mapping set.
    pub fn from_mappings<'a>(mappings: impl IntoIterator<Item = &'a KeyMapping>) -> Self {
        let mut detector = Self::new();
        for mapping in mappings {
            detector.add_mapping(mapping.clone());
        }
        detector
    }

    /// Adds a mapping to the detector.
    pub fn add_mapping(&mut self, mapping: KeyMapping) {
        self.mappings
            .entry(mapping.source)
            .or_default()
            .push(mapping);
    }

    /// Finds all sources with 2 or more mappings, sorted by display name.
    pub fn find_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .mappings
            .iter()
            .filter(|(_, mappings)| mappings.len() > 1)
            .map(|(source, mappings)| Conflict {
                source: *source,
                mappings: mappings.clone(),
            })
            .collect();

        conflicts.sort_by_key(|c| c.source.to_string());
        conflicts
    }

    /// Checks if a specific source has more than one mapping.
    pub fn has_conflict(&self, source: &KeyCombo) -> bool {
        self.mappings
            .get(source)
            .map(|mappings| mappings.len() > 1)
            .unwrap_or(false)
    }

    /// Returns the total number of mappings tracked.
    pub fn total_mappings(&self) -> usize {
        self.mappings.values().map(|v| v.len()).sum()
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}
