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

//! On-disk document shape
//!
//! ```text
//! { "version": 1,
//!   "mappings": [ { "id", "source", "target", "enabled", "description" } ],
//!   "settings": { "start_minimized", "enable_on_startup" } }
//! ```
//!
//! Mappings are decoded one at a time so a single bad entry costs only
//! itself. Entries in the older flat shape (`source_keysym`,
//! `target_keysym`, ...) are upgraded on read and written back in the
//! current shape on the next save.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::core::{
    validate_mapping, KeyCombo, KeyMapping, MappingId, Settings,
};

/// Version written by this build
pub const DOCUMENT_VERSION: u32 = 1;

/// Document as written
#[derive(Debug, Serialize)]
pub struct Document<'a> {
    pub version: u32,
    pub mappings: &'a [KeyMapping],
    pub settings: &'a Settings,
}

impl<'a> Document<'a> {
    pub fn new(mappings: &'a [KeyMapping], settings: &'a Settings) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            mappings,
            settings,
        }
    }
}

/// Document as read, before per-mapping decoding
#[derive(Debug, Deserialize)]
pub struct RawDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub mappings: Vec<serde_json::Value>,
    #[serde(default)]
    pub settings: Settings,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// One mapping entry in either supported shape
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredMapping {
    Current(KeyMapping),
    Flat(FlatMapping),
}

/// Single-combo entry with flat keysym/modifier fields
#[derive(Debug, Deserialize)]
struct FlatMapping {
    #[serde(default)]
    id: String,
    source_keysym: u32,
    #[serde(default)]
    source_modifiers: u16,
    target_keysym: u32,
    #[serde(default)]
    target_modifiers: u16,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    description: String,
}

fn enabled_by_default() -> bool {
    true
}

impl From<FlatMapping> for KeyMapping {
    fn from(flat: FlatMapping) -> Self {
        KeyMapping {
            id: MappingId::from(flat.id),
            source: KeyCombo::from_raw(flat.source_keysym, flat.source_modifiers),
            target: vec![KeyCombo::from_raw(flat.target_keysym, flat.target_modifiers)],
            enabled: flat.enabled,
            description: flat.description,
        }
    }
}

/// Decodes every usable mapping, returning them with the count skipped
///
/// Entries that fail to decode or validate are dropped with a warning.
/// Missing or repeated ids are replaced with fresh ones.
pub fn decode_mappings(raw: Vec<serde_json::Value>) -> (Vec<KeyMapping>, usize) {
    let mut mappings = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for (index, value) in raw.into_iter().enumerate() {
        let mut mapping = match serde_json::from_value::<StoredMapping>(value) {
            Ok(StoredMapping::Current(mapping)) => mapping,
            Ok(StoredMapping::Flat(flat)) => KeyMapping::from(flat),
            Err(e) => {
                warn!(index, error = %e, "Skipping undecodable mapping");
                skipped += 1;
                continue;
            }
        };

        if let Err(e) = validate_mapping(&mapping) {
            warn!(index, id = %mapping.id, error = %e, "Skipping invalid mapping");
            skipped += 1;
            continue;
        }

        if mapping.id.as_str().is_empty() || seen.contains(&mapping.id) {
            mapping.id = MappingId::generate();
        }
        seen.insert(mapping.id.clone());

        mappings.push(mapping);
    }

    (mappings, skipped)
}
