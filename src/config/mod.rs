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

//! Mapping-file persistence with atomic writes and corrupt-file recovery.
//!
//! Key features:
//!
//! - **Atomic writes**: temp-file-then-rename, the file is never half written
//! - **Forgiving reads**: a missing file loads as an empty set; a malformed
//!   one is copied aside and loads as an empty set; a bad entry is skipped
//! - **Format upgrade**: older flat entries are read and rewritten
//!
//! # Example
//!
//! ```no_run
//! use rekey::config::ConfigStore;
//!
//! let store = ConfigStore::new(ConfigStore::default_path()?);
//! let loaded = store.load();
//! println!("{} mappings", loaded.mappings.len());
//!
//! store.save(&loaded.mappings, &loaded.settings)?;
//! # Ok::<(), rekey::config::ConfigError>(())
//! ```

mod document;
mod error;
mod transaction;

pub use document::{Document, DOCUMENT_VERSION};
pub use error::ConfigError;
pub use transaction::ConfigTransaction;

use chrono::Local;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::core::{KeyMapping, Settings};
use document::{decode_mappings, RawDocument};

/// Directory name under the XDG config home
pub const APP_DIR: &str = "rekey";

/// File name of the mapping document
pub const MAPPINGS_FILE: &str = "mappings.json";

/// Result of reading the mapping file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedConfig {
    pub mappings: Vec<KeyMapping>,
    pub settings: Settings,
    /// Entries dropped because they could not be decoded or validated
    pub skipped: usize,
    /// Where a malformed file was copied before falling back to defaults
    pub recovered_to: Option<PathBuf>,
    /// Why an existing file was replaced by defaults
    pub problem: Option<String>,
}

/// Owns the mapping file on disk.
///
/// All writes go through `ConfigTransaction`. Nothing else in the crate
/// touches the file.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    /// Path to `mappings.json`.
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for the given file. The file need not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$XDG_CONFIG_HOME/rekey/mappings.json`, else `~/.config/rekey/mappings.json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` when neither variable is usable.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = shellexpand::tilde("~");
                if home == "~" {
                    return Err(ConfigError::NoConfigDir);
                }
                PathBuf::from(home.as_ref()).join(".config")
            }
        };

        Ok(base.join(APP_DIR).join(MAPPINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the mapping file.
    ///
    /// Never fails: startup must not depend on the file being usable.
    ///
    /// - Missing: defaults
    /// - Not UTF-8 or not valid JSON: copied to
    ///   `mappings.json.corrupt-<timestamp>`, then defaults
    /// - Unreadable (permissions, a directory in the way): defaults
    ///
    /// Whenever defaults stand in for an existing file, `problem` says why.
    pub fn load(&self) -> LoadedConfig {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No mapping file yet, starting empty");
            return LoadedConfig::default();
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Mapping file cannot be read, using defaults");
                return LoadedConfig {
                    problem: Some(format!("cannot read {}: {}", self.path.display(), e)),
                    ..LoadedConfig::default()
                };
            }
        };

        let raw: RawDocument = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Mapping file is malformed");
                return LoadedConfig {
                    recovered_to: self.preserve_corrupt_file(),
                    problem: Some(format!("{} is malformed: {}", self.path.display(), e)),
                    ..LoadedConfig::default()
                };
            }
        };

        if raw.version > DOCUMENT_VERSION {
            warn!(
                version = raw.version,
                supported = DOCUMENT_VERSION,
                "Mapping file is from a newer version, reading what is understood"
            );
        }

        let settings = raw.settings;
        let (mappings, skipped) = decode_mappings(raw.mappings);

        info!(
            path = %self.path.display(),
            mappings = mappings.len(),
            skipped,
            "Loaded mapping file"
        );

        LoadedConfig {
            mappings,
            settings,
            skipped,
            ..LoadedConfig::default()
        }
    }

    /// Writes the complete mapping set and settings atomically.
    pub fn save(&self, mappings: &[KeyMapping], settings: &Settings) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&Document::new(mappings, settings))?;

        ConfigTransaction::begin(self)?.commit(&content)?;

        info!(path = %self.path.display(), mappings = mappings.len(), "Saved mapping file");
        Ok(())
    }

    /// Copies a malformed file aside before it gets overwritten.
    ///
    /// `None` when the copy failed; loading goes on regardless.
    fn preserve_corrupt_file(&self) -> Option<PathBuf> {
        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S");

        let original_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| MAPPINGS_FILE.to_string());

        let backup_path = self
            .path
            .with_file_name(format!("{}.corrupt-{}", original_name, timestamp));

        match fs::copy(&self.path, &backup_path) {
            Ok(_) => {
                warn!(backup = %backup_path.display(), "Malformed mapping file preserved");
                Some(backup_path)
            }
            Err(e) => {
                warn!(backup = %backup_path.display(), error = %e, "Could not preserve malformed mapping file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
