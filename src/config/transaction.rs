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

//! Atomic mapping-file writes
//!
//! The new content goes to a temporary file in the same directory and is
//! renamed over the old file on commit, so readers see either the old
//! document or the new one.

use atomic_write_file::AtomicWriteFile;
use std::{fs, io::Write};

use crate::config::{ConfigError, ConfigStore};

/// One pending write of the mapping file.
///
/// # Lifecycle
///
/// 1. `begin()` - Ensures the config directory exists
/// 2. Caller serialises the document (in memory)
/// 3. `commit()` - Writes atomically; dropping without commit writes nothing
///
/// # Example
///
/// ```no_run
/// use rekey::config::{ConfigStore, ConfigTransaction};
/// use std::path::PathBuf;
///
/// let store = ConfigStore::new(PathBuf::from("/tmp/rekey/mappings.json"));
/// let tx = ConfigTransaction::begin(&store)?;
/// tx.commit("{\"version\": 1, \"mappings\": []}")?;
/// # Ok::<(), rekey::config::ConfigError>(())
/// ```
pub struct ConfigTransaction<'a> {
    store: &'a ConfigStore,
}

impl<'a> ConfigTransaction<'a> {
    /// Begins a write, creating the config directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no parent or the directory cannot
    /// be created.
    pub fn begin(store: &'a ConfigStore) -> Result<Self, ConfigError> {
        let dir = store
            .path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConfigError::NoParent(store.path().to_path_buf()))?;

        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        Ok(Self { store })
    }

    /// Commits the transaction by atomically replacing the mapping file.
    ///
    /// Consumes the transaction, preventing accidental double-commits. On
    /// error the previous file is left untouched.
    pub fn commit(self, content: &str) -> Result<(), ConfigError> {
        let mut file = AtomicWriteFile::options()
            .open(self.store.path())
            .map_err(|e| {
                ConfigError::WriteFailed(format!("Failed to open for atomic write: {}", e))
            })?;

        file.write_all(content.as_bytes())
            .map_err(|e| ConfigError::WriteFailed(format!("Failed to write content: {}", e)))?;

        file.commit().map_err(|e| {
            ConfigError::WriteFailed(format!("Failed to commit atomic write: {}", e))
        })?;

        Ok(())
    }
}
