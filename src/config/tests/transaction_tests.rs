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

use super::super::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// ConfigTransaction Tests
// ============================================================================

#[test]
fn test_transaction_creates_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("rekey").join("mappings.json");
    let store = ConfigStore::new(path.clone());

    let tx = ConfigTransaction::begin(&store).unwrap();
    assert!(path.parent().unwrap().is_dir(), "Directory should be created on begin");

    tx.commit("{}").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_transaction_replaces_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mappings.json");
    fs::write(&path, "old content").unwrap();

    let store = ConfigStore::new(path.clone());
    ConfigTransaction::begin(&store).unwrap().commit("new content").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "new content");
}

#[test]
fn test_dropped_transaction_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mappings.json");
    fs::write(&path, "original").unwrap();

    let store = ConfigStore::new(path.clone());
    {
        let _tx = ConfigTransaction::begin(&store).unwrap();
        // Dropped without commit
    }

    assert_eq!(fs::read_to_string(&path).unwrap(), "original");
}

#[test]
fn test_transaction_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mappings.json");
    let store = ConfigStore::new(path);

    for i in 0..3 {
        ConfigTransaction::begin(&store)
            .unwrap()
            .commit(&format!("revision {}", i))
            .unwrap();
    }

    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "Only the mapping file should remain");
}

#[test]
fn test_transaction_without_parent_fails() {
    let store = ConfigStore::new(std::path::PathBuf::from("mappings.json"));

    assert!(matches!(
        ConfigTransaction::begin(&store),
        Err(ConfigError::NoParent(_))
    ));
}
