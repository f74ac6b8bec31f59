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

//! Watches the mapping file for changes made by other processes
//!
//! Uses inotify via the notify crate. The directory is watched rather than
//! the file, because atomic saves replace the file with a rename and a
//! watch on the old inode would go quiet.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    ffi::OsString,
    fs,
    path::Path,
    sync::mpsc::{channel, Receiver},
};

/// Reports writes to one file
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    file_name: OsString,
}

impl ConfigWatcher {
    /// Starts watching the directory containing `path`, creating it if needed.
    pub fn new(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or("mapping file has no parent directory")?;
        let file_name = path
            .file_name()
            .ok_or("mapping file has no file name")?
            .to_os_string();

        fs::create_dir_all(dir)?;

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            file_name,
        })
    }

    /// Drains pending notifications (non-blocking); true if the file changed
    pub fn check_for_changes(&self) -> bool {
        let mut changed = false;
        while let Ok(event_result) = self.rx.try_recv() {
            if let Ok(event) = event_result {
                changed |= touches_file(&event, &self.file_name);
            }
        }
        changed
    }
}

/// Whether `event` creates, rewrites or renames onto `file_name`
pub(crate) fn touches_file(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));

    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
