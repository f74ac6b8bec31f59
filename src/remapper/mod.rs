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

//! Mapping orchestrator
//!
//! Owns the mapping set and keeps three things in step: the enabled flags,
//! the grabs held by the interception engine, and the file on disk.
//!
//! # Invariants
//!
//! - No two enabled mappings share a source combo
//! - A mapping is live (grabbed) only while it is enabled
//! - Every successful mutation writes the file once, then notifies
//!   subscribers once
//!
//! # Example
//!
//! ```no_run
//! use rekey::config::ConfigStore;
//! use rekey::core::{keysym, KeyCombo};
//! use rekey::hook::OfflineHook;
//! use rekey::remapper::Remapper;
//!
//! let store = ConfigStore::new(ConfigStore::default_path()?);
//! let mut remapper = Remapper::new(Box::new(OfflineHook::new()), store);
//! remapper.load();
//!
//! let id = remapper.add_mapping(
//!     KeyCombo::bare(keysym::F1),
//!     vec![KeyCombo::bare(keysym::F2)],
//!     "F1 acts as F2",
//! )?;
//! println!("added {}", id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;

pub use error::{ErrorKind, RemapError};

use std::{
    collections::{HashMap, HashSet},
    os::fd::RawFd,
    path::PathBuf,
};

use tracing::{debug, error, info, warn};

use crate::config::{ConfigStore, LoadedConfig};
use crate::core::{
    validate_mapping, Conflict, ConflictDetector, KeyCombo, KeyMapping, MappingId, Settings,
};
use crate::hook::{GrabHandle, HookError, HookEvent, KeyHook};

/// Change notifications for observers (GUI, logs)
#[derive(Clone, Debug, PartialEq)]
pub enum RemapEvent {
    MappingAdded(MappingId),
    MappingRemoved(MappingId),
    MappingToggled(MappingId, bool),
    MappingEdited(MappingId),
    SettingsChanged,
    /// Mapping set replaced from disk
    Reloaded,
    /// Capture mode recorded a combo
    KeyCaptured(KeyCombo),
    ErrorOccurred(ErrorKind, String),
}

/// Partial update for `edit_mapping`. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingEdit {
    pub source: Option<KeyCombo>,
    pub target: Option<Vec<KeyCombo>>,
    pub description: Option<String>,
}

/// Boolean settings that can be changed at runtime
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Setting {
    StartMinimized,
    EnableOnStartup,
}

/// Summary of a load from disk
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub live: usize,
    /// Entries in the file that could not be used
    pub skipped: usize,
    /// Enabled mappings that could not be made live
    pub failed: Vec<RemapError>,
    pub recovered_to: Option<PathBuf>,
    /// Why the file was replaced by an empty set, if it was
    pub problem: Option<String>,
}

type Subscriber = Box<dyn Fn(&RemapEvent)>;

/// Upper bound on drain passes per wake-up
const MAX_DRAIN_ROUNDS: usize = 8;

/// Coordinates mappings, grabs and persistence.
///
/// Single-threaded. Subscribers are called while the orchestrator is still
/// mutably borrowed, so they must not call back into it synchronously.
pub struct Remapper {
    hook: Box<dyn KeyHook>,
    store: ConfigStore,
    mappings: Vec<KeyMapping>,
    settings: Settings,
    /// Source combo of each live mapping, for O(1) dispatch
    live: HashMap<KeyCombo, MappingId>,
    handles: HashMap<MappingId, GrabHandle>,
    /// Switched off at load or by a lost grab, not by the user. Saved as
    /// enabled so the next start tries again.
    held_back: HashSet<MappingId>,
    subscribers: Vec<Subscriber>,
    /// Display connection lost; interception is off
    degraded: bool,
    capturing: bool,
}

impl Remapper {
    /// Creates an empty orchestrator. Call `load` to read the file.
    pub fn new(hook: Box<dyn KeyHook>, store: ConfigStore) -> Self {
        Self {
            hook,
            store,
            mappings: Vec::new(),
            settings: Settings::default(),
            live: HashMap::new(),
            handles: HashMap::new(),
            held_back: HashSet::new(),
            subscribers: Vec::new(),
            degraded: false,
            capturing: false,
        }
    }

    /// Reads the file and grabs every enabled mapping.
    ///
    /// When `enable_on_startup` is off, mappings are loaded but left
    /// disabled. Mappings whose grab fails are disabled and listed in the
    /// report. Neither case writes the file.
    ///
    /// An unusable file loads as an empty set; `LoadReport::problem` says
    /// why.
    pub fn load(&mut self) -> LoadReport {
        let loaded = self.store.load();
        self.apply_loaded(loaded, true)
    }

    /// Reads the file with its enabled flags as written, ignoring
    /// `enable_on_startup`. One-shot edits use this so saving does not
    /// turn every mapping off.
    pub fn load_as_written(&mut self) -> LoadReport {
        let loaded = self.store.load();
        self.apply_loaded(loaded, false)
    }

    /// Re-reads the file after an outside change.
    ///
    /// Returns `false` when the file matches what is already in memory, or
    /// when it cannot be used (the mappings in memory stay). Unlike `load`,
    /// the file's enabled flags are honoured as written.
    pub fn reload_from_store(&mut self) -> bool {
        let loaded = self.store.load();

        if let Some(problem) = loaded.problem {
            warn!(problem = %problem, "Ignoring unusable mapping file");
            self.notify(&RemapEvent::ErrorOccurred(ErrorKind::Persistence, problem));
            return false;
        }

        if loaded.mappings == self.as_written() && loaded.settings == self.settings {
            return false;
        }

        info!("Mapping file changed on disk, reloading");
        let report = self.apply_loaded(loaded, false);
        for failure in &report.failed {
            self.notify(&RemapEvent::ErrorOccurred(failure.kind(), failure.to_string()));
        }
        self.notify(&RemapEvent::Reloaded);
        true
    }

    fn apply_loaded(&mut self, loaded: LoadedConfig, startup: bool) -> LoadReport {
        self.release_all();
        self.held_back.clear();

        let LoadedConfig {
            mappings,
            settings,
            skipped,
            recovered_to,
            problem,
        } = loaded;

        self.mappings = mappings;
        self.settings = settings;

        let mut report = LoadReport {
            loaded: self.mappings.len(),
            skipped,
            recovered_to,
            problem,
            ..LoadReport::default()
        };

        let hold_back = startup && !self.settings.enable_on_startup;
        let enabled_ids: Vec<MappingId> = self
            .mappings
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.id.clone())
            .collect();

        for id in enabled_ids {
            if hold_back {
                self.hold_back(&id);
                continue;
            }

            // A hand-edited file may enable the same source twice; first wins
            let Some(source) = self.mapping(&id).map(|m| m.source) else {
                continue;
            };
            if let Some(existing) = self.live.get(&source).cloned() {
                let e = RemapError::DuplicateSource {
                    source_combo: source,
                    existing,
                };
                warn!(id = %id, error = %e, "Disabling duplicate mapping");
                self.hold_back(&id);
                report.failed.push(e);
                continue;
            }

            if let Err(e) = self.activate(&id) {
                warn!(id = %id, error = %e, "Mapping could not be made live");
                self.hold_back(&id);
                report.failed.push(e);
            }
        }

        report.live = self.live.len();
        info!(
            loaded = report.loaded,
            live = report.live,
            held_back = hold_back,
            "Mappings applied"
        );
        report
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Adds a mapping and makes it live.
    ///
    /// # Arguments
    ///
    /// * `source` - Physical combo to intercept
    /// * `target` - Sequence typed instead, in order
    /// * `description` - Free text shown in the list
    ///
    /// # Returns
    ///
    /// * `Ok(MappingId)` - Stored and live
    /// * `Err(RemapError::GrabFailed)` - Stored but disabled; the user can
    ///   retry by enabling it
    /// * `Err(RemapError::DuplicateSource)` - Nothing changed
    /// * `Err(RemapError::InvalidCombo)` - Nothing changed
    pub fn add_mapping(
        &mut self,
        source: KeyCombo,
        target: Vec<KeyCombo>,
        description: impl Into<String>,
    ) -> Result<MappingId, RemapError> {
        let mapping = KeyMapping::new(source, target, description);
        validate_mapping(&mapping)?;

        let id = mapping.id.clone();
        if let Some(existing) = self.enabled_owner(&source, &id) {
            return Err(RemapError::DuplicateSource {
                source_combo: source,
                existing,
            });
        }

        self.mappings.push(mapping);

        let outcome = self.activate(&id);
        if matches!(outcome, Err(RemapError::DuplicateSource { .. })) {
            // Same physical key as a live mapping
            self.mappings.pop();
            return outcome.map(|()| id);
        }
        if outcome.is_err() {
            self.set_flag(&id, false);
        }

        self.persist();
        self.notify(&RemapEvent::MappingAdded(id.clone()));

        match outcome {
            Ok(()) => {
                info!(id = %id, source = %source, "Mapping added");
                Ok(id)
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Mapping added but not live");
                Err(e)
            }
        }
    }

    /// Deletes a mapping, releasing its grab first.
    pub fn remove_mapping(&mut self, id: &MappingId) -> Result<(), RemapError> {
        let index = self.index_of(id)?;

        self.deactivate(id);
        self.mappings.remove(index);
        self.held_back.remove(id);

        self.persist();
        self.notify(&RemapEvent::MappingRemoved(id.clone()));
        info!(id = %id, "Mapping removed");
        Ok(())
    }

    /// Turns a mapping on or off.
    ///
    /// Enabling checks for another enabled mapping with the same source and
    /// grabs; on failure nothing changes. Setting the current value is a
    /// no-op that writes nothing.
    pub fn set_enabled(&mut self, id: &MappingId, enabled: bool) -> Result<(), RemapError> {
        let index = self.index_of(id)?;
        if self.mappings[index].enabled == enabled {
            // Held back mappings are off in memory only; turning one off
            // explicitly makes that stick
            if !enabled && self.held_back.remove(id) {
                self.persist();
                info!(id = %id, "Held back mapping disabled for good");
            }
            return Ok(());
        }

        if enabled {
            self.ensure_source_free(id)?;
            self.activate(id)?;
        } else {
            self.deactivate(id);
        }
        self.mappings[index].enabled = enabled;
        self.held_back.remove(id);

        self.persist();
        self.notify(&RemapEvent::MappingToggled(id.clone(), enabled));
        info!(id = %id, enabled, "Mapping toggled");
        Ok(())
    }

    /// Changes source, target or description.
    ///
    /// Changing the source of a live mapping moves the grab. If the new
    /// source cannot be grabbed the old grab is restored and nothing is
    /// written or announced.
    pub fn edit_mapping(&mut self, id: &MappingId, edit: MappingEdit) -> Result<(), RemapError> {
        let index = self.index_of(id)?;
        let current = self.mappings[index].clone();

        let mut updated = current.clone();
        if let Some(source) = edit.source {
            updated.source = source;
        }
        if let Some(target) = edit.target {
            updated.target = target;
        }
        if let Some(description) = edit.description {
            updated.description = description;
        }

        if updated == current {
            return Ok(());
        }
        validate_mapping(&updated)?;

        let moves_grab = updated.enabled && updated.source != current.source;
        if moves_grab {
            if let Some(existing) = self.enabled_owner(&updated.source, id) {
                return Err(RemapError::DuplicateSource {
                    source_combo: updated.source,
                    existing,
                });
            }

            let was_live = self.handles.contains_key(id);
            self.deactivate(id);
            self.mappings[index] = updated;

            if let Err(e) = self.activate(id) {
                self.mappings[index] = current;
                if was_live {
                    self.restore_grab(id);
                }
                return Err(e);
            }
        } else {
            self.mappings[index] = updated;
        }

        self.persist();
        self.notify(&RemapEvent::MappingEdited(id.clone()));
        info!(id = %id, "Mapping edited");
        Ok(())
    }

    /// Enables every disabled mapping, collecting failures.
    pub fn enable_all(&mut self) -> Vec<RemapError> {
        self.toggle_all(true)
    }

    /// Disables every enabled mapping.
    pub fn disable_all(&mut self) -> Vec<RemapError> {
        self.toggle_all(false)
    }

    fn toggle_all(&mut self, enabled: bool) -> Vec<RemapError> {
        let ids: Vec<MappingId> = self
            .mappings
            .iter()
            .filter(|m| m.enabled != enabled || (!enabled && self.held_back.contains(&m.id)))
            .map(|m| m.id.clone())
            .collect();

        ids.iter()
            .filter_map(|id| self.set_enabled(id, enabled).err())
            .collect()
    }

    pub fn set_setting(&mut self, setting: Setting, value: bool) {
        let slot = match setting {
            Setting::StartMinimized => &mut self.settings.start_minimized,
            Setting::EnableOnStartup => &mut self.settings.enable_on_startup,
        };
        if *slot == value {
            return;
        }
        *slot = value;

        self.persist();
        self.notify(&RemapEvent::SettingsChanged);
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Drains the engine and reacts to what it saw.
    ///
    /// Called from the fd watch and after every mutation.
    pub fn process_pending(&mut self) {
        // Round trips while handling can buffer more events
        for _ in 0..MAX_DRAIN_ROUNDS {
            if self.degraded {
                return;
            }

            match self.hook.drain_events() {
                Ok(events) if events.is_empty() => return,
                Ok(events) => self.handle_events(events),
                Err(HookError::Connection(message)) => {
                    self.enter_degraded(message);
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Could not read engine events");
                    return;
                }
            }
        }
    }

    /// Reacts to engine events.
    ///
    /// A press of a live source types its target exactly once. Presses are
    /// ignored while capture mode is on.
    pub fn handle_events(&mut self, events: Vec<HookEvent>) {
        for event in events {
            match event {
                HookEvent::Pressed(combo) => self.dispatch(combo),
                HookEvent::Released(_) => {}
                HookEvent::KeymapChanged => self.regrab_live(),
                HookEvent::GrabLost { id, cause } => {
                    if self.handles.contains_key(&id) {
                        self.lose_grab(&id, cause);
                    }
                }
                HookEvent::Captured(combo) => {
                    self.capturing = false;
                    debug!(combo = %combo, "Captured");
                    self.notify(&RemapEvent::KeyCaptured(combo));
                }
            }
        }
    }

    fn dispatch(&mut self, combo: KeyCombo) {
        if self.capturing {
            return;
        }

        let Some(id) = self.live.get(&combo) else {
            debug!(combo = %combo, "Press for combo that is no longer live");
            return;
        };

        let Some(target) = self
            .mappings
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.target.clone())
        else {
            return;
        };

        debug!(id = %id, source = %combo, "Remapping");

        match self.hook.simulate(&target) {
            Ok(()) => {}
            Err(HookError::Connection(message)) => self.enter_degraded(message),
            Err(e) => {
                warn!(combo = %combo, error = %e, "Could not type target");
                self.notify(&RemapEvent::ErrorOccurred(ErrorKind::Simulate, e.to_string()));
            }
        }
    }

    /// Layout changed: keycodes may have moved, so every grab is redone.
    fn regrab_live(&mut self) {
        let ids: Vec<MappingId> = self.handles.keys().cloned().collect();
        for id in ids {
            let Some(source) = self.mapping(&id).map(|m| m.source) else {
                continue;
            };

            match self.hook.grab(&id, source) {
                Ok(handle) => {
                    self.handles.insert(id, handle);
                }
                Err(e) => self.lose_grab(&id, e),
            }
        }
    }

    /// The engine no longer holds a live mapping's grab.
    ///
    /// The mapping is switched off in memory only; the file keeps it enabled.
    fn lose_grab(&mut self, id: &MappingId, cause: HookError) {
        warn!(id = %id, error = %cause, "Grab lost");

        if let Some(handle) = self.handles.remove(id) {
            self.live.remove(&handle.combo);
        }
        self.hold_back(id);

        self.notify(&RemapEvent::MappingToggled(id.clone(), false));
        self.notify(&RemapEvent::ErrorOccurred(ErrorKind::Grab, cause.to_string()));
    }

    fn enter_degraded(&mut self, message: String) {
        if self.degraded {
            return;
        }

        error!(reason = %message, "Display connection lost, interception disabled");
        self.degraded = true;
        self.capturing = false;
        self.live.clear();
        self.handles.clear();
        self.notify(&RemapEvent::ErrorOccurred(ErrorKind::Connection, message));
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Starts recording the next physical combo.
    ///
    /// The result arrives as `RemapEvent::KeyCaptured`. Live mappings do not
    /// fire while recording.
    pub fn begin_capture(&mut self) -> Result<(), RemapError> {
        if self.degraded {
            return Err(RemapError::Connection(HookError::Connection(
                "display connection lost".to_string(),
            )));
        }
        self.hook.begin_capture().map_err(RemapError::Connection)?;
        self.capturing = true;
        Ok(())
    }

    pub fn cancel_capture(&mut self) {
        if self.capturing {
            self.hook.end_capture();
            self.capturing = false;
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn mappings(&self) -> &[KeyMapping] {
        &self.mappings
    }

    pub fn mapping(&self, id: &MappingId) -> Option<&KeyMapping> {
        self.mappings.iter().find(|m| &m.id == id)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Number of mappings currently intercepting keys
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, id: &MappingId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Sources used by more than one mapping (only one can be enabled)
    pub fn shadowed_sources(&self) -> Vec<Conflict> {
        ConflictDetector::from_mappings(&self.mappings).find_conflicts()
    }

    pub fn backend_name(&self) -> &'static str {
        self.hook.name()
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        if self.degraded {
            None
        } else {
            self.hook.raw_fd()
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Registers an observer for change notifications.
    pub fn subscribe(&mut self, subscriber: impl Fn(&RemapEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Releases every grab and closes the engine. Idempotent.
    pub fn shutdown(&mut self) {
        self.cancel_capture();
        self.live.clear();
        self.handles.clear();
        self.hook.shutdown();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn index_of(&self, id: &MappingId) -> Result<usize, RemapError> {
        self.mappings
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| RemapError::UnknownMapping(id.clone()))
    }

    /// Another enabled mapping using `source`, if any
    fn enabled_owner(&self, source: &KeyCombo, id: &MappingId) -> Option<MappingId> {
        self.mappings
            .iter()
            .find(|m| m.enabled && &m.source == source && &m.id != id)
            .map(|m| m.id.clone())
    }

    fn ensure_source_free(&self, id: &MappingId) -> Result<(), RemapError> {
        let index = self.index_of(id)?;
        let source = self.mappings[index].source;

        match self.enabled_owner(&source, id) {
            Some(existing) => Err(RemapError::DuplicateSource {
                source_combo: source,
                existing,
            }),
            None => Ok(()),
        }
    }

    /// Grabs the mapping's source and records it as live
    fn activate(&mut self, id: &MappingId) -> Result<(), RemapError> {
        let index = self.index_of(id)?;
        let source = self.mappings[index].source;

        if self.degraded {
            return Err(RemapError::Connection(HookError::Connection(
                "display connection lost".to_string(),
            )));
        }

        match self.hook.grab(id, source) {
            Ok(handle) => {
                self.live.insert(source, id.clone());
                self.handles.insert(id.clone(), handle);

                // A held back mapping on the same source cannot come back
                let mappings = &self.mappings;
                self.held_back.retain(|held| {
                    !mappings
                        .iter()
                        .any(|m| &m.id == held && &m.id != id && m.source == source)
                });
                Ok(())
            }
            Err(HookError::SharedKey { holder, .. }) => Err(RemapError::DuplicateSource {
                source_combo: source,
                existing: holder,
            }),
            Err(e @ HookError::Connection(_)) => Err(RemapError::Connection(e)),
            Err(cause) => Err(RemapError::GrabFailed {
                id: id.clone(),
                source_combo: source,
                cause,
            }),
        }
    }

    fn deactivate(&mut self, id: &MappingId) {
        if let Some(handle) = self.handles.remove(id) {
            self.hook.ungrab(&handle);
            self.live.remove(&handle.combo);
        }
    }

    /// Puts back a grab removed during a failed edit
    fn restore_grab(&mut self, id: &MappingId) {
        if let Err(e) = self.activate(id) {
            error!(id = %id, error = %e, "Could not restore grab, disabling mapping");
            self.set_flag(id, false);
            self.persist();
            self.notify(&RemapEvent::MappingToggled(id.clone(), false));
        }
    }

    fn release_all(&mut self) {
        let ids: Vec<MappingId> = self.handles.keys().cloned().collect();
        for id in ids {
            self.deactivate(&id);
        }
    }

    fn set_flag(&mut self, id: &MappingId, enabled: bool) {
        if let Some(mapping) = self.mappings.iter_mut().find(|m| &m.id == id) {
            mapping.enabled = enabled;
        }
    }

    /// Disables a mapping in memory without the change reaching the file
    fn hold_back(&mut self, id: &MappingId) {
        self.set_flag(id, false);
        self.held_back.insert(id.clone());
    }

    /// The mapping set as it belongs on disk
    fn as_written(&self) -> Vec<KeyMapping> {
        self.mappings
            .iter()
            .map(|m| {
                let mut written = m.clone();
                if self.held_back.contains(&m.id) {
                    written.enabled = true;
                }
                written
            })
            .collect()
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.as_written(), &self.settings) {
            error!(error = %e, "Could not save mappings");
            self.notify(&RemapEvent::ErrorOccurred(ErrorKind::Persistence, e.to_string()));
        }
    }

    fn notify(&self, event: &RemapEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }
}

#[cfg(test)]
mod tests;
