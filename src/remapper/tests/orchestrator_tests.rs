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
use std::{cell::RefCell, fs, rc::Rc};
use tempfile::TempDir;

use crate::core::{keysym, MappingId, MOD_CTRL, MOD_LOCK, MOD_NUMLOCK};
use crate::hook::{OfflineHook, OfflineProbe};

fn f1() -> KeyCombo {
    KeyCombo::bare(keysym::F1)
}

fn f2() -> KeyCombo {
    KeyCombo::bare(keysym::F2)
}

fn f3() -> KeyCombo {
    KeyCombo::bare(keysym::F3)
}

/// Helper: orchestrator over an offline engine and a temp file
fn remapper_in(temp_dir: &TempDir) -> (Remapper, OfflineProbe) {
    let store = ConfigStore::new(temp_dir.path().join("rekey").join("mappings.json"));
    let (hook, probe) = OfflineHook::with_probe();
    let mut remapper = Remapper::new(Box::new(hook), store);
    remapper.load();
    (remapper, probe)
}

fn record_events(remapper: &mut Remapper) -> Rc<RefCell<Vec<RemapEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    remapper.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn saved(remapper: &Remapper) -> Vec<KeyMapping> {
    remapper.store().load().mappings
}

// ============================================================================
// Add
// ============================================================================

#[test]
fn test_add_makes_mapping_live_and_saves_it() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let events = record_events(&mut remapper);

    let id = remapper.add_mapping(f1(), vec![f2()], "swap").unwrap();

    assert!(remapper.is_live(&id));
    assert!(probe.is_grabbed(f1()));
    assert_eq!(remapper.active_count(), 1);
    assert_eq!(saved(&remapper).len(), 1);
    assert_eq!(*events.borrow(), vec![RemapEvent::MappingAdded(id)]);
}

#[test]
fn test_duplicate_source_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);

    let first = remapper.add_mapping(f1(), vec![f2()], "first").unwrap();
    let result = remapper.add_mapping(f1(), vec![f3()], "second");

    match result {
        Err(RemapError::DuplicateSource { existing, .. }) => assert_eq!(existing, first),
        other => panic!("Expected DuplicateSource, got {:?}", other),
    }
    assert_eq!(remapper.mappings().len(), 1);
    assert_eq!(remapper.mappings()[0].target, vec![f2()]);
    assert_eq!(saved(&remapper).len(), 1);
}

#[test]
fn test_invalid_mapping_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);

    let result = remapper.add_mapping(f1(), vec![], "");

    assert!(matches!(result, Err(RemapError::InvalidCombo(_))));
    assert!(remapper.mappings().is_empty());
    assert_eq!(probe.grab_count(), 0);
    assert!(!remapper.store().path().exists());
}

#[test]
fn test_grab_conflict_keeps_mapping_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let events = record_events(&mut remapper);
    probe.deny(f1());

    let result = remapper.add_mapping(f1(), vec![f2()], "taken");

    let id = match result {
        Err(RemapError::GrabFailed { id, .. }) => id,
        other => panic!("Expected GrabFailed, got {:?}", other),
    };
    assert!(!remapper.mapping(&id).unwrap().enabled);
    assert!(!remapper.is_live(&id));
    assert!(!saved(&remapper)[0].enabled);
    assert_eq!(*events.borrow(), vec![RemapEvent::MappingAdded(id.clone())]);

    // Retry once the other client lets go
    probe.allow(f1());
    remapper.set_enabled(&id, true).unwrap();
    assert!(probe.is_grabbed(f1()));
}

#[test]
fn test_saved_before_subscribers_hear_about_it() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);

    let path = remapper.store().path().to_path_buf();
    let on_disk = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&on_disk);
    remapper.subscribe(move |event| {
        if let RemapEvent::MappingAdded(id) = event {
            let content = fs::read_to_string(&path).unwrap();
            *sink.borrow_mut() = Some(content.contains(id.as_str()));
        }
    });

    remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    assert_eq!(*on_disk.borrow(), Some(true));
}

// ============================================================================
// Remove and toggle
// ============================================================================

#[test]
fn test_remove_releases_grab() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    remapper.remove_mapping(&id).unwrap();

    assert!(!probe.is_grabbed(f1()));
    assert!(remapper.mappings().is_empty());
    assert!(saved(&remapper).is_empty());
}

#[test]
fn test_remove_unknown_id() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);

    let result = remapper.remove_mapping(&MappingId::from("deadbeef"));

    assert!(matches!(result, Err(RemapError::UnknownMapping(_))));
}

#[test]
fn test_disable_enable_restores_same_variants() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let combo = KeyCombo::from_raw(keysym::F1, MOD_CTRL);
    let id = remapper.add_mapping(combo, vec![f2()], "").unwrap();
    let before = probe.grabbed_masks(&id).unwrap();

    remapper.set_enabled(&id, false).unwrap();
    assert_eq!(probe.grabbed_masks(&id), None);

    remapper.set_enabled(&id, true).unwrap();
    assert_eq!(probe.grabbed_masks(&id).unwrap(), before);
    assert_eq!(
        before,
        vec![MOD_CTRL, MOD_CTRL | MOD_LOCK, MOD_CTRL | MOD_NUMLOCK, MOD_CTRL | MOD_LOCK | MOD_NUMLOCK]
    );
}

#[test]
fn test_toggle_to_current_value_is_silent() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let events = record_events(&mut remapper);

    remapper.set_enabled(&id, true).unwrap();

    assert!(events.borrow().is_empty());
}

#[test]
fn test_enabling_shadowed_duplicate_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);

    let first = remapper.add_mapping(f1(), vec![f2()], "first").unwrap();
    remapper.set_enabled(&first, false).unwrap();
    let second = remapper.add_mapping(f1(), vec![f3()], "second").unwrap();

    let result = remapper.set_enabled(&first, true);

    assert!(matches!(result, Err(RemapError::DuplicateSource { .. })));
    assert!(!remapper.mapping(&first).unwrap().enabled);
    assert!(remapper.is_live(&second));
    assert!(probe.is_grabbed(f1()));
    assert_eq!(remapper.shadowed_sources().len(), 1);
}

#[test]
fn test_enable_all_and_disable_all() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    remapper.add_mapping(f2(), vec![f3()], "").unwrap();

    assert!(remapper.disable_all().is_empty());
    assert_eq!(remapper.active_count(), 0);
    assert_eq!(probe.grab_count(), 0);

    assert!(remapper.enable_all().is_empty());
    assert_eq!(remapper.active_count(), 2);
}

#[test]
fn test_enable_all_collects_failures() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    remapper.add_mapping(f2(), vec![f3()], "").unwrap();
    remapper.disable_all();
    probe.deny(f2());

    let failures = remapper.enable_all();

    assert_eq!(failures.len(), 1);
    assert_eq!(remapper.active_count(), 1);
}

// ============================================================================
// Edit
// ============================================================================

#[test]
fn test_edit_source_moves_grab() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    remapper
        .edit_mapping(
            &id,
            MappingEdit {
                source: Some(f3()),
                ..MappingEdit::default()
            },
        )
        .unwrap();

    assert!(!probe.is_grabbed(f1()));
    assert!(probe.is_grabbed(f3()));
    assert_eq!(saved(&remapper)[0].source, f3());
}

#[test]
fn test_failed_edit_restores_old_grab() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let events = record_events(&mut remapper);
    probe.deny(f3());

    let result = remapper.edit_mapping(
        &id,
        MappingEdit {
            source: Some(f3()),
            description: Some("moved".to_string()),
            ..MappingEdit::default()
        },
    );

    assert!(matches!(result, Err(RemapError::GrabFailed { .. })));
    assert!(probe.is_grabbed(f1()));
    assert!(remapper.is_live(&id));
    assert_eq!(remapper.mapping(&id).unwrap().source, f1());
    assert_eq!(remapper.mapping(&id).unwrap().description, "");
    assert_eq!(saved(&remapper)[0].source, f1());
    assert!(events.borrow().is_empty());
}

#[test]
fn test_edit_onto_enabled_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let other = remapper.add_mapping(f3(), vec![f2()], "").unwrap();

    let result = remapper.edit_mapping(
        &other,
        MappingEdit {
            source: Some(f1()),
            ..MappingEdit::default()
        },
    );

    assert!(matches!(result, Err(RemapError::DuplicateSource { .. })));
    assert_eq!(remapper.mapping(&other).unwrap().source, f3());
}

#[test]
fn test_edit_target_and_description() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let events = record_events(&mut remapper);

    remapper
        .edit_mapping(
            &id,
            MappingEdit {
                target: Some(vec![f3(), f2()]),
                description: Some("two keys".to_string()),
                ..MappingEdit::default()
            },
        )
        .unwrap();

    let stored = &saved(&remapper)[0];
    assert_eq!(stored.target, vec![f3(), f2()]);
    assert_eq!(stored.description, "two keys");
    assert_eq!(*events.borrow(), vec![RemapEvent::MappingEdited(id)]);
}

// ============================================================================
// Load, reload and settings
// ============================================================================

#[test]
fn test_restart_grabs_saved_mappings() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.shutdown();
    }

    let (remapper, probe) = remapper_in(&temp_dir);

    assert_eq!(remapper.active_count(), 1);
    assert!(probe.is_grabbed(f1()));
}

#[test]
fn test_enable_on_startup_off_loads_disabled() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let (remapper, probe) = remapper_in(&temp_dir);

    assert_eq!(remapper.mappings().len(), 1);
    assert!(!remapper.mappings()[0].enabled);
    assert_eq!(probe.grab_count(), 0);
    // File keeps the user's choice
    assert!(saved(&remapper)[0].enabled);
}

#[test]
fn test_held_back_mappings_survive_unrelated_saves() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let (mut remapper, _probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f3(), vec![f2()], "").unwrap();
    remapper.set_setting(Setting::StartMinimized, true);

    let on_disk = saved(&remapper);
    assert_eq!(on_disk.len(), 2);
    assert!(on_disk.iter().all(|m| m.enabled));
    assert!(!remapper.mappings()[0].enabled);
}

#[test]
fn test_disabling_held_back_mapping_sticks() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let (mut remapper, _probe) = remapper_in(&temp_dir);
    let id = remapper.mappings()[0].id.clone();
    remapper.set_enabled(&id, false).unwrap();

    assert!(!saved(&remapper)[0].enabled);
}

#[test]
fn test_enabling_held_back_mapping_clears_hold() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let (mut remapper, probe) = remapper_in(&temp_dir);
    let id = remapper.mappings()[0].id.clone();
    remapper.set_enabled(&id, true).unwrap();
    remapper.set_enabled(&id, false).unwrap();

    assert!(!probe.is_grabbed(f1()));
    assert!(!saved(&remapper)[0].enabled);
}

#[test]
fn test_disable_all_includes_held_back_mappings() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let (mut remapper, _probe) = remapper_in(&temp_dir);
    assert!(remapper.disable_all().is_empty());

    assert!(!saved(&remapper)[0].enabled);
}

#[test]
fn test_load_as_written_ignores_startup_setting() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
        remapper.set_setting(Setting::EnableOnStartup, false);
    }

    let store = ConfigStore::new(temp_dir.path().join("rekey").join("mappings.json"));
    let (hook, probe) = OfflineHook::with_probe();
    let mut remapper = Remapper::new(Box::new(hook), store);
    remapper.load_as_written();
    remapper.add_mapping(f3(), vec![f2()], "").unwrap();

    assert!(probe.is_grabbed(f1()));
    assert!(saved(&remapper).iter().all(|m| m.enabled));
}

#[test]
fn test_load_disables_unavailable_grab() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut remapper, _probe) = remapper_in(&temp_dir);
        remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    }

    let store = ConfigStore::new(temp_dir.path().join("rekey").join("mappings.json"));
    let (hook, probe) = OfflineHook::with_probe();
    probe.deny(f1());
    let mut remapper = Remapper::new(Box::new(hook), store);

    let report = remapper.load();

    assert_eq!(report.loaded, 1);
    assert_eq!(report.live, 0);
    assert_eq!(report.failed.len(), 1);
    assert!(!remapper.mappings()[0].enabled);

    // Saving something else keeps F1 enabled for the next start
    remapper.add_mapping(f3(), vec![f2()], "").unwrap();
    assert!(saved(&remapper).iter().all(|m| m.enabled));
}

#[test]
fn test_unusable_file_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rekey").join("mappings.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, [0xc3, 0x28, 0xff]).unwrap();

    let (hook, _probe) = OfflineHook::with_probe();
    let mut remapper = Remapper::new(Box::new(hook), ConfigStore::new(path));
    let report = remapper.load();

    assert!(report.problem.is_some());
    assert!(report.recovered_to.is_some());
    assert!(remapper.mappings().is_empty());
    assert!(remapper.add_mapping(f1(), vec![f2()], "").is_ok());
}

#[test]
fn test_reload_keeps_mappings_when_file_turns_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let events = record_events(&mut remapper);

    fs::write(remapper.store().path(), "{ half written").unwrap();

    assert!(!remapper.reload_from_store());
    assert_eq!(remapper.mappings().len(), 1);
    assert!(probe.is_grabbed(f1()));
    assert!(matches!(
        events.borrow().last(),
        Some(RemapEvent::ErrorOccurred(ErrorKind::Persistence, _))
    ));
}

#[test]
fn test_reload_picks_up_outside_changes() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let events = record_events(&mut remapper);

    assert!(!remapper.reload_from_store());

    // Another process adds a mapping
    let outside = ConfigStore::new(remapper.store().path().to_path_buf());
    let mut mappings = outside.load().mappings;
    mappings.push(KeyMapping::new(f3(), vec![f2()], "from cli"));
    outside.save(&mappings, &Settings::default()).unwrap();

    assert!(remapper.reload_from_store());
    assert_eq!(remapper.mappings().len(), 2);
    assert!(probe.is_grabbed(f3()));
    assert_eq!(events.borrow().last(), Some(&RemapEvent::Reloaded));
}

#[test]
fn test_setting_change_is_saved() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, _probe) = remapper_in(&temp_dir);
    let events = record_events(&mut remapper);

    remapper.set_setting(Setting::StartMinimized, true);
    remapper.set_setting(Setting::StartMinimized, true);

    assert!(remapper.store().load().settings.start_minimized);
    assert_eq!(*events.borrow(), vec![RemapEvent::SettingsChanged]);
}

#[test]
fn test_shutdown_releases_all_grabs() {
    let temp_dir = TempDir::new().unwrap();
    let (mut remapper, probe) = remapper_in(&temp_dir);
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    remapper.shutdown();
    remapper.shutdown();

    assert_eq!(probe.grab_count(), 0);
    assert!(probe.is_shut_down());
    assert_eq!(remapper.active_count(), 0);
}
