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
use std::{cell::RefCell, rc::Rc};
use tempfile::TempDir;

use crate::core::{keysym, MOD_CTRL, MOD_SHIFT};
use crate::hook::{fixtures::us_layout, OfflineHook, OfflineProbe, TypingStep};

fn f1() -> KeyCombo {
    KeyCombo::bare(keysym::F1)
}

fn f2() -> KeyCombo {
    KeyCombo::bare(keysym::F2)
}

fn f3() -> KeyCombo {
    KeyCombo::bare(keysym::F3)
}

fn setup() -> (TempDir, Remapper, OfflineProbe, Rc<RefCell<Vec<RemapEvent>>>) {
    let (hook, probe) = OfflineHook::with_probe();
    setup_with(hook, probe)
}

fn setup_with(
    hook: OfflineHook,
    probe: OfflineProbe,
) -> (TempDir, Remapper, OfflineProbe, Rc<RefCell<Vec<RemapEvent>>>) {
    let temp_dir = TempDir::new().unwrap();
    let store = ConfigStore::new(temp_dir.path().join("mappings.json"));

    let mut remapper = Remapper::new(Box::new(hook), store);
    remapper.load();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    remapper.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    (temp_dir, remapper, probe, events)
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_press_types_target_exactly_once() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    probe.press(f1());
    probe.release(f1());
    remapper.process_pending();

    assert_eq!(probe.simulated(), vec![vec![f2()]]);
}

#[test]
fn test_multi_key_target_typed_in_order() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    let copy = KeyCombo::from_raw(0x63, MOD_CTRL);
    let paste = KeyCombo::from_raw(0x76, MOD_CTRL);
    remapper.add_mapping(f1(), vec![copy, paste], "").unwrap();

    probe.press(f1());
    remapper.process_pending();

    assert_eq!(probe.simulated(), vec![vec![copy, paste]]);
}

#[test]
fn test_disabled_mapping_does_not_fire() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    remapper.set_enabled(&id, false).unwrap();

    probe.press(f1());
    remapper.process_pending();

    assert!(probe.simulated().is_empty());
}

#[test]
fn test_stale_press_after_removal_is_ignored() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    probe.press(f1());
    remapper.remove_mapping(&id).unwrap();
    remapper.process_pending();

    assert!(probe.simulated().is_empty());
}

#[test]
fn test_unmapped_target_reports_error() {
    let (_temp_dir, mut remapper, probe, events) = setup();
    remapper.add_mapping(f1(), vec![KeyCombo::bare(keysym::F24)], "").unwrap();
    probe.unmap(keysym::F24);

    probe.press(f1());
    remapper.process_pending();

    assert!(probe.simulated().is_empty());
    assert!(matches!(
        events.borrow().last(),
        Some(RemapEvent::ErrorOccurred(ErrorKind::Simulate, _))
    ));
}

#[test]
fn test_keyboard_released_before_typing() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    probe.press(f1());
    remapper.process_pending();

    assert_eq!(
        probe.typing_steps(),
        vec![TypingStep::ReleaseKeyboard, TypingStep::Type(vec![f2()])]
    );
}

// ============================================================================
// Typed keys that hit live grabs
// ============================================================================

#[test]
fn test_swap_fires_once_per_press() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    probe.echo_typed_keys();
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let back = remapper.add_mapping(f2(), vec![f1()], "").unwrap();

    probe.press(f1());
    remapper.process_pending();

    assert_eq!(probe.simulated(), vec![vec![f2()]]);
    assert_eq!(
        probe.typing_steps(),
        vec![
            TypingStep::ReleaseKeyboard,
            TypingStep::Suspend(back.clone()),
            TypingStep::Type(vec![f2()]),
            TypingStep::Resume(back),
        ]
    );
    assert!(probe.is_grabbed(f1()));
    assert!(probe.is_grabbed(f2()));
    assert_eq!(remapper.active_count(), 2);
}

#[test]
fn test_self_map_fires_once() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    probe.echo_typed_keys();
    let id = remapper.add_mapping(f3(), vec![f3()], "").unwrap();

    probe.press(f3());
    remapper.process_pending();
    probe.press(f3());
    remapper.process_pending();

    assert_eq!(probe.simulated(), vec![vec![f3()], vec![f3()]]);
    assert!(remapper.is_live(&id));
}

#[test]
fn test_grab_not_restored_after_typing_is_held_back() {
    let (_temp_dir, mut remapper, probe, events) = setup();
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    let second = remapper.add_mapping(f2(), vec![f3()], "").unwrap();
    events.borrow_mut().clear();

    // Someone else takes F2 while it is suspended
    probe.deny(f2());
    probe.press(f1());
    remapper.process_pending();

    assert_eq!(probe.simulated(), vec![vec![f2()]]);
    assert!(!remapper.is_live(&second));
    assert!(!remapper.mapping(&second).unwrap().enabled);
    assert_eq!(remapper.active_count(), 1);
    assert!(remapper.store().load().mappings.iter().all(|m| m.enabled));

    let events = events.borrow();
    assert_eq!(events[0], RemapEvent::MappingToggled(second, false));
    assert!(matches!(events[1], RemapEvent::ErrorOccurred(ErrorKind::Grab, _)));
}

#[test]
fn test_same_physical_key_cannot_be_live_twice() {
    let (hook, probe) = OfflineHook::with_probe();
    let (_temp_dir, mut remapper, probe, events) = setup_with(hook.with_keymap(us_layout()), probe);
    let upper_a = remapper.add_mapping(KeyCombo::bare(0x41), vec![f2()], "").unwrap();
    events.borrow_mut().clear();

    let result = remapper.add_mapping(KeyCombo::from_raw(0x61, MOD_SHIFT), vec![f3()], "");

    match result {
        Err(RemapError::DuplicateSource { existing, .. }) => assert_eq!(existing, upper_a),
        other => panic!("expected DuplicateSource, got {:?}", other),
    }
    assert_eq!(remapper.mappings().len(), 1);
    assert_eq!(remapper.store().load().mappings.len(), 1);
    assert_eq!(remapper.active_count(), 1);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_enabling_same_physical_key_fails() {
    let (hook, probe) = OfflineHook::with_probe();
    let (_temp_dir, mut remapper, _probe, _events) = setup_with(hook.with_keymap(us_layout()), probe);
    let shifted = remapper
        .add_mapping(KeyCombo::from_raw(0x61, MOD_SHIFT), vec![f3()], "")
        .unwrap();
    remapper.set_enabled(&shifted, false).unwrap();
    remapper.add_mapping(KeyCombo::bare(0x41), vec![f2()], "").unwrap();

    let result = remapper.set_enabled(&shifted, true);

    assert!(matches!(result, Err(RemapError::DuplicateSource { .. })));
    assert!(!remapper.mapping(&shifted).unwrap().enabled);
}

// ============================================================================
// Layout changes and connection loss
// ============================================================================

#[test]
fn test_keymap_change_regrabs_live_mappings() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();

    probe.change_keymap();
    remapper.process_pending();

    assert!(remapper.is_live(&id));
    assert!(probe.is_grabbed(f1()));
}

#[test]
fn test_grab_lost_on_keymap_change_disables_mapping() {
    let (_temp_dir, mut remapper, probe, events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    events.borrow_mut().clear();
    probe.deny(f1());

    probe.change_keymap();
    remapper.process_pending();

    assert!(!remapper.mapping(&id).unwrap().enabled);
    assert!(!remapper.is_live(&id));
    // Off for this session only; the next start tries again
    assert!(remapper.store().load().mappings[0].enabled);

    let events = events.borrow();
    assert_eq!(events[0], RemapEvent::MappingToggled(id, false));
    assert!(matches!(events[1], RemapEvent::ErrorOccurred(ErrorKind::Grab, _)));
}

#[test]
fn test_connection_loss_enters_degraded_mode() {
    let (_temp_dir, mut remapper, probe, events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    events.borrow_mut().clear();

    probe.disconnect();
    remapper.process_pending();
    remapper.process_pending();

    assert!(remapper.is_degraded());
    assert_eq!(remapper.active_count(), 0);
    assert_eq!(remapper.raw_fd(), None);
    // Reported once
    assert_eq!(events.borrow().len(), 1);
    assert!(matches!(
        events.borrow()[0],
        RemapEvent::ErrorOccurred(ErrorKind::Connection, _)
    ));
    // The user's intent survives in the file
    assert!(remapper.mapping(&id).unwrap().enabled);
}

#[test]
fn test_degraded_mode_rejects_enable() {
    let (_temp_dir, mut remapper, probe, _events) = setup();
    let id = remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    remapper.set_enabled(&id, false).unwrap();

    probe.disconnect();
    remapper.process_pending();

    assert!(matches!(
        remapper.set_enabled(&id, true),
        Err(RemapError::Connection(_))
    ));
    assert!(!remapper.mapping(&id).unwrap().enabled);
}

// ============================================================================
// Capture
// ============================================================================

#[test]
fn test_capture_suppresses_remapping_and_reports_combo() {
    let (_temp_dir, mut remapper, probe, events) = setup();
    remapper.add_mapping(f1(), vec![f2()], "").unwrap();
    events.borrow_mut().clear();

    remapper.begin_capture().unwrap();
    assert!(probe.is_capturing());

    probe.press(f1());
    probe.capture(f1());
    remapper.process_pending();

    assert!(probe.simulated().is_empty());
    assert!(!remapper.is_capturing());
    assert_eq!(*events.borrow(), vec![RemapEvent::KeyCaptured(f1())]);

    // Back to normal afterwards
    probe.press(f1());
    remapper.process_pending();
    assert_eq!(probe.simulated().len(), 1);
}

#[test]
fn test_cancel_capture() {
    let (_temp_dir, mut remapper, probe, _events) = setup();

    remapper.begin_capture().unwrap();
    remapper.cancel_capture();

    assert!(!probe.is_capturing());
    assert!(!remapper.is_capturing());
}
