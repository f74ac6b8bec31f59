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

//! In-memory backend.
//!
//! Keeps the grab bookkeeping of a real server (lock variants included)
//! without a display. The command line uses it to edit the mapping file;
//! tests drive it through an `OfflineProbe`.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    os::fd::RawFd,
    rc::Rc,
};

use tracing::debug;

use super::{grab::register_variants, keymap::Keymap, GrabHandle, HookError, HookEvent, KeyHook};
use crate::core::{KeyCombo, MappingId, MOD_NUMLOCK};

/// What `simulate` did, in order
#[derive(Clone, Debug, PartialEq)]
pub enum TypingStep {
    /// Active keyboard grab from the triggering press dropped
    ReleaseKeyboard,
    Suspend(MappingId),
    Type(Vec<KeyCombo>),
    Resume(MappingId),
}

#[derive(Debug)]
struct OfflineGrab {
    combo: KeyCombo,
    /// Physical masks held, one per lock variant
    masks: Vec<u16>,
    /// Keycode and base mask, when a layout is known
    key: Option<(u8, u16)>,
}

impl OfflineGrab {
    /// Whether typing `combo` presses this grab's key
    fn is_typed_by(&self, combo: KeyCombo, keymap: Option<&Keymap>) -> bool {
        match (self.key, keymap.and_then(|k| k.keycode_for(combo.symbol()))) {
            (Some((keycode, _)), Some((typed, _))) => keycode == typed,
            _ => self.combo.symbol() == combo.symbol(),
        }
    }
}

#[derive(Debug, Default)]
struct OfflineState {
    grabs: HashMap<MappingId, OfflineGrab>,
    /// Layout for physical clashes; combos are compared as-is without one
    keymap: Option<Keymap>,
    simulated: Vec<Vec<KeyCombo>>,
    steps: Vec<TypingStep>,
    /// Typed keys come back as presses when they hit a live grab, the way
    /// a server treats XTEST input
    echo_typed: bool,
    queued: VecDeque<HookEvent>,
    /// Combos another client is pretending to own
    denied: HashSet<KeyCombo>,
    /// Keysyms missing from the pretend layout
    unmapped: HashSet<u32>,
    capturing: bool,
    disconnected: bool,
    shut_down: bool,
}

/// Display-free `KeyHook`
#[derive(Debug, Default)]
pub struct OfflineHook {
    state: Rc<RefCell<OfflineState>>,
}

/// Test-side view of an `OfflineHook`: inject input, inspect grabs
#[derive(Clone, Debug)]
pub struct OfflineProbe {
    state: Rc<RefCell<OfflineState>>,
}

impl OfflineHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook plus a probe sharing its state
    pub fn with_probe() -> (Self, OfflineProbe) {
        let hook = Self::new();
        let probe = OfflineProbe {
            state: Rc::clone(&hook.state),
        };
        (hook, probe)
    }

    /// Resolves combos through `keymap`, so `A` and `Shift+a` are the
    /// same key press
    pub fn with_keymap(self, keymap: Keymap) -> Self {
        self.state.borrow_mut().keymap = Some(keymap);
        self
    }
}

impl KeyHook for OfflineHook {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn grab(&mut self, id: &MappingId, combo: KeyCombo) -> Result<GrabHandle, HookError> {
        let mut state = self.state.borrow_mut();

        if state.shut_down || state.disconnected {
            return Err(HookError::Connection("display connection closed".to_string()));
        }

        state.grabs.remove(id);

        if state.denied.contains(&combo) {
            return Err(HookError::GrabConflict { combo });
        }
        if state.unmapped.contains(&combo.symbol()) {
            return Err(HookError::InvalidCombo(combo));
        }

        let key = match &state.keymap {
            Some(keymap) => Some(keymap.physical(combo).ok_or(HookError::InvalidCombo(combo))?),
            None => None,
        };

        let holder = state
            .grabs
            .iter()
            .find(|(_, grab)| grab.combo == combo || (key.is_some() && grab.key == key))
            .map(|(holder, _)| holder.clone());
        if let Some(holder) = holder {
            return Err(HookError::SharedKey { combo, holder });
        }

        let masks = register_variants(
            key.map_or(combo.modifiers().bits(), |(_, mask)| mask),
            MOD_NUMLOCK,
            |_| Ok::<(), HookError>(()),
            |_| {},
        )?;
        state.grabs.insert(id.clone(), OfflineGrab { combo, masks, key });

        debug!(id = %id, combo = %combo, "Grabbed (offline)");
        Ok(GrabHandle { id: id.clone(), combo })
    }

    fn ungrab(&mut self, handle: &GrabHandle) {
        let mut state = self.state.borrow_mut();
        let matches = state
            .grabs
            .get(&handle.id)
            .is_some_and(|grab| grab.combo == handle.combo);

        if matches {
            state.grabs.remove(&handle.id);
            debug!(id = %handle.id, "Released (offline)");
        }
    }

    fn drain_events(&mut self) -> Result<Vec<HookEvent>, HookError> {
        let mut state = self.state.borrow_mut();

        if state.disconnected {
            return Err(HookError::Connection("display connection closed".to_string()));
        }

        let events: Vec<HookEvent> = state.queued.drain(..).collect();
        if events.iter().any(|e| matches!(e, HookEvent::Captured(_))) {
            state.capturing = false;
        }
        Ok(events)
    }

    fn simulate(&mut self, sequence: &[KeyCombo]) -> Result<(), HookError> {
        let mut state = self.state.borrow_mut();

        if state.shut_down || state.disconnected {
            return Err(HookError::Connection("display connection closed".to_string()));
        }
        if let Some(missing) = sequence.iter().find(|c| state.unmapped.contains(&c.symbol())) {
            return Err(HookError::UnmappedKeysym(missing.symbol()));
        }

        let state = &mut *state;
        state.steps.push(TypingStep::ReleaseKeyboard);

        let mut suspended: Vec<(MappingId, OfflineGrab)> = Vec::new();
        let typed_ids: Vec<MappingId> = state
            .grabs
            .iter()
            .filter(|(_, grab)| {
                sequence
                    .iter()
                    .any(|&combo| grab.is_typed_by(combo, state.keymap.as_ref()))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in typed_ids {
            if let Some(grab) = state.grabs.remove(&id) {
                state.steps.push(TypingStep::Suspend(id.clone()));
                suspended.push((id, grab));
            }
        }

        state.steps.push(TypingStep::Type(sequence.to_vec()));
        state.simulated.push(sequence.to_vec());

        if state.echo_typed {
            for &combo in sequence {
                if state.grabs.values().any(|grab| grab.combo == combo) {
                    state.queued.push_back(HookEvent::Pressed(combo));
                }
            }
        }

        for (id, grab) in suspended {
            if state.denied.contains(&grab.combo) {
                let cause = HookError::GrabConflict { combo: grab.combo };
                state.queued.push_back(HookEvent::GrabLost { id, cause });
                continue;
            }
            state.steps.push(TypingStep::Resume(id.clone()));
            state.grabs.insert(id, grab);
        }

        Ok(())
    }

    fn begin_capture(&mut self) -> Result<(), HookError> {
        self.state.borrow_mut().capturing = true;
        Ok(())
    }

    fn end_capture(&mut self) {
        self.state.borrow_mut().capturing = false;
    }

    fn raw_fd(&self) -> Option<RawFd> {
        None
    }

    fn shutdown(&mut self) {
        let mut state = self.state.borrow_mut();
        state.grabs.clear();
        state.capturing = false;
        state.shut_down = true;
    }
}

impl OfflineProbe {
    /// Physical press of `combo`. Only delivered when something grabs it.
    pub fn press(&self, combo: KeyCombo) {
        let mut state = self.state.borrow_mut();
        if state.grabs.values().any(|grab| grab.combo == combo) {
            state.queued.push_back(HookEvent::Pressed(combo));
        }
    }

    pub fn release(&self, combo: KeyCombo) {
        let mut state = self.state.borrow_mut();
        if state.grabs.values().any(|grab| grab.combo == combo) {
            state.queued.push_back(HookEvent::Released(combo));
        }
    }

    /// Physical combo typed while capture mode is on
    pub fn capture(&self, combo: KeyCombo) {
        let mut state = self.state.borrow_mut();
        if state.capturing {
            state.queued.push_back(HookEvent::Captured(combo));
        }
    }

    pub fn change_keymap(&self) {
        self.state.borrow_mut().queued.push_back(HookEvent::KeymapChanged);
    }

    /// Makes later grabs of `combo` fail as if another client owned it
    pub fn deny(&self, combo: KeyCombo) {
        self.state.borrow_mut().denied.insert(combo);
    }

    pub fn allow(&self, combo: KeyCombo) {
        self.state.borrow_mut().denied.remove(&combo);
    }

    /// Removes a keysym from the pretend layout
    pub fn unmap(&self, symbol: u32) {
        self.state.borrow_mut().unmapped.insert(symbol);
    }

    pub fn disconnect(&self) {
        self.state.borrow_mut().disconnected = true;
    }

    pub fn is_grabbed(&self, combo: KeyCombo) -> bool {
        self.state.borrow().grabs.values().any(|grab| grab.combo == combo)
    }

    /// Physical masks held for a mapping
    pub fn grabbed_masks(&self, id: &MappingId) -> Option<Vec<u16>> {
        self.state.borrow().grabs.get(id).map(|grab| grab.masks.clone())
    }

    /// Sends typed keys back as presses wherever they hit a live grab
    pub fn echo_typed_keys(&self) {
        self.state.borrow_mut().echo_typed = true;
    }

    /// Everything `simulate` did so far, oldest first
    pub fn typing_steps(&self) -> Vec<TypingStep> {
        self.state.borrow().steps.clone()
    }

    pub fn grab_count(&self) -> usize {
        self.state.borrow().grabs.len()
    }

    /// Every sequence typed so far, oldest first
    pub fn simulated(&self) -> Vec<Vec<KeyCombo>> {
        self.state.borrow().simulated.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.state.borrow().capturing
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }
}
