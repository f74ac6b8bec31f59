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

//! Interception engine: system-wide grabs and synthetic input.
//!
//! `KeyHook` is the only seam between the mapping logic and the display
//! server. `X11Hook` talks to a real server through x11rb; `OfflineHook`
//! keeps the same contract in memory for tests and for editing the mapping
//! file without a display.
//!
//! The engine is single-threaded. Readiness of `raw_fd()` is watched by
//! the main loop, which then calls `drain_events()`.

mod capture;
mod error;
pub mod grab;
mod keymap;
mod offline;
mod synth;
mod x11;

pub use capture::CaptureState;
pub use error::HookError;
pub use keymap::Keymap;
pub use offline::{OfflineHook, OfflineProbe, TypingStep};
pub use synth::{plan, KeyStroke};
pub use x11::X11Hook;

#[cfg(test)]
pub(crate) use keymap::fixtures;

use std::os::fd::RawFd;

use crate::core::{KeyCombo, MappingId};

/// Proof that a combo is live for a mapping.
///
/// Owned by the mapping logic and handed back to `ungrab`.
#[derive(Clone, Debug, PartialEq)]
pub struct GrabHandle {
    pub id: MappingId,
    pub combo: KeyCombo,
}

/// Something the engine observed
#[derive(Clone, Debug, PartialEq)]
pub enum HookEvent {
    /// A grabbed combo was pressed
    Pressed(KeyCombo),
    /// A grabbed combo was released
    Released(KeyCombo),
    /// Keyboard layout changed; live grabs may point at the wrong keys
    KeymapChanged,
    /// Capture mode recorded a combo and has ended
    Captured(KeyCombo),
    /// A grab released while typing could not be registered again
    GrabLost { id: MappingId, cause: HookError },
}

/// Contract every interception backend fulfils.
pub trait KeyHook {
    /// Short backend name for logs and the status line
    fn name(&self) -> &'static str;

    /// Registers `combo` system-wide on behalf of `id`, across all lock
    /// states. Either every variant is registered or none is.
    ///
    /// Grabbing an id that already holds a grab releases the old one first.
    fn grab(&mut self, id: &MappingId, combo: KeyCombo) -> Result<GrabHandle, HookError>;

    /// Releases a grab. Releasing twice is a no-op.
    fn ungrab(&mut self, handle: &GrabHandle);

    /// Collects everything pending without blocking.
    fn drain_events(&mut self) -> Result<Vec<HookEvent>, HookError>;

    /// Types the sequence in order. Nothing is typed if any keysym has no
    /// key on the current layout.
    ///
    /// The keyboard grab started by the triggering press is released first,
    /// so the keys reach the focused window. Grabs on keys the sequence
    /// types are suspended while typing, so a target never re-triggers a
    /// mapping (swaps and self-maps fire once). A grab that cannot be
    /// restored is reported as `GrabLost`.
    fn simulate(&mut self, sequence: &[KeyCombo]) -> Result<(), HookError>;

    /// Starts recording the next physical combo. Grabbed combos still
    /// report `Pressed` while capturing; callers ignore them.
    fn begin_capture(&mut self) -> Result<(), HookError>;

    /// Stops recording without a result. No-op when not capturing.
    fn end_capture(&mut self);

    /// Descriptor that becomes readable when events are pending.
    fn raw_fd(&self) -> Option<RawFd>;

    /// Releases every grab and closes the connection. Idempotent.
    fn shutdown(&mut self);
}
