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

//! X11 backend.
//!
//! - Passive grabs on the root window (`GrabKey`), four per combo
//! - Synthetic input through the XTEST extension
//! - Capture through XInput 2 raw key events, which arrive even for keys
//!   other clients have grabbed
//!
//! Requests go out on a single `RustConnection`. Nothing here blocks except
//! the round trips needed to detect grab conflicts.

use std::os::fd::{AsRawFd, RawFd};

use tracing::{debug, error, info, trace, warn};
use x11rb::{
    connection::{Connection, RequestConnection},
    errors::ReplyError,
    protocol::{
        xinput::{self, ConnectionExt as _},
        xproto::{self, ConnectionExt as _, GrabMode, ModMask, Window},
        xtest::{self, ConnectionExt as _},
        ErrorKind, Event,
    },
    rust_connection::RustConnection,
    CURRENT_TIME,
};

use super::{
    capture::CaptureState,
    grab::{register_variants, GrabRecord, GrabTable},
    keymap::Keymap,
    synth, GrabHandle, HookError, HookEvent, KeyHook,
};
use crate::core::{KeyCombo, MappingId};

/// Live connection to an X server
pub struct X11Hook {
    /// `None` once shut down
    conn: Option<RustConnection>,
    root: Window,
    keymap: Keymap,
    grabs: GrabTable,
    capture: Option<CaptureState>,
    /// XInput 2.2 is present, so capture is possible
    raw_events: bool,
    /// Grabs that could not be restored after typing, reported on next drain
    lost: Vec<(MappingId, HookError)>,
}

impl X11Hook {
    /// Connects to `$DISPLAY` and reads the keyboard layout.
    ///
    /// # Errors
    ///
    /// `Connection` when the server is unreachable, `MissingExtension` when
    /// XTEST is absent (nothing could be typed).
    pub fn connect() -> Result<Self, HookError> {
        let (conn, screen_num) = x11rb::connect(None)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| HookError::Connection(format!("screen {} does not exist", screen_num)))?;

        if conn.extension_information(xtest::X11_EXTENSION_NAME)?.is_none() {
            return Err(HookError::MissingExtension("XTEST"));
        }

        let raw_events = Self::query_xinput(&conn);
        if !raw_events {
            warn!("XInput 2.2 not available, key capture disabled");
        }

        let keymap = load_keymap(&conn)?;

        info!(screen = screen_num, numlock_mask = keymap.numlock_mask(), "Connected to X server");

        Ok(Self {
            conn: Some(conn),
            root,
            keymap,
            grabs: GrabTable::new(),
            capture: None,
            raw_events,
            lost: Vec::new(),
        })
    }

    fn query_xinput(conn: &RustConnection) -> bool {
        match conn.extension_information(xinput::X11_EXTENSION_NAME) {
            Ok(Some(_)) => {}
            _ => return false,
        }

        conn.xinput_xi_query_version(2, 2)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some_and(|reply| (reply.major_version, reply.minor_version) >= (2, 2))
    }

    fn connection(&self) -> Result<&RustConnection, HookError> {
        self.conn
            .as_ref()
            .ok_or_else(|| HookError::Connection("engine has been shut down".to_string()))
    }

    /// Selects or clears raw key events on the root window
    fn select_raw_keys(&self, enabled: bool) -> Result<(), HookError> {
        let conn = self.connection()?;
        let mask = if enabled {
            vec![(xinput::XIEventMask::RAW_KEY_PRESS | xinput::XIEventMask::RAW_KEY_RELEASE).into()]
        } else {
            Vec::new()
        };

        conn.xinput_xi_select_events(
            self.root,
            &[xinput::EventMask {
                deviceid: xinput::Device::ALL_MASTER.into(),
                mask,
            }],
        )?
        .check()?;

        Ok(())
    }
}

impl KeyHook for X11Hook {
    fn name(&self) -> &'static str {
        "X11"
    }

    fn grab(&mut self, id: &MappingId, combo: KeyCombo) -> Result<GrabHandle, HookError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| HookError::Connection("engine has been shut down".to_string()))?;
        let root = self.root;

        if let Some(previous) = self.grabs.remove(id) {
            release_record(conn, root, &previous);
        }

        let (keycode, base_mask) = self
            .keymap
            .physical(combo)
            .ok_or(HookError::InvalidCombo(combo))?;

        // A second GrabKey on the same key and mask would silently replace ours
        if let Some(holder) = self.grabs.holder(keycode, base_mask, id) {
            return Err(HookError::SharedKey {
                combo,
                holder: holder.clone(),
            });
        }

        let masks = register_variants(
            base_mask,
            self.keymap.numlock_mask(),
            |mask| grab_variant(conn, root, keycode, mask, combo),
            |mask| release_variant(conn, root, keycode, mask),
        )
        .inspect_err(|e| warn!(id = %id, combo = %combo, error = %e, "Grab failed"))?;

        debug!(id = %id, combo = %combo, keycode, masks = ?masks, "Grabbed");

        self.grabs.insert(
            id.clone(),
            GrabRecord {
                combo,
                keycode,
                base_mask,
                masks,
            },
        );

        Ok(GrabHandle { id: id.clone(), combo })
    }

    fn ungrab(&mut self, handle: &GrabHandle) {
        let Some(conn) = self.conn.as_ref() else {
            return;
        };

        let matches = self
            .grabs
            .get(&handle.id)
            .is_some_and(|record| record.combo == handle.combo);
        if !matches {
            return;
        }

        if let Some(record) = self.grabs.remove(&handle.id) {
            release_record(conn, self.root, &record);
            if let Err(e) = conn.flush() {
                warn!(error = %e, "Flush after ungrab failed");
            }
            debug!(id = %handle.id, combo = %handle.combo, "Released");
        }
    }

    fn drain_events(&mut self) -> Result<Vec<HookEvent>, HookError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(Vec::new());
        };

        let mut events: Vec<HookEvent> = self
            .lost
            .drain(..)
            .map(|(id, cause)| HookEvent::GrabLost { id, cause })
            .collect();
        let mut keymap_changed = false;

        loop {
            let event = match conn.poll_for_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Lost X connection");
                    return Err(e.into());
                }
            };

            match event {
                Event::KeyPress(ev) => match self.grabs.find(ev.detail, u16::from(ev.state)) {
                    Some(record) => events.push(HookEvent::Pressed(record.combo)),
                    None => trace!(keycode = ev.detail, "Press without matching grab"),
                },
                Event::KeyRelease(ev) => {
                    if let Some(record) = self.grabs.find(ev.detail, u16::from(ev.state)) {
                        events.push(HookEvent::Released(record.combo));
                    }
                }
                Event::MappingNotify(_) => keymap_changed = true,
                Event::XinputRawKeyPress(ev) => {
                    let symbol = u8::try_from(ev.detail)
                        .ok()
                        .and_then(|code| self.keymap.keysym_at(code, 0));
                    if let (Some(capture), Some(symbol)) = (self.capture.as_mut(), symbol) {
                        if let Some(combo) = capture.press(symbol) {
                            events.push(HookEvent::Captured(combo));
                        }
                    }
                }
                Event::XinputRawKeyRelease(ev) => {
                    let symbol = u8::try_from(ev.detail)
                        .ok()
                        .and_then(|code| self.keymap.keysym_at(code, 0));
                    if let (Some(capture), Some(symbol)) = (self.capture.as_mut(), symbol) {
                        if let Some(combo) = capture.release(symbol) {
                            events.push(HookEvent::Captured(combo));
                        }
                    }
                }
                Event::Error(e) => warn!(error = ?e, "X protocol error"),
                _ => {}
            }
        }

        if keymap_changed {
            self.keymap = load_keymap(conn)?;
            info!("Keyboard layout changed");
            events.push(HookEvent::KeymapChanged);
        }

        if events.iter().any(|e| matches!(e, HookEvent::Captured(_))) {
            self.end_capture();
        }

        Ok(events)
    }

    fn simulate(&mut self, sequence: &[KeyCombo]) -> Result<(), HookError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| HookError::Connection("engine has been shut down".to_string()))?;
        let root = self.root;
        let strokes = synth::plan(sequence, &self.keymap)?;

        // The triggering press activated our passive grab; while it is held
        // the server would hand XTEST input straight back to us
        conn.ungrab_keyboard(CURRENT_TIME)?;

        // Typed keys must not hit our own grabs (swaps, self-maps)
        let keycodes: Vec<u8> = strokes.iter().map(|stroke| stroke.keycode).collect();
        let suspended = self.grabs.take_on_keys(&keycodes);
        for (_, record) in &suspended {
            release_record(conn, root, record);
        }

        for stroke in &strokes {
            let kind = if stroke.pressed {
                xproto::KEY_PRESS_EVENT
            } else {
                xproto::KEY_RELEASE_EVENT
            };
            conn.xtest_fake_input(kind, stroke.keycode, CURRENT_TIME, root, 0, 0, 0)?;
        }

        // Round trip so the strokes are processed before grabs come back
        conn.get_input_focus()?.reply()?;

        let numlock_mask = self.keymap.numlock_mask();
        for (id, mut record) in suspended {
            let restored = register_variants(
                record.base_mask,
                numlock_mask,
                |mask| grab_variant(conn, root, record.keycode, mask, record.combo),
                |mask| release_variant(conn, root, record.keycode, mask),
            );

            match restored {
                Ok(masks) => {
                    record.masks = masks;
                    self.grabs.insert(id, record);
                }
                Err(e) => {
                    warn!(id = %id, combo = %record.combo, error = %e, "Grab not restored after typing");
                    self.lost.push((id, e));
                }
            }
        }

        debug!(combos = sequence.len(), strokes = strokes.len(), "Simulated");
        Ok(())
    }

    fn begin_capture(&mut self) -> Result<(), HookError> {
        if !self.raw_events {
            return Err(HookError::MissingExtension("XInputExtension 2.2"));
        }
        if self.capture.is_none() {
            self.select_raw_keys(true)?;
            self.capture = Some(CaptureState::new());
            debug!("Capture started");
        }
        Ok(())
    }

    fn end_capture(&mut self) {
        if self.capture.take().is_some() {
            if let Err(e) = self.select_raw_keys(false) {
                warn!(error = %e, "Could not deselect raw key events");
            }
            debug!("Capture ended");
        }
    }

    fn raw_fd(&self) -> Option<RawFd> {
        self.conn.as_ref().map(|conn| conn.stream().as_raw_fd())
    }

    fn shutdown(&mut self) {
        if self.conn.is_none() {
            return;
        }

        self.end_capture();

        if let Some(conn) = self.conn.take() {
            let released = self.grabs.len();
            for (_, record) in self.grabs.drain() {
                release_record(&conn, self.root, &record);
            }
            if let Err(e) = conn.flush() {
                warn!(error = %e, "Flush during shutdown failed");
            }
            info!(released, "X connection closed");
        }
    }
}

impl Drop for X11Hook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn load_keymap(conn: &RustConnection) -> Result<Keymap, HookError> {
    let setup = conn.setup();
    let min = setup.min_keycode;
    let count = setup.max_keycode.saturating_sub(min).saturating_add(1);

    let mapping = conn.get_keyboard_mapping(min, count)?.reply()?;
    let modifiers = conn.get_modifier_mapping()?.reply()?;

    Ok(Keymap::new(min, mapping.keysyms_per_keycode, mapping.keysyms)
        .with_modifier_map(&modifiers.keycodes))
}

fn grab_variant(
    conn: &RustConnection,
    root: Window,
    keycode: u8,
    mask: u16,
    combo: KeyCombo,
) -> Result<(), HookError> {
    let cookie = conn.grab_key(
        false,
        root,
        ModMask::from(mask),
        keycode,
        GrabMode::ASYNC,
        GrabMode::ASYNC,
    )?;

    match cookie.check() {
        Ok(()) => Ok(()),
        Err(ReplyError::X11Error(e)) if e.error_kind == ErrorKind::Access => {
            Err(HookError::GrabConflict { combo })
        }
        Err(ReplyError::X11Error(e)) => {
            debug!(error = ?e.error_kind, "Server rejected grab");
            Err(HookError::InvalidCombo(combo))
        }
        Err(e) => Err(e.into()),
    }
}

fn release_variant(conn: &RustConnection, root: Window, keycode: u8, mask: u16) {
    if let Ok(cookie) = conn.ungrab_key(keycode, root, ModMask::from(mask)) {
        cookie.ignore_error();
    }
}

fn release_record(conn: &RustConnection, root: Window, record: &GrabRecord) {
    for &mask in &record.masks {
        release_variant(conn, root, record.keycode, mask);
    }
}
