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

//! Main-loop wiring
//!
//! A `Session` shares one `Remapper` between the GTK widgets, the X
//! connection watch and the mapping-file watch. Everything runs on the
//! glib default main context; nothing holds a borrow across an iteration.

mod watcher;

pub use watcher::ConfigWatcher;

use glib::{ControlFlow, IOCondition, SourceId};
use std::{cell::RefCell, rc::Rc, time::Duration};
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::hook::{KeyHook, X11Hook};
use crate::remapper::{LoadReport, RemapError, RemapEvent, Remapper};

const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

/// How often the mapping-file watcher is polled
const FILE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared handle to the running orchestrator and its main-loop sources
#[derive(Clone)]
pub struct Session {
    remapper: Rc<RefCell<Remapper>>,
    fd_watch: Rc<RefCell<Option<SourceId>>>,
    file_watch: Rc<RefCell<Option<SourceId>>>,
}

impl Session {
    /// Wraps an orchestrator. No main-loop sources are attached yet.
    pub fn new(remapper: Remapper) -> Self {
        Self {
            remapper: Rc::new(RefCell::new(remapper)),
            fd_watch: Rc::new(RefCell::new(None)),
            file_watch: Rc::new(RefCell::new(None)),
        }
    }

    /// Connects to the X server and loads the mapping file.
    pub fn connect(store: ConfigStore) -> Result<(Self, LoadReport), RemapError> {
        let hook: Box<dyn KeyHook> = Box::new(X11Hook::connect().map_err(RemapError::Connection)?);
        let mut remapper = Remapper::new(hook, store);
        let report = remapper.load();
        Ok((Self::new(remapper), report))
    }

    /// Runs `f` against the orchestrator, then drains the engine.
    ///
    /// Replies awaited during a mutation can leave events buffered inside
    /// the client where the fd watch cannot see them.
    pub fn with<R>(&self, f: impl FnOnce(&mut Remapper) -> R) -> R {
        let result = f(&mut self.remapper.borrow_mut());
        self.remapper.borrow_mut().process_pending();
        result
    }

    /// Read-only access
    pub fn read<R>(&self, f: impl FnOnce(&Remapper) -> R) -> R {
        f(&self.remapper.borrow())
    }

    /// Registers an observer. See `Remapper::subscribe` for the rules.
    pub fn subscribe(&self, subscriber: impl Fn(&RemapEvent) + 'static) {
        self.remapper.borrow_mut().subscribe(subscriber);
    }

    /// Adds the X connection watch and the mapping-file watch to the
    /// default main context. Must be called on the thread that runs it.
    pub fn attach(&self) {
        self.attach_engine();
        self.watch_mapping_file();
    }

    /// Adds only the X connection watch. For short-lived sessions that
    /// must not pick up edits to the mapping file.
    pub fn attach_engine(&self) {
        let Some(fd) = self.remapper.borrow().raw_fd() else {
            debug!("Engine has no descriptor to watch");
            return;
        };

        let remapper = Rc::clone(&self.remapper);
        let slot = Rc::clone(&self.fd_watch);

        let id = glib::unix_fd_add_local(
            fd,
            IOCondition::IN | IOCondition::HUP | IOCondition::ERR,
            move |_, _| {
                let Ok(mut remapper) = remapper.try_borrow_mut() else {
                    debug!("Orchestrator busy, events stay buffered");
                    return ControlFlow::Continue;
                };

                remapper.process_pending();

                if remapper.is_degraded() {
                    // Removed by returning Break; forget the id
                    slot.borrow_mut().take();
                    return ControlFlow::Break;
                }
                ControlFlow::Continue
            },
        );

        *self.fd_watch.borrow_mut() = Some(id);
    }

    fn watch_mapping_file(&self) {
        let path = self.remapper.borrow().store().path().to_path_buf();

        let watcher = match ConfigWatcher::new(&path) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Mapping file will not be watched");
                return;
            }
        };

        let remapper = Rc::clone(&self.remapper);
        let mut pending = false;

        let id = glib::timeout_add_local(FILE_POLL_INTERVAL, move || {
            pending |= watcher.check_for_changes();
            if !pending {
                return ControlFlow::Continue;
            }

            if let Ok(mut remapper) = remapper.try_borrow_mut() {
                pending = false;
                remapper.reload_from_store();
                remapper.process_pending();
            }
            ControlFlow::Continue
        });

        *self.file_watch.borrow_mut() = Some(id);
    }

    /// Blocks in a glib main loop until SIGINT or SIGTERM.
    pub fn run_headless(&self) {
        self.attach();

        let main_loop = glib::MainLoop::new(None, false);
        for signal in [SIGINT, SIGTERM] {
            let main_loop = main_loop.clone();
            glib::unix_signal_add_local_once(signal, move || {
                info!(signal, "Stopping");
                main_loop.quit();
            });
        }

        let active = self.read(|r| r.active_count());
        info!(active, "Running without a window, Ctrl+C to stop");
        main_loop.run();

        self.shutdown();
    }

    /// Removes the main-loop sources, then releases every grab.
    pub fn shutdown(&self) {
        if let Some(id) = self.fd_watch.borrow_mut().take() {
            id.remove();
        }
        if let Some(id) = self.file_watch.borrow_mut().take() {
            id.remove();
        }
        self.remapper.borrow_mut().shutdown();
    }
}
