// Copyright 2025 bakri (tidynest@proton.me)
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

//! rekey
//!
//! A system-wide key remapper for X11 with a GTK4 manager window.
//! Pressing a source combo anywhere on the desktop types a target sequence
//! instead.
//!
//! # Features
//!
//! - **Passive grabs:** Each source combo is grabbed on the root window in
//!   all four Caps Lock / Num Lock variants, and released as a unit
//! - **Conflict-free:** No two enabled mappings share a source combo
//! - **Synthesis:** Target sequences are typed through XTEST, modifiers
//!   pressed in a fixed order and released in reverse
//! - **Recording:** The next physical combo can be captured from the window
//! - **Persistence:** Atomic JSON writes; a damaged file is set aside
//! - **Single thread:** The X connection is one more glib main-loop source
//!
//! # Architecture
//!
//! - **`core`:** Combos, mappings, key names, duplicate detection, validation
//! - **`config`:** The mapping file (load, atomic save, legacy upgrade)
//! - **`hook`:** The interception engine (`KeyHook`, X11 and offline)
//! - **`remapper`:** The orchestrator that keeps grabs, mappings and file in step
//! - **`runtime`:** Main-loop wiring (`Session`)
//! - **`ui`:** GTK4 GUI components (MVC pattern)
//!
//! # Examples
//!
//! ## Parsing combos
//!
//! ```
//! use rekey::core::KeyNames;
//!
//! let names = KeyNames::global();
//! let source = names.parse_combo("Ctrl+Alt+T")?;
//! let target = names.parse_sequence("Ctrl+C Ctrl+V")?;
//! assert_eq!(source.to_string(), "Ctrl+Alt+T");
//! assert_eq!(target.len(), 2);
//! # Ok::<(), rekey::core::ParseError>(())
//! ```
//!
//! ## Running headless
//!
//! ```no_run
//! use rekey::config::ConfigStore;
//! use rekey::runtime::Session;
//!
//! let store = ConfigStore::new(ConfigStore::default_path()?);
//! let (session, report) = Session::connect(store)?;
//! println!("{} of {} mappings live", report.live, report.loaded);
//! session.run_headless(); // Blocks until Ctrl+C
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod core;
pub mod hook;
pub mod remapper;
pub mod runtime;
pub mod ui;

// Re-export commonly used types for convenience
pub use core::{KeyCombo, KeyMapping, MappingId, Modifier, Modifiers, Settings};
pub use remapper::{RemapError, RemapEvent, Remapper};
