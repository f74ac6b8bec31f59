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

//! MVC Controller - Mediates between the orchestrator and the GTK4 view
//!
//! # Responsibilities
//!
//! - Turn the text typed into the mapping form into combos
//! - Filter/search mappings
//! - Forward mutations to the `Remapper` through the shared `Session`
//! - Provide status figures (live count, shadowed sources) to the view
//!
//! # Architecture
//!
//! The Controller holds the `Session` but doesn't know about GTK4 widgets.
//! This keeps business logic separate from presentation, and lets the tests
//! below drive it with the offline engine.

use std::cell::RefCell;

use thiserror::Error;

use crate::core::{Conflict, KeyCombo, KeyMapping, KeyNames, MappingId, ParseError, Settings};
use crate::remapper::{MappingEdit, RemapError, RemapEvent, Setting};
use crate::runtime::Session;
use crate::ui::components::SearchQuery;

/// Contents of the add/edit form, as typed
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingForm {
    /// Combo such as `Ctrl+Alt+T`
    pub source: String,
    /// Sequence such as `Ctrl+C Ctrl+V`, or literal text in text mode
    pub target: String,
    /// Type `target` character by character
    pub text_mode: bool,
    pub description: String,
}

impl MappingForm {
    /// Pre-fills the form from an existing mapping
    pub fn from_mapping(mapping: &KeyMapping) -> Self {
        Self {
            source: mapping.source.to_string(),
            target: mapping.target_label(),
            text_mode: false,
            description: mapping.description.clone(),
        }
    }

    /// Parses both key fields.
    pub fn parse(&self) -> Result<(KeyCombo, Vec<KeyCombo>), FormError> {
        let names = KeyNames::global();

        let source = names
            .parse_combo(&self.source)
            .map_err(FormError::Source)?;

        let target = if self.text_mode {
            names.expand_text(&self.target)
        } else {
            names.parse_sequence(&self.target)
        }
        .map_err(FormError::Target)?;

        Ok((source, target))
    }
}

/// Why a form submission was refused
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Source key: {0}")]
    Source(ParseError),

    #[error("Target keys: {0}")]
    Target(ParseError),

    #[error(transparent)]
    Rejected(#[from] RemapError),
}

/// Receives the combo recorded by capture mode
type CaptureSink = Box<dyn FnOnce(KeyCombo)>;

/// MVC Controller coordinating the orchestrator and the view
pub struct Controller {
    session: Session,
    /// Current search text (single source of truth for the list filter)
    search_query: RefCell<String>,
    /// Waiting for the next `KeyCaptured`
    capture_sink: RefCell<Option<CaptureSink>>,
}

impl Controller {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            search_query: RefCell::new(String::new()),
            capture_sink: RefCell::new(None),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Registers a view observer
    pub fn subscribe(&self, subscriber: impl Fn(&RemapEvent) + 'static) {
        self.session.subscribe(subscriber);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns all mappings, in insertion order
    pub fn get_mappings(&self) -> Vec<KeyMapping> {
        self.session.read(|r| r.mappings().to_vec())
    }

    pub fn get_mapping(&self, id: &MappingId) -> Option<KeyMapping> {
        self.session.read(|r| r.mapping(id).cloned())
    }

    /// Filters mappings by search query
    ///
    /// Searches in:
    /// - Source combo (e.g., "Ctrl+Alt+T")
    /// - Target sequence
    /// - Description
    ///
    /// Search is case-insensitive. An empty query returns everything.
    pub fn filter_mappings(&self, query: &str) -> Vec<KeyMapping> {
        let mappings = self.get_mappings();
        let query = SearchQuery::parse(query);
        if query.is_empty() {
            return mappings;
        }

        mappings
            .into_iter()
            .filter(|mapping| query.matches(mapping))
            .collect()
    }

    pub fn set_search_query(&self, query: String) {
        *self.search_query.borrow_mut() = query;
    }

    /// Mappings matching the stored search query
    pub fn get_current_view(&self) -> Vec<KeyMapping> {
        let query = self.search_query.borrow().clone();
        self.filter_mappings(&query)
    }

    /// Sources claimed by more than one mapping
    pub fn get_conflicts(&self) -> Vec<Conflict> {
        self.session.read(|r| r.shadowed_sources())
    }

    pub fn mapping_count(&self) -> usize {
        self.session.read(|r| r.mappings().len())
    }

    /// Mappings currently intercepting keys
    pub fn active_count(&self) -> usize {
        self.session.read(|r| r.active_count())
    }

    pub fn is_live(&self, id: &MappingId) -> bool {
        self.session.read(|r| r.is_live(id))
    }

    pub fn is_degraded(&self) -> bool {
        self.session.read(|r| r.is_degraded())
    }

    pub fn settings(&self) -> Settings {
        self.session.read(|r| r.settings())
    }

    /// One-line summary for the status bar
    pub fn status_text(&self) -> String {
        let (total, active, degraded, backend) = self.session.read(|r| {
            (
                r.mappings().len(),
                r.active_count(),
                r.is_degraded(),
                r.backend_name(),
            )
        });

        if degraded {
            return format!("{} mappings, interception stopped (display connection lost)", total);
        }

        let shadowed = self.get_conflicts().len();
        let mut text = format!("{} of {} mappings active ({})", active, total, backend);
        if shadowed > 0 {
            text.push_str(&format!(", {} shared source keys", shadowed));
        }
        text
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Parses the form and adds a mapping.
    ///
    /// A mapping whose grab failed is still stored (disabled); the error is
    /// returned so the view can say why it is not live.
    pub fn add_mapping(&self, form: &MappingForm) -> Result<MappingId, FormError> {
        let (source, target) = form.parse()?;
        let description = form.description.trim().to_string();

        Ok(self
            .session
            .with(|r| r.add_mapping(source, target, description))?)
    }

    /// Parses the form and replaces source, target and description
    pub fn edit_mapping(&self, id: &MappingId, form: &MappingForm) -> Result<(), FormError> {
        let (source, target) = form.parse()?;
        let edit = MappingEdit {
            source: Some(source),
            target: Some(target),
            description: Some(form.description.trim().to_string()),
        };

        Ok(self.session.with(|r| r.edit_mapping(id, edit))?)
    }

    pub fn delete_mapping(&self, id: &MappingId) -> Result<(), RemapError> {
        self.session.with(|r| r.remove_mapping(id))
    }

    pub fn set_enabled(&self, id: &MappingId, enabled: bool) -> Result<(), RemapError> {
        self.session.with(|r| r.set_enabled(id, enabled))
    }

    /// Enables every mapping it can; returns one message per failure
    pub fn enable_all(&self) -> Vec<String> {
        self.session
            .with(|r| r.enable_all())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn disable_all(&self) -> Vec<String> {
        self.session
            .with(|r| r.disable_all())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn set_setting(&self, setting: Setting, value: bool) {
        self.session.with(|r| r.set_setting(setting, value));
    }

    /// Starts recording the next physical combo.
    ///
    /// The orchestrator reports it as `RemapEvent::KeyCaptured`; the view
    /// forwards that to `deliver_capture`, which hands it to `on_captured`.
    pub fn begin_capture(
        &self,
        on_captured: impl FnOnce(KeyCombo) + 'static,
    ) -> Result<(), RemapError> {
        self.session.with(|r| r.begin_capture())?;
        *self.capture_sink.borrow_mut() = Some(Box::new(on_captured));
        Ok(())
    }

    /// Passes a captured combo to whoever asked for it.
    ///
    /// Returns false when nobody was waiting.
    pub fn deliver_capture(&self, combo: KeyCombo) -> bool {
        let sink = self.capture_sink.borrow_mut().take();
        match sink {
            Some(sink) => {
                sink(combo);
                true
            }
            None => false,
        }
    }

    pub fn cancel_capture(&self) {
        self.capture_sink.borrow_mut().take();
        self.session.with(|r| r.cancel_capture());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_parses_sequence() {
        let form = MappingForm {
            source: "Ctrl+Alt+T".to_string(),
            target: "Ctrl+C Ctrl+V".to_string(),
            ..MappingForm::default()
        };

        let (source, target) = form.parse().unwrap();
        assert_eq!(source.to_string(), "Ctrl+Alt+T");
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_form_rejects_empty_source() {
        let form = MappingForm {
            target: "F2".to_string(),
            ..MappingForm::default()
        };

        assert!(matches!(form.parse(), Err(FormError::Source(_))));
    }

    #[test]
    fn test_form_text_mode_expands_characters() {
        let form = MappingForm {
            source: "F1".to_string(),
            target: "hi!".to_string(),
            text_mode: true,
            ..MappingForm::default()
        };

        let (_, target) = form.parse().unwrap();
        assert_eq!(target.len(), 3);
    }
}
