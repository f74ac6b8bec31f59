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

//! Details panel component for displaying the selected mapping.
//!
//! Shows the source combo, the full target sequence, the description and
//! whether the mapping is actually intercepting keys right now.

use gtk4::{
    pango::WrapMode::WordChar, prelude::*, Align, Box as GtkBox, Button, Frame, Grid, Label,
    Orientation, Separator,
};
use std::{cell::RefCell, rc::Rc};

use crate::{core::KeyMapping, ui::Controller};

/// A panel that displays detailed information about the selected mapping.
///
/// The panel width is enforced by the parent Paned widget in layout.rs
pub struct DetailsPanel {
    /// Root widget (Frame)
    widget: Frame,
    source_label: Label,
    target_label: Label,
    description_label: Label,
    id_label: Label,
    status_label: Label,
    edit_button: Button,
    delete_button: Button,
    controller: Rc<Controller>,
    /// Currently displayed mapping (for edit and delete)
    current_mapping: Rc<RefCell<Option<KeyMapping>>>,
}

impl DetailsPanel {
    /// Helper to create a header/value label pair for the details grid
    fn create_label_row(header_text: &str, initial_value: &str) -> (Label, Label) {
        let header = Label::builder()
            .label(header_text)
            .halign(Align::End)
            .xalign(1.0)
            .build();
        header.add_css_class("field-header");

        let value = Label::builder()
            .label(initial_value)
            .halign(Align::Start)
            .xalign(0.0)
            .wrap(true)
            .wrap_mode(WordChar)
            .max_width_chars(20)
            .selectable(true)
            .build();

        (header, value)
    }

    /// Create a new details panel.
    pub fn new(controller: Rc<Controller>) -> Self {
        let frame = Frame::builder()
            .label("Selected Mapping")
            .margin_start(10)
            .margin_end(10)
            .margin_top(10)
            .margin_bottom(10)
            .width_request(280)
            .build();

        let vbox = GtkBox::new(Orientation::Vertical, 10);
        vbox.set_margin_start(15);
        vbox.set_margin_end(15);
        vbox.set_margin_top(15);
        vbox.set_margin_bottom(15);

        let grid = Grid::builder().row_spacing(10).column_spacing(15).build();

        let (source_header, source_label) =
            Self::create_label_row("🎹 Press:", "Select a mapping...");
        grid.attach(&source_header, 0, 0, 1, 1);
        grid.attach(&source_label, 1, 0, 1, 1);

        let (target_header, target_label) = Self::create_label_row("⌨️ Types:", "");
        grid.attach(&target_header, 0, 1, 1, 1);
        grid.attach(&target_label, 1, 1, 1, 1);

        let (description_header, description_label) = Self::create_label_row("📝 Note:", "");
        grid.attach(&description_header, 0, 2, 1, 1);
        grid.attach(&description_label, 1, 2, 1, 1);

        let (id_header, id_label) = Self::create_label_row("🔖 Id:", "");
        grid.attach(&id_header, 0, 3, 1, 1);
        grid.attach(&id_label, 1, 3, 1, 1);

        let (status_header, status_label) = Self::create_label_row("📊 Status:", "");
        grid.attach(&status_header, 0, 4, 1, 1);
        grid.attach(&status_label, 1, 4, 1, 1);

        vbox.append(&grid);

        let separator = Separator::new(Orientation::Horizontal);
        separator.set_margin_top(10);
        separator.set_margin_bottom(10);
        vbox.append(&separator);

        let edit_button = Button::builder()
            .label("✏️ Edit Mapping")
            .sensitive(false)
            .build();
        vbox.append(&edit_button);

        let delete_button = Button::builder()
            .label("🗑️  Delete Mapping")
            .sensitive(false)
            .build();
        delete_button.add_css_class("destructive-action");
        vbox.append(&delete_button);

        frame.set_child(Some(&vbox));

        Self {
            widget: frame,
            source_label,
            target_label,
            description_label,
            id_label,
            status_label,
            edit_button,
            delete_button,
            controller,
            current_mapping: Rc::new(RefCell::new(None)),
        }
    }

    /// Shows `mapping`, or the placeholder when `None`
    pub fn update_mapping(&self, mapping: Option<&KeyMapping>) {
        *self.current_mapping.borrow_mut() = mapping.cloned();

        self.edit_button.set_sensitive(mapping.is_some());
        self.delete_button.set_sensitive(mapping.is_some());

        let Some(m) = mapping else {
            self.source_label.set_label("👈 Select a mapping");
            self.target_label.set_label("");
            self.target_label.set_tooltip_text(None);
            self.description_label.set_label("");
            self.id_label.set_label("");
            self.status_label.set_label("");
            self.status_label.set_tooltip_text(None);
            return;
        };

        self.source_label.set_label(&m.source.to_string());

        let target = m.target_label();
        self.target_label.set_label(&target);
        self.target_label.set_tooltip_text(Some(&target));

        let description = if m.description.is_empty() {
            "(none)"
        } else {
            m.description.as_str()
        };
        self.description_label.set_label(description);
        self.id_label.set_label(m.id.as_str());

        let (status, tooltip) = self.status_for(m);
        self.status_label.set_label(&status);
        self.status_label.set_tooltip_text(tooltip.as_deref());
    }

    /// Re-reads the shown mapping from the controller (it may have changed
    /// or been removed)
    pub fn refresh(&self) {
        let id = self.current_mapping.borrow().as_ref().map(|m| m.id.clone());
        let fresh = id.and_then(|id| self.controller.get_mapping(&id));
        self.update_mapping(fresh.as_ref());
    }

    fn status_for(&self, mapping: &KeyMapping) -> (String, Option<String>) {
        let others: Vec<KeyMapping> = self
            .controller
            .get_conflicts()
            .into_iter()
            .filter(|c| c.source == mapping.source)
            .flat_map(|c| c.mappings)
            .filter(|other| other.id != mapping.id)
            .collect();

        let state = if self.controller.is_live(&mapping.id) {
            "✅ Active"
        } else if mapping.enabled {
            "⚠️ Enabled, not intercepting"
        } else {
            "⏸️ Disabled"
        };

        if others.is_empty() {
            return (state.to_string(), None);
        }

        let mut tooltip = String::from("Same source key as:\n");
        for other in &others {
            tooltip.push_str(&format!("• {}\n", other));
        }

        (
            format!("{}\nShares its key with {} other(s)", state, others.len()),
            Some(tooltip.trim_end().to_string()),
        )
    }

    /// Connects the delete button to a callback
    pub fn connect_delete<F>(&self, callback: F)
    where
        F: Fn(&KeyMapping) + 'static,
    {
        let current_mapping = self.current_mapping.clone();

        self.delete_button.connect_clicked(move |_button| {
            // Release the borrow before the callback refreshes the panel
            let mapping = current_mapping.borrow().clone();
            if let Some(mapping) = mapping {
                callback(&mapping);
            }
        });
    }

    /// Connects a callback to the edit button
    pub fn connect_edit<F>(&self, callback: F)
    where
        F: Fn(&KeyMapping) + 'static,
    {
        let current_mapping = self.current_mapping.clone();

        self.edit_button.connect_clicked(move |_button| {
            let mapping = current_mapping.borrow().clone();
            if let Some(mapping) = mapping {
                callback(&mapping);
            }
        });
    }

    /// Get the root widget for adding to a container.
    pub fn widget(&self) -> &Frame {
        &self.widget
    }
}
