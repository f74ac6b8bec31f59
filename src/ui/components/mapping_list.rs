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

//! Mapping list component
//!
//! Displays all mappings in a scrollable list view.
//! Each row shows an enable switch, the source combo, the target sequence
//! and the description.

use gtk4::{glib, prelude::*, Align, Box as GtkBox, Label, ListBox, Orientation, ScrolledWindow, Switch};
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, warn};

use crate::core::KeyMapping;
use crate::ui::Controller;

/// Called with a message when a row switch could not change a mapping
pub type ErrorSink = Rc<dyn Fn(String)>;

/// Displays a scrollable list of mappings
pub struct MappingList {
    /// Root widget (scrollable container)
    widget: ScrolledWindow,
    /// List box containing rows
    list_box: ListBox,
    /// Controller reference for toggling
    controller: Rc<Controller>,
    /// Cache of currently displayed mappings
    current_mappings: RefCell<Vec<KeyMapping>>,
    on_error: ErrorSink,
}

impl MappingList {
    /// Creates a new, empty mapping list
    pub fn new(controller: Rc<Controller>, on_error: ErrorSink) -> Self {
        let scrolled_window = ScrolledWindow::builder()
            .hexpand(true)
            .vexpand(true)
            .build();

        let list_box = ListBox::builder()
            .selection_mode(gtk4::SelectionMode::Single)
            .build();

        let placeholder = Label::builder()
            .label("No mappings yet. Use \"Add Mapping\" to create one.")
            .margin_top(20)
            .margin_bottom(20)
            .build();
        placeholder.add_css_class("dim-label");
        list_box.set_placeholder(Some(&placeholder));

        scrolled_window.set_child(Some(&list_box));

        Self {
            widget: scrolled_window,
            list_box,
            controller,
            current_mappings: RefCell::new(Vec::new()),
            on_error,
        }
    }

    /// Reloads the rows using the controller's current search query
    pub fn refresh(&self) {
        let mappings = self.controller.get_current_view();
        self.update_with_mappings(mappings);
    }

    /// Updates the list with specific mappings (used for filtering)
    ///
    /// The previously selected mapping stays selected if it is still shown.
    pub fn update_with_mappings(&self, mappings: Vec<KeyMapping>) {
        let selected_id = self.selected_mapping().map(|m| m.id);

        while let Some(child) = self.list_box.first_child() {
            self.list_box.remove(&child);
        }

        *self.current_mappings.borrow_mut() = mappings.clone();

        for (index, mapping) in mappings.iter().enumerate() {
            let row = self.create_row(mapping, index);
            self.list_box.append(&row);
        }

        let reselect = selected_id
            .and_then(|id| mappings.iter().position(|m| m.id == id))
            .and_then(|index| i32::try_from(index).ok())
            .and_then(|index| self.list_box.row_at_index(index));
        if let Some(row) = reselect {
            self.list_box.select_row(Some(&row));
        }
    }

    /// Create a single row widget for a mapping
    fn create_row(&self, mapping: &KeyMapping, index: usize) -> GtkBox {
        let row = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(20)
            .margin_start(10)
            .margin_end(10)
            .margin_top(5)
            .margin_bottom(5)
            .build();

        if index % 2 == 0 {
            row.add_css_class("even-row");
        } else {
            row.add_css_class("odd-row");
        }

        let live = self.controller.is_live(&mapping.id);
        if mapping.enabled && !live {
            row.add_css_class("not-live");
        }

        let switch = Switch::builder()
            .active(mapping.enabled)
            .valign(Align::Center)
            .tooltip_text("Enable or disable this mapping")
            .build();
        self.connect_toggle(&switch, mapping);

        let source_label = Label::builder()
            .label(mapping.source.to_string())
            .width_chars(18)
            .xalign(0.0)
            .build();
        source_label.add_css_class("combo-label");

        let arrow = Label::new(Some("→"));

        let target_text = mapping.target_label();
        let target_label = Label::builder()
            .label(&target_text)
            .width_chars(22)
            .max_width_chars(40)
            .ellipsize(gtk4::pango::EllipsizeMode::End)
            .xalign(0.0)
            .build();
        target_label.add_css_class("combo-label");
        if target_text.chars().count() > 40 {
            target_label.set_tooltip_text(Some(&target_text));
        }

        let description_label = Label::builder()
            .label(&mapping.description)
            .xalign(0.0)
            .hexpand(true)
            .ellipsize(gtk4::pango::EllipsizeMode::End)
            .build();
        description_label.add_css_class("dim-label");

        row.append(&switch);
        row.append(&source_label);
        row.append(&arrow);
        row.append(&target_label);
        row.append(&description_label);

        row
    }

    fn connect_toggle(&self, switch: &Switch, mapping: &KeyMapping) {
        let controller = self.controller.clone();
        let on_error = self.on_error.clone();
        let id = mapping.id.clone();

        switch.connect_state_set(move |switch, state| {
            debug!(id = %id, enabled = state, "Row switch toggled");

            match controller.set_enabled(&id, state) {
                Ok(()) => glib::Propagation::Proceed,
                Err(e) => {
                    warn!(id = %id, error = %e, "Toggle refused");
                    on_error(e.to_string());

                    // Put the knob back once this handler has returned
                    let switch = switch.clone();
                    glib::idle_add_local_once(move || switch.set_active(!state));
                    glib::Propagation::Stop
                }
            }
        });
    }

    /// Returns the root widget for adding to parent container
    pub fn widget(&self) -> &ScrolledWindow {
        &self.widget
    }

    /// Mapping at the given display index, accounting for the search filter
    pub fn get_mapping_at_index(&self, index: usize) -> Option<KeyMapping> {
        self.current_mappings.borrow().get(index).cloned()
    }

    /// Mapping on the selected row, if any
    pub fn selected_mapping(&self) -> Option<KeyMapping> {
        let index = usize::try_from(self.list_box.selected_row()?.index()).ok()?;
        self.get_mapping_at_index(index)
    }

    /// Get a reference to the internal ListBox widget (for signals)
    pub fn list_box(&self) -> &ListBox {
        &self.list_box
    }

    /// Returns count of currently displayed mappings
    pub fn count(&self) -> usize {
        self.current_mappings.borrow().len()
    }
}
