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

//! Layout builder
//!
//! Creates the main application layout structure.

use crate::ui::{
    components::{ConflictPanel, DetailsPanel, ErrorSink, MappingList, SearchBar},
    Controller,
};
use gtk4::{glib, prelude::*, Box as GtkBox, Button, Label, Orientation, Paned};
use std::rc::Rc;
use tracing::debug;

/// How long a transient message stays in the status bar
const MESSAGE_SECONDS: u32 = 8;

/// Widgets the handlers need after the layout is built
pub struct MainLayout {
    pub root: GtkBox,
    /// List on the left, details on the right
    pub paned: Paned,
    pub mapping_list: Rc<MappingList>,
    pub details_panel: Rc<DetailsPanel>,
    pub conflict_panel: Rc<ConflictPanel>,
    pub add_button: Button,
    /// Live/total counts
    status_label: Label,
    /// Last error or notice
    message_label: Label,
    controller: Rc<Controller>,
}

impl MainLayout {
    /// Rebuilds every view from the controller
    pub fn refresh(&self) {
        self.mapping_list.refresh();
        self.details_panel.refresh();
        self.conflict_panel.refresh();
        self.status_label.set_label(&self.controller.status_text());
    }

    /// Shows a message in the status bar for a few seconds
    pub fn report(&self, message: &str) {
        show_message(&self.message_label, message);
    }
}

fn show_message(label: &Label, message: &str) {
    label.set_label(message);
    label.set_visible(true);

    let label = label.clone();
    let shown = message.to_string();
    glib::timeout_add_seconds_local_once(MESSAGE_SECONDS, move || {
        // A newer message keeps its own timer
        if label.label() == shown {
            label.set_visible(false);
        }
    });
}

/// Builds the main application layout
///
/// Creates a vertical box containing:
/// - Warning banner at top
/// - Paned layout with:
///   - Left: Search bar, add button, mapping list
///   - Right: Details panel (fixed 280px width)
/// - Status bar at the bottom
pub fn build_main_layout(controller: Rc<Controller>) -> Rc<MainLayout> {
    let main_vbox = GtkBox::new(Orientation::Vertical, 0);

    let conflict_panel = Rc::new(ConflictPanel::new(controller.clone()));
    main_vbox.append(conflict_panel.widget());

    let paned = Paned::new(Orientation::Horizontal);
    paned.set_vexpand(true);

    // LEFT SIDE: Search + List (resizable)
    let left_vbox = GtkBox::new(Orientation::Vertical, 10);
    left_vbox.set_margin_start(10);
    left_vbox.set_margin_end(10);
    left_vbox.set_margin_bottom(10);

    let message_label = Label::builder()
        .xalign(0.0)
        .visible(false)
        .margin_start(10)
        .build();
    message_label.add_css_class("status-message");

    let on_error: ErrorSink = {
        let message_label = message_label.clone();
        Rc::new(move |message: String| show_message(&message_label, &message))
    };
    let mapping_list = Rc::new(MappingList::new(controller.clone(), on_error));

    let search_bar = SearchBar::new();
    left_vbox.append(search_bar.widget());

    let add_button = Button::builder().label("➕ Add Mapping").build();
    add_button.add_css_class("suggested-action");
    left_vbox.append(&add_button);

    left_vbox.append(mapping_list.widget());

    // Wire up search functionality
    let mapping_list_for_search = mapping_list.clone();
    let controller_for_search = controller.clone();

    search_bar.widget().connect_search_changed(move |entry| {
        let query = entry.text().to_string();
        debug!(query = %query, "Search");

        // Controller keeps the query so later refreshes stay filtered
        controller_for_search.set_search_query(query);
        mapping_list_for_search.refresh();
    });

    // RIGHT SIDE: Details Panel (FIXED 280px)
    let details_panel = Rc::new(DetailsPanel::new(controller.clone()));

    paned.set_start_child(Some(&left_vbox));
    paned.set_resize_start_child(true);
    paned.set_shrink_start_child(true);

    paned.set_end_child(Some(details_panel.widget()));
    paned.set_resize_end_child(false);
    paned.set_shrink_end_child(false);

    // 1000px default width - 280px panel
    paned.set_position(720);

    main_vbox.append(&paned);

    // BOTTOM: status bar
    let status_bar = GtkBox::new(Orientation::Horizontal, 10);
    status_bar.add_css_class("status-bar");
    let status_label = Label::builder().xalign(0.0).margin_start(10).build();
    status_bar.append(&status_label);
    status_bar.append(&message_label);
    main_vbox.append(&status_bar);

    Rc::new(MainLayout {
        root: main_vbox,
        paned,
        mapping_list,
        details_panel,
        conflict_panel,
        add_button,
        status_label,
        message_label,
        controller,
    })
}
