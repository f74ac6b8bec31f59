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

//! Warning banner component
//!
//! Displays a banner at the top of the window when some source key is
//! claimed by more than one mapping (only one of them can be enabled), or
//! when the display connection has been lost.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ ⚠️  F1 is used by 2 mappings; only one can be on    │
//! └─────────────────────────────────────────────────────┘
//! ```

use gtk4::prelude::*;
use gtk4::{Box as GtkBox, Label, Orientation, Revealer};
use std::rc::Rc;

use crate::ui::Controller;

/// Banner shown for shared source keys and connection loss
pub struct ConflictPanel {
    /// Root widget (Revealer for smooth show/hide animation)
    widget: Revealer,
    message_label: Label,
    warning_box: GtkBox,
    controller: Rc<Controller>,
}

impl ConflictPanel {
    /// Creates the panel, initially hidden. Call `refresh()` to update it.
    pub fn new(controller: Rc<Controller>) -> Self {
        let revealer = Revealer::builder()
            .transition_type(gtk4::RevealerTransitionType::SlideDown)
            .transition_duration(300)
            .reveal_child(false)
            .build();

        let warning_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(10)
            .margin_start(10)
            .margin_end(10)
            .margin_top(5)
            .margin_bottom(5)
            .hexpand(true)
            .build();
        warning_box.add_css_class("warning-banner");

        let message_label = Label::builder()
            .xalign(0.0)
            .wrap(true)
            .margin_start(10)
            .margin_end(10)
            .margin_top(5)
            .margin_bottom(5)
            .build();

        warning_box.append(&message_label);
        revealer.set_child(Some(&warning_box));

        Self {
            widget: revealer,
            message_label,
            warning_box,
            controller,
        }
    }

    /// Updates visibility and message from the current state
    pub fn refresh(&self) {
        if self.controller.is_degraded() {
            self.warning_box.add_css_class("error-banner");
            self.message_label.set_label(
                "⚠️  Lost the connection to the X server. Keys are no longer remapped; \
                 restart rekey to resume.",
            );
            self.widget.set_reveal_child(true);
            return;
        }
        self.warning_box.remove_css_class("error-banner");

        let conflicts = self.controller.get_conflicts();
        if conflicts.is_empty() {
            self.widget.set_reveal_child(false);
            return;
        }

        let message = match conflicts.as_slice() {
            [single] => format!(
                "⚠️  {} is used by {} mappings; only one of them can be enabled",
                single.source,
                single.mappings.len()
            ),
            many => {
                let sources: Vec<String> = many.iter().map(|c| c.source.to_string()).collect();
                format!(
                    "⚠️  {} source keys are shared by several mappings: {}",
                    many.len(),
                    sources.join(", ")
                )
            }
        };

        self.message_label.set_label(&message);
        self.widget.set_reveal_child(true);
    }

    /// Returns the root widget for adding to parent container
    pub fn widget(&self) -> &Revealer {
        &self.widget
    }
}
