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

//! Add/edit mapping dialog
//!
//! A modal form with the source combo, the target sequence (or literal
//! text) and a description. The source can be typed or recorded with
//! "Record", which captures the next combo pressed anywhere on the desktop.

use gtk4::prelude::*;
use gtk4::{
    glib, Align, ApplicationWindow, Box as GtkBox, Button, CheckButton, Entry, Grid, Label,
    Orientation, Window,
};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::ui::controller::{FormError, MappingForm};
use crate::ui::Controller;

pub struct EditDialog {
    dialog_window: Window,
    source_entry: Entry,
    target_entry: Entry,
    text_mode_check: CheckButton,
    description_entry: Entry,
    controller: Rc<Controller>,
    response: Rc<Cell<Option<DialogResponse>>>,
}

#[derive(Clone, Debug, Copy, PartialEq)]
enum DialogResponse {
    Save,
    Cancel,
}

impl EditDialog {
    /// Creates a dialog pre-filled with `initial`
    pub fn new(
        parent: &ApplicationWindow,
        controller: Rc<Controller>,
        title: &str,
        initial: &MappingForm,
    ) -> Self {
        let dialog_window = Window::builder()
            .title(title)
            .modal(true)
            .transient_for(parent)
            .default_width(480)
            .default_height(300)
            .resizable(false)
            .build();

        let grid = Grid::builder()
            .row_spacing(12)
            .column_spacing(12)
            .margin_start(20)
            .margin_end(20)
            .margin_top(20)
            .margin_bottom(20)
            .build();

        // Row 0: Source combo + record button
        let source_label = Label::builder()
            .label("🎹 When I press:")
            .halign(Align::End)
            .build();
        let source_entry = Entry::builder()
            .text(&initial.source)
            .placeholder_text("e.g., Ctrl+Alt+T")
            .hexpand(true)
            .build();
        let record_button = Button::builder()
            .label("⏺ Record")
            .tooltip_text("Press the combo you want to intercept")
            .build();
        grid.attach(&source_label, 0, 0, 1, 1);
        grid.attach(&source_entry, 1, 0, 1, 1);
        grid.attach(&record_button, 2, 0, 1, 1);

        // Row 1: Target
        let target_label = Label::builder()
            .label("⌨️ Type instead:")
            .halign(Align::End)
            .build();
        let target_entry = Entry::builder()
            .text(&initial.target)
            .placeholder_text("e.g., Ctrl+C Ctrl+V")
            .hexpand(true)
            .build();
        grid.attach(&target_label, 0, 1, 1, 1);
        grid.attach(&target_entry, 1, 1, 2, 1);

        // Row 2: Text mode
        let text_mode_check = CheckButton::builder()
            .label("Type the target as literal text")
            .active(initial.text_mode)
            .build();
        grid.attach(&text_mode_check, 1, 2, 2, 1);

        // Row 3: Description
        let description_label = Label::builder()
            .label("📝 Description:")
            .halign(Align::End)
            .build();
        let description_entry = Entry::builder()
            .text(&initial.description)
            .placeholder_text("Optional")
            .hexpand(true)
            .build();
        grid.attach(&description_label, 0, 3, 1, 1);
        grid.attach(&description_entry, 1, 3, 2, 1);

        let button_box = GtkBox::builder()
            .orientation(Orientation::Horizontal)
            .spacing(12)
            .halign(Align::End)
            .margin_start(20)
            .margin_end(20)
            .margin_bottom(20)
            .build();

        let cancel_button = Button::builder().label("Cancel").build();
        let save_button = Button::builder().label("💾 Save").build();
        save_button.add_css_class("suggested-action");

        button_box.append(&cancel_button);
        button_box.append(&save_button);

        let main_box = GtkBox::builder()
            .orientation(Orientation::Vertical)
            .spacing(0)
            .build();
        main_box.append(&grid);
        main_box.append(&button_box);

        dialog_window.set_child(Some(&main_box));

        let response: Rc<Cell<Option<DialogResponse>>> = Rc::new(Cell::new(None));

        // Text mode swaps the hint
        {
            let target_entry = target_entry.clone();
            text_mode_check.connect_toggled(move |check| {
                let hint = if check.is_active() {
                    "e.g., kind regards"
                } else {
                    "e.g., Ctrl+C Ctrl+V"
                };
                target_entry.set_placeholder_text(Some(hint));
            });
        }

        // ====================================================================
        // Record button
        // ====================================================================
        {
            let controller = controller.clone();
            let source_entry = source_entry.clone();
            let window = dialog_window.clone();

            record_button.connect_clicked(move |button| {
                let entry = source_entry.clone();
                let button_for_result = button.clone();

                let started = controller.begin_capture(move |combo| {
                    debug!(combo = %combo, "Recorded source");
                    entry.set_text(&combo.to_string());
                    button_for_result.set_label("⏺ Record");
                    button_for_result.set_sensitive(true);
                });

                match started {
                    Ok(()) => {
                        button.set_label("Press a combo…");
                        button.set_sensitive(false);
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not start recording");
                        show_error(&window, &format!("Recording is unavailable:\n{}", e));
                    }
                }
            });
        }

        // ====================================================================
        // Save / Cancel / close
        // ====================================================================
        {
            let response = response.clone();
            cancel_button.connect_clicked(move |_| response.set(Some(DialogResponse::Cancel)));
        }
        {
            let response = response.clone();
            save_button.connect_clicked(move |_| response.set(Some(DialogResponse::Save)));
        }
        {
            let response = response.clone();
            let controller = controller.clone();
            dialog_window.connect_close_request(move |_| {
                controller.cancel_capture();
                if response.get().is_none() {
                    response.set(Some(DialogResponse::Cancel));
                }
                glib::Propagation::Proceed
            });
        }

        Self {
            dialog_window,
            source_entry,
            target_entry,
            text_mode_check,
            description_entry,
            controller,
            response,
        }
    }

    fn read_form(&self) -> MappingForm {
        MappingForm {
            source: self.source_entry.text().to_string(),
            target: self.target_entry.text().to_string(),
            text_mode: self.text_mode_check.is_active(),
            description: self.description_entry.text().to_string(),
        }
    }

    /// Shows the dialog and blocks (iterating the main context) until the
    /// user cancels or `submit` accepts the form.
    ///
    /// Errors from `submit` are shown and the form stays open.
    ///
    /// Returns true when something was saved.
    pub fn show_and_wait<F>(self, submit: F) -> bool
    where
        F: Fn(&MappingForm) -> Result<(), FormError>,
    {
        self.dialog_window.present();
        let main_context = glib::MainContext::default();

        loop {
            self.response.set(None);
            while self.response.get().is_none() && self.dialog_window.is_visible() {
                main_context.iteration(true);
            }

            if self.response.get() != Some(DialogResponse::Save) {
                self.controller.cancel_capture();
                self.dialog_window.close();
                return false;
            }

            let form = self.read_form();
            match submit(&form) {
                Ok(()) => {
                    self.controller.cancel_capture();
                    self.dialog_window.close();
                    return true;
                }
                Err(e) => {
                    debug!(error = %e, "Form rejected");
                    show_error(&self.dialog_window, &e.to_string());
                }
            }
        }
    }
}

/// Shows an error message in a modal window and waits for it to close
fn show_error(parent: &Window, message: &str) {
    let error_window = Window::builder()
        .title("❌ Invalid Input")
        .modal(true)
        .transient_for(parent)
        .default_width(350)
        .default_height(150)
        .resizable(false)
        .build();

    let vbox = GtkBox::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .margin_start(20)
        .margin_end(20)
        .margin_top(20)
        .margin_bottom(20)
        .build();

    let label = Label::builder()
        .label(message)
        .wrap(true)
        .justify(gtk4::Justification::Center)
        .build();

    let ok_button = Button::builder().label("Ok").halign(Align::Center).build();

    vbox.append(&label);
    vbox.append(&ok_button);
    error_window.set_child(Some(&vbox));

    let error_window_clone = error_window.clone();
    ok_button.connect_clicked(move |_| error_window_clone.close());

    error_window.present();

    let main_context = glib::MainContext::default();
    while error_window.is_visible() {
        main_context.iteration(true);
    }
}
