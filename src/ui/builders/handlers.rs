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

//! Event handler wiring
//!
//! Connects widget signals to the controller, and controller events back to
//! the widgets.

use gtk4::{gdk, gio, glib, prelude::*, ApplicationWindow, EventControllerKey};
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::layout::MainLayout;
use crate::core::KeyMapping;
use crate::remapper::{ErrorKind, RemapEvent};
use crate::ui::{
    components::EditDialog,
    controller::{FormError, MappingForm},
    Controller,
};

/// Wires up all event handlers for the main UI
///
/// Sets up:
/// - Row selection in the mapping list
/// - Keyboard navigation (Up/Down, Return to edit, Delete to remove)
/// - Delete, edit and add button handlers
pub fn wire_up_handlers(window: &ApplicationWindow, controller: Rc<Controller>, layout: Rc<MainLayout>) {
    // ============================================================================
    // Row selection handler
    // ============================================================================
    let layout_for_select = layout.clone();

    layout.mapping_list.list_box().connect_row_selected(move |_list_box, row| {
        let mapping = row
            .and_then(|r| usize::try_from(r.index()).ok())
            .and_then(|index| layout_for_select.mapping_list.get_mapping_at_index(index));

        match &mapping {
            Some(m) => debug!(id = %m.id, "Selected"),
            None => debug!("Selection cleared"),
        }
        layout_for_select.details_panel.update_mapping(mapping.as_ref());
    });

    // ============================================================================
    // Keyboard navigation
    // ============================================================================
    let key_controller = EventControllerKey::new();
    let list_box_for_keys = layout.mapping_list.list_box().clone();
    let window_for_keys = window.clone();
    let controller_for_keys = controller.clone();
    let layout_for_keys = layout.clone();

    key_controller.connect_key_pressed(move |_controller, key, _code, _modifier| match key {
        gdk::Key::Up => {
            if let Some(selected_row) = list_box_for_keys.selected_row() {
                let current_index = selected_row.index();
                if current_index > 0 {
                    if let Some(previous_row) = list_box_for_keys.row_at_index(current_index - 1) {
                        list_box_for_keys.select_row(Some(&previous_row));
                    }
                }
            }
            glib::Propagation::Stop
        }
        gdk::Key::Down => {
            if let Some(selected_row) = list_box_for_keys.selected_row() {
                let current_index = selected_row.index();
                if let Some(next_row) = list_box_for_keys.row_at_index(current_index + 1) {
                    list_box_for_keys.select_row(Some(&next_row));
                }
            } else if let Some(first_row) = list_box_for_keys.row_at_index(0) {
                list_box_for_keys.select_row(Some(&first_row));
            }
            glib::Propagation::Stop
        }
        gdk::Key::Return | gdk::Key::KP_Enter => {
            if let Some(mapping) = layout_for_keys.mapping_list.selected_mapping() {
                open_edit_dialog(&window_for_keys, &controller_for_keys, &layout_for_keys, &mapping);
            }
            glib::Propagation::Stop
        }
        gdk::Key::Delete => {
            if let Some(mapping) = layout_for_keys.mapping_list.selected_mapping() {
                confirm_delete(&window_for_keys, &controller_for_keys, &layout_for_keys, &mapping);
            }
            glib::Propagation::Stop
        }
        _ => glib::Propagation::Proceed,
    });

    layout.mapping_list.list_box().add_controller(key_controller);
    layout.mapping_list.list_box().set_can_focus(true);
    layout.mapping_list.list_box().grab_focus();

    // ============================================================================
    // Delete button handler
    // ============================================================================
    let window_for_delete = window.clone();
    let controller_for_delete = controller.clone();
    let layout_for_delete = layout.clone();

    layout.details_panel.connect_delete(move |mapping| {
        confirm_delete(&window_for_delete, &controller_for_delete, &layout_for_delete, mapping);
    });

    // ============================================================================
    // Edit button handler
    // ============================================================================
    let window_for_edit = window.clone();
    let controller_for_edit = controller.clone();
    let layout_for_edit = layout.clone();

    layout.details_panel.connect_edit(move |mapping| {
        open_edit_dialog(&window_for_edit, &controller_for_edit, &layout_for_edit, mapping);
    });

    // ============================================================================
    // Add button handler
    // ============================================================================
    let window_for_add = window.clone();
    let controller_for_add = controller.clone();
    let layout_for_add = layout.clone();

    layout.add_button.connect_clicked(move |_| {
        debug!("Add button clicked");

        let dialog = EditDialog::new(
            &window_for_add,
            controller_for_add.clone(),
            "➕ Add Mapping",
            &MappingForm::default(),
        );

        let controller = controller_for_add.clone();
        let layout = layout_for_add.clone();
        let saved = dialog.show_and_wait(move |form| match controller.add_mapping(form) {
            Ok(id) => {
                info!(id = %id, "Mapping added from the window");
                Ok(())
            }
            // Stored, but disabled; the switch can retry later
            Err(FormError::Rejected(e)) if e.kind() == ErrorKind::Grab => {
                layout.report(&format!("Saved but disabled: {}", e));
                Ok(())
            }
            Err(e) => Err(e),
        });

        if !saved {
            debug!("Add cancelled");
        }
    });
}

/// Subscribes the views to orchestrator events.
///
/// The subscriber runs while the orchestrator is borrowed, so it only
/// queues an idle callback; the views refresh from there.
pub fn wire_up_events(window: &ApplicationWindow, controller: &Rc<Controller>, layout: &Rc<MainLayout>) {
    let window = window.downgrade();
    let controller_weak = Rc::downgrade(controller);
    let layout_weak = Rc::downgrade(layout);

    controller.subscribe(move |event| {
        let event = event.clone();
        let window = window.clone();
        let controller_weak = controller_weak.clone();
        let layout_weak = layout_weak.clone();

        glib::idle_add_local_once(move || {
            let (Some(controller), Some(layout)) = (controller_weak.upgrade(), layout_weak.upgrade())
            else {
                return;
            };

            match &event {
                RemapEvent::KeyCaptured(combo) => {
                    controller.deliver_capture(*combo);
                }
                RemapEvent::ErrorOccurred(ErrorKind::Connection, message) => {
                    layout.report(message);
                    if let Some(window) = window.upgrade() {
                        gtk4::AlertDialog::builder()
                            .modal(true)
                            .message("Key remapping stopped")
                            .detail(format!(
                                "The connection to the X server was lost:\n\n{}\n\n\
                                 Your mappings are kept. Restart rekey to resume.",
                                message
                            ))
                            .buttons(vec!["OK"])
                            .build()
                            .show(Some(&window));
                    }
                }
                RemapEvent::ErrorOccurred(_, message) => layout.report(message),
                RemapEvent::Reloaded => layout.report("Mappings reloaded from disk"),
                _ => {}
            }

            layout.refresh();
        });
    });
}

fn open_edit_dialog(
    window: &ApplicationWindow,
    controller: &Rc<Controller>,
    layout: &Rc<MainLayout>,
    mapping: &KeyMapping,
) {
    debug!(id = %mapping.id, "Edit requested");

    let dialog = EditDialog::new(
        window,
        controller.clone(),
        "✏️ Edit Mapping",
        &MappingForm::from_mapping(mapping),
    );

    let id = mapping.id.clone();
    let controller_for_submit = controller.clone();
    let saved = dialog.show_and_wait(move |form| controller_for_submit.edit_mapping(&id, form));

    if saved {
        layout.refresh();
    }
}

fn confirm_delete(
    window: &ApplicationWindow,
    controller: &Rc<Controller>,
    layout: &Rc<MainLayout>,
    mapping: &KeyMapping,
) {
    let dialog = gtk4::AlertDialog::builder()
        .modal(true)
        .message("Delete Mapping?")
        .detail(format!("Are you sure you want to delete:\n\n{}", mapping))
        .buttons(vec!["Cancel", "Delete"])
        .cancel_button(0)
        .default_button(0)
        .build();

    let controller = controller.clone();
    let layout = layout.clone();
    let id = mapping.id.clone();
    let window_for_inner = window.clone();

    dialog.choose(Some(window), None::<&gio::Cancellable>, move |response| match response {
        Ok(1) => match controller.delete_mapping(&id) {
            Ok(()) => {
                layout.details_panel.update_mapping(None);
                layout.refresh();
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Delete failed");
                gtk4::AlertDialog::builder()
                    .modal(true)
                    .message("Delete Failed")
                    .detail(format!("Failed to delete mapping:\n{}", e))
                    .buttons(vec!["OK"])
                    .build()
                    .show(Some(&window_for_inner));
            }
        },
        Ok(_) => debug!("Delete cancelled"),
        Err(e) => debug!(error = %e, "Delete dialog dismissed"),
    });
}
