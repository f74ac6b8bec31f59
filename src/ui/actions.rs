//! GTK Action setup for the application
//!
//! This module contains all GTK action definitions (quit, enable-all,
//! disable-all and the two settings toggles) and their setup functions

use gtk4::{gio, prelude::*, Application};
use std::rc::Rc;
use tracing::{info, warn};

use crate::remapper::Setting;
use crate::ui::{builders::MainLayout, Controller};

/// Sets up the quit action
///
/// Creates a GTK action that quits the application when triggered.
pub fn setup_quit_action(app: &Application) {
    let quit_action = gio::SimpleAction::new("quit", None);
    let app_for_quit = app.clone();

    quit_action.connect_activate(move |_, _| {
        app_for_quit.quit();
    });

    app.add_action(&quit_action);
}

/// Sets up enable-all and disable-all
///
/// Mappings that cannot be enabled are listed in the status bar.
pub fn setup_bulk_actions(app: &Application, controller: Rc<Controller>, layout: Rc<MainLayout>) {
    for (name, enable) in [("enable-all", true), ("disable-all", false)] {
        let action = gio::SimpleAction::new(name, None);
        let controller = controller.clone();
        let layout = layout.clone();

        action.connect_activate(move |_, _| {
            let failures = if enable {
                controller.enable_all()
            } else {
                controller.disable_all()
            };

            info!(enable, failed = failures.len(), "Bulk toggle");
            if !failures.is_empty() {
                warn!(failures = ?failures, "Some mappings kept their state");
                layout.report(&format!(
                    "{} mapping(s) could not be changed: {}",
                    failures.len(),
                    failures.join("; ")
                ));
            }
        });

        app.add_action(&action);
    }
}

/// Sets up the settings toggles as stateful boolean actions
///
/// The menu shows them as check items.
pub fn setup_setting_actions(app: &Application, controller: Rc<Controller>) {
    let settings = controller.settings();

    for (name, setting, initial) in [
        ("start-minimized", Setting::StartMinimized, settings.start_minimized),
        ("enable-on-startup", Setting::EnableOnStartup, settings.enable_on_startup),
    ] {
        let action = gio::SimpleAction::new_stateful(name, None, &initial.to_variant());
        let controller = controller.clone();

        action.connect_activate(move |action, _| {
            let current = action
                .state()
                .and_then(|state| state.get::<bool>())
                .unwrap_or(initial);
            let next = !current;

            controller.set_setting(setting, next);
            action.set_state(&next.to_variant());
        });

        app.add_action(&action);
    }
}
