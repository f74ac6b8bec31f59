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

//! GTK4 Application wrapper
//!
//! This module sets up the GTK4 application lifecycle and creates
//! the main window.
//!
//! # Architecture
//!
//! ```text
//! App (GTK4 Application)
//!   ├─ Holds the Controller (and through it the Session)
//!   ├─ Builds main window
//!   ├─ Attaches the X connection and mapping-file watches
//!   └─ Releases every grab on shutdown
//! ```

use gtk4::prelude::*;
use gtk4::{gdk, glib, Application, ApplicationWindow, CssProvider};
use std::rc::Rc;
use tracing::{info, warn};

use crate::runtime::Session;
use crate::ui::{actions, builders, Controller};

const APP_ID: &str = "io.github.tidynest.rekey";
const DETAILS_WIDTH: i32 = 280;

/// GTK4 Application for mapping management
pub struct App {
    /// GTK4 Application instance
    app: Application,
    /// MVC Controller
    controller: Rc<Controller>,
}

impl App {
    /// Wraps a connected session. Nothing is shown until `run`.
    pub fn new(session: Session) -> Self {
        let app = Application::builder().application_id(APP_ID).build();

        Self {
            app,
            controller: Rc::new(Controller::new(session)),
        }
    }

    /// Runs the GTK4 main loop until the window closes.
    ///
    /// Command-line arguments are not forwarded; clap has already parsed them.
    pub fn run(self) -> glib::ExitCode {
        let controller = self.controller.clone();

        self.app.connect_activate(move |app| {
            // A second launch only raises the existing window
            if let Some(window) = app.active_window() {
                window.present();
                return;
            }
            Self::build_ui(app, controller.clone());
        });

        let controller = self.controller.clone();
        self.app.connect_shutdown(move |_| {
            info!("Window closed, releasing grabs");
            controller.session().shutdown();
        });

        self.app.run_with_args::<&str>(&[])
    }

    /// Loads custom CSS styling for the application
    fn load_css() {
        let Some(display) = gdk::Display::default() else {
            warn!("No display for styling");
            return;
        };

        let provider = CssProvider::new();
        provider.load_from_string(include_str!("style.css"));

        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }

    /// Builds the main window UI
    fn build_ui(app: &Application, controller: Rc<Controller>) {
        Self::load_css();

        let window = ApplicationWindow::builder()
            .application(app)
            .title("rekey")
            .default_width(1000)
            .default_height(700)
            .build();

        window.set_titlebar(Some(&builders::build_header_bar()));

        let layout = builders::build_main_layout(controller.clone());
        window.set_child(Some(&layout.root));

        // Keep the details panel at 280px when the window is resized
        let paned = layout.paned.clone();
        window.connect_default_width_notify(move |window| {
            paned.set_position(window.default_width() - DETAILS_WIDTH);
        });

        actions::setup_quit_action(app);
        actions::setup_bulk_actions(app, controller.clone(), layout.clone());
        actions::setup_setting_actions(app, controller.clone());

        builders::wire_up_handlers(&window, controller.clone(), layout.clone());
        builders::wire_up_events(&window, &controller, &layout);

        controller.session().attach();

        layout.refresh();
        info!(
            mappings = controller.mapping_count(),
            active = controller.active_count(),
            "Window ready"
        );

        window.present();
    }
}
