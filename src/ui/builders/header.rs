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

//! Header bar builder
//!
//! Creates the application header bar with its menu

use gtk4::{gio::Menu, HeaderBar, MenuButton};

/// Builds the application header bar
///
/// The menu holds:
/// - Enable All / Disable All (app.enable-all, app.disable-all)
/// - The two settings as check items (app.start-minimized,
///   app.enable-on-startup)
/// - Quit (app.quit)
pub fn build_header_bar() -> HeaderBar {
    let header_bar = HeaderBar::new();

    let mappings_section = Menu::new();
    mappings_section.append(Some("Enable All"), Some("app.enable-all"));
    mappings_section.append(Some("Disable All"), Some("app.disable-all"));

    let settings_section = Menu::new();
    settings_section.append(Some("Start Minimized"), Some("app.start-minimized"));
    settings_section.append(Some("Enable Mappings on Startup"), Some("app.enable-on-startup"));

    let menu = Menu::new();
    menu.append_section(None, &mappings_section);
    menu.append_section(None, &settings_section);
    menu.append(Some("Quit"), Some("app.quit"));

    let menu_button = MenuButton::new();
    menu_button.set_icon_name("open-menu-symbolic");
    menu_button.set_menu_model(Some(&menu));

    header_bar.pack_end(&menu_button);

    header_bar
}
