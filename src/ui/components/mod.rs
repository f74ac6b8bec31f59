//! UI Components
//!
//! Reusable GTK4 widgets for the mapping manager.
//!
//! # Components
//!
//! - `mapping_list.rs` - Scrollable list of mappings with enable switches
//! - `search_bar.rs` - Real-time search/filter
//! - `conflict_panel.rs` - Shared-source and connection warning banner
//! - `details_panel.rs` - Selected mapping details
//! - `edit_dialog.rs` - Add/edit mapping dialog with key recording

mod conflict_panel;
mod details_panel;
mod edit_dialog;
mod mapping_list;
mod search_bar;

pub use conflict_panel::ConflictPanel;
pub use details_panel::DetailsPanel;
pub use edit_dialog::EditDialog;
pub use mapping_list::{ErrorSink, MappingList};
pub use search_bar::{SearchBar, SearchQuery};
