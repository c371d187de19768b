// Profile editing: the singleton CV document, its section and tab editors,
// field-level mutation, and the debounced write queue that persists it.

pub mod autosave;
pub mod field_path;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod sections;
pub mod store;
pub mod tabs;
pub mod validation;

pub use models::ProfileDocument;
pub use store::ProfileStore;

/// Restores the ordering invariants on a document of unknown provenance.
pub fn normalize(doc: &mut ProfileDocument) {
    sections::normalize_sections(doc);
    tabs::normalize_tabs(doc);
}
