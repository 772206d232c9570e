//! Titled free-form notes, edited through a staged draft.

pub mod model;
pub mod panel;

pub use model::{NewNote, Note, NoteDraft};
pub use panel::NotesPanel;
