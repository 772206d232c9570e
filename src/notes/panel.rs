//! Notes panel state.
//!
//! Viewing and editing are separate: `selected` names the note shown in the
//! detail pane, `draft` holds unsaved edits. A draft only ever exists for the
//! selected note, and neither may outlive the record it points at.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::model::{NewNote, Note, NoteDraft};
use crate::error::StoreError;
use crate::panel::{Notice, Outcome};
use crate::store::{RecordId, RowStore, Table};

const PANEL: &str = "notes";

pub struct NotesPanel {
    table: Table<Note>,
    user_id: Uuid,
    notes: Vec<Note>,
    selected: Option<RecordId>,
    draft: Option<NoteDraft>,
    notice: Option<Notice>,
}

impl NotesPanel {
    pub fn new(store: Arc<dyn RowStore>, user_id: Uuid) -> Self {
        Self {
            table: Table::new(store),
            user_id,
            notes: Vec::new(),
            selected: None,
            draft: None,
            notice: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// The note shown in the detail pane.
    pub fn selected(&self) -> Option<&Note> {
        let id = self.selected?;
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn draft(&self) -> Option<&NoteDraft> {
        self.draft.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Show a listed note. Switching to another note drops any open draft.
    pub fn select(&mut self, id: RecordId) -> bool {
        if !self.notes.iter().any(|n| n.id == id) {
            return false;
        }
        if self.draft.as_ref().is_some_and(|d| d.id != id) {
            debug!(id, "Draft discarded by selection change");
            self.draft = None;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.draft = None;
    }

    /// Open a draft of the selected note. No-op without a selection.
    pub fn begin_edit(&mut self) -> bool {
        let draft = self.selected().map(NoteDraft::from);
        let opened = draft.is_some();
        if opened {
            self.draft = draft;
        }
        opened
    }

    pub fn edit_title(&mut self, title: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.title = title.into();
        }
    }

    pub fn edit_content(&mut self, content: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.content = content.into();
        }
    }

    /// Throw the draft away. The stored note is untouched.
    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    pub async fn refresh(&mut self) -> Outcome {
        self.begin();
        let result = self.table.list_for_user(self.user_id).await;

        match result {
            Ok(notes) => {
                self.notes = notes;
                self.drop_dangling();
                Outcome::Applied
            }
            Err(e) => self.fail("load notes", &e),
        }
    }

    /// Create a note stamped with today's date. Title and content are required.
    pub async fn add(&mut self, title: &str, content: &str) -> Outcome {
        if title.is_empty() || content.is_empty() {
            return Outcome::Skipped;
        }

        self.begin();
        let result = self
            .table
            .insert(&NewNote::new(self.user_id, title, content))
            .await;
        if result.is_ok() {
            info!(title, "Note added");
        }
        self.settle("add note", result).await
    }

    /// Write the draft's title and content to its note.
    ///
    /// On success the note stays selected and the draft closes. On failure
    /// the draft is kept so it can be retried or cancelled.
    pub async fn save(&mut self) -> Outcome {
        let Some(draft) = self.draft.clone() else {
            return Outcome::Skipped;
        };

        self.begin();
        let result = self.table.update(draft.id, &draft.patch()).await;
        if result.is_ok() {
            info!(id = draft.id, "Note saved");
            self.draft = None;
            self.selected = Some(draft.id);
        }
        self.settle("save note", result).await
    }

    /// Delete a note, clearing the selection and draft if they point at it.
    pub async fn delete(&mut self, id: RecordId) -> Outcome {
        self.begin();
        let result = self.table.delete(id).await;
        if result.is_ok() {
            info!(id, "Note deleted");
            if self.selected == Some(id) {
                self.selected = None;
            }
            if self.draft.as_ref().is_some_and(|d| d.id == id) {
                self.draft = None;
            }
        }
        self.settle("delete note", result).await
    }

    fn drop_dangling(&mut self) {
        if let Some(id) = self.selected {
            if !self.notes.iter().any(|n| n.id == id) {
                self.selected = None;
            }
        }
        if let Some(id) = self.draft.as_ref().map(|d| d.id) {
            if !self.notes.iter().any(|n| n.id == id) {
                self.draft = None;
            }
        }
    }

    fn begin(&mut self) {
        self.notice = None;
    }

    async fn settle(&mut self, action: &'static str, result: Result<(), StoreError>) -> Outcome {
        match result {
            Ok(()) => self.refresh().await,
            Err(e) => self.fail(action, &e),
        }
    }

    fn fail(&mut self, action: &'static str, err: &StoreError) -> Outcome {
        self.notice = Some(Notice::remote_failure(PANEL, action, err));
        Outcome::Failed
    }
}
