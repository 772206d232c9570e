//! Note data model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::table::timestamp;
use crate::store::{Record, RecordId};

/// A note owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: RecordId,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    /// UTC calendar day the note was created.
    pub date: NaiveDate,
    #[serde(with = "timestamp")]
    pub inserted_at: DateTime<Utc>,
}

impl Record for Note {
    const TABLE: &'static str = "notes";
}

/// Insert payload for a new note.
#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub date: NaiveDate,
}

impl NewNote {
    /// A note stamped with today's UTC date.
    pub fn new(user_id: Uuid, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            content: content.into(),
            date: Utc::now().date_naive(),
        }
    }
}

/// Unsaved edits to an existing note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDraft {
    pub id: RecordId,
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    /// Full-replacement update payload for the draft's note.
    pub fn patch(&self) -> NotePatch<'_> {
        NotePatch {
            title: &self.title,
            content: &self.content,
        }
    }
}

/// Update payload: title and content are always written together.
#[derive(Debug, Clone, Serialize)]
pub struct NotePatch<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }
}
