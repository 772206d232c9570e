//! Routine panel state.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::model::{CompletionPatch, NewRoutine, Routine};
use crate::error::StoreError;
use crate::panel::{Notice, Outcome};
use crate::store::{RecordId, RowStore, Table};

const PANEL: &str = "routines";

/// The routine list of one user.
pub struct RoutinePanel {
    table: Table<Routine>,
    user_id: Uuid,
    routines: Vec<Routine>,
    notice: Option<Notice>,
}

impl RoutinePanel {
    pub fn new(store: Arc<dyn RowStore>, user_id: Uuid) -> Self {
        Self {
            table: Table::new(store),
            user_id,
            routines: Vec::new(),
            notice: None,
        }
    }

    /// Last confirmed list, oldest first.
    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Replace the list with the backend's current rows.
    pub async fn refresh(&mut self) -> Outcome {
        self.begin();
        let result = self.table.list_for_user(self.user_id).await;

        match result {
            Ok(routines) => {
                self.routines = routines;
                Outcome::Applied
            }
            Err(e) => self.fail("load routines", &e),
        }
    }

    /// Create a routine. Both fields are required.
    pub async fn add(&mut self, name: &str, time: &str) -> Outcome {
        if name.is_empty() || time.is_empty() {
            return Outcome::Skipped;
        }

        self.begin();
        let result = self
            .table
            .insert(&NewRoutine::new(self.user_id, name, time))
            .await;
        if result.is_ok() {
            info!(name, time, "Routine added");
        }
        self.settle("add routine", result).await
    }

    /// Flip the completion flag of a listed routine.
    pub async fn toggle(&mut self, id: RecordId) -> Outcome {
        let Some(current) = self.routines.iter().find(|r| r.id == id).map(|r| r.completed) else {
            return Outcome::Skipped;
        };

        self.begin();
        let result = self
            .table
            .update(id, &CompletionPatch { completed: !current })
            .await;
        self.settle("update routine", result).await
    }

    pub async fn delete(&mut self, id: RecordId) -> Outcome {
        self.begin();
        let result = self.table.delete(id).await;
        if result.is_ok() {
            info!(id, "Routine deleted");
        }
        self.settle("delete routine", result).await
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
