//! Todo panel state.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::model::{CompletionPatch, NewTodo, Todo, TodoFilter};
use crate::error::StoreError;
use crate::panel::{Notice, Outcome};
use crate::store::{RecordId, RowStore, Table};

const PANEL: &str = "todos";

/// The todo list of one user and its view filter.
pub struct TodoPanel {
    table: Table<Todo>,
    user_id: Uuid,
    todos: Vec<Todo>,
    filter: TodoFilter,
    notice: Option<Notice>,
}

impl TodoPanel {
    pub fn new(store: Arc<dyn RowStore>, user_id: Uuid) -> Self {
        Self {
            table: Table::new(store),
            user_id,
            todos: Vec::new(),
            filter: TodoFilter::All,
            notice: None,
        }
    }

    /// Every fetched todo, oldest first, regardless of the filter.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Fetched todos passing the current filter, order preserved.
    pub fn visible(&self) -> Vec<&Todo> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn filter(&self) -> TodoFilter {
        self.filter
    }

    /// Change the view filter. Local only; nothing is re-fetched.
    pub fn set_filter(&mut self, filter: TodoFilter) {
        self.filter = filter;
    }

    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.todos.len() - self.active_count()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub async fn refresh(&mut self) -> Outcome {
        self.begin();
        let result = self.table.list_for_user(self.user_id).await;

        match result {
            Ok(todos) => {
                self.todos = todos;
                Outcome::Applied
            }
            Err(e) => self.fail("load todos", &e),
        }
    }

    /// Create a todo from trimmed `text` with the default priority.
    pub async fn add(&mut self, text: &str) -> Outcome {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Skipped;
        }

        self.begin();
        let result = self.table.insert(&NewTodo::new(self.user_id, text)).await;
        if result.is_ok() {
            info!(text, "Todo added");
        }
        self.settle("add todo", result).await
    }

    pub async fn toggle(&mut self, id: RecordId) -> Outcome {
        let Some(current) = self.todos.iter().find(|t| t.id == id).map(|t| t.completed) else {
            return Outcome::Skipped;
        };

        self.begin();
        let result = self
            .table
            .update(id, &CompletionPatch { completed: !current })
            .await;
        self.settle("update todo", result).await
    }

    pub async fn delete(&mut self, id: RecordId) -> Outcome {
        self.begin();
        let result = self.table.delete(id).await;
        if result.is_ok() {
            info!(id, "Todo deleted");
        }
        self.settle("delete todo", result).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, Credentials};
    use crate::store::MemoryBackend;
    use crate::todos::model::Priority;

    async fn panel() -> (Arc<MemoryBackend>, TodoPanel) {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.register("a@x.com", "secret1");
        backend
            .sign_in(&Credentials::new("a@x.com", "secret1"))
            .await
            .unwrap();
        let store: Arc<dyn RowStore> = backend.clone();
        (backend, TodoPanel::new(store, user.id))
    }

    async fn seeded() -> (Arc<MemoryBackend>, TodoPanel) {
        let (backend, mut panel) = panel().await;
        for text in ["one", "two", "three", "four"] {
            panel.add(text).await;
        }
        let second = panel.todos()[1].id;
        let fourth = panel.todos()[3].id;
        panel.toggle(second).await;
        panel.toggle(fourth).await;
        (backend, panel)
    }

    fn texts(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|t| t.text.clone()).collect()
    }

    #[tokio::test]
    async fn add_trims_and_assigns_default_priority() {
        let (_backend, mut panel) = panel().await;
        assert_eq!(panel.add("  Buy milk \n").await, Outcome::Applied);

        let todo = &panel.todos()[0];
        assert_eq!(todo.text, "Buy milk");
        assert_eq!(todo.priority, Priority::Medium);
        assert!(!todo.completed);
    }

    #[tokio::test]
    async fn blank_text_is_skipped() {
        let (backend, mut panel) = panel().await;
        assert_eq!(panel.add("   ").await, Outcome::Skipped);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn filters_select_by_completion_flag_in_order() {
        let (backend, mut panel) = seeded().await;
        let requests = backend.request_count();

        assert_eq!(texts(&panel.visible()), ["one", "two", "three", "four"]);

        panel.set_filter(TodoFilter::Active);
        assert_eq!(texts(&panel.visible()), ["one", "three"]);
        assert!(panel.visible().iter().all(|t| !t.completed));

        panel.set_filter(TodoFilter::Completed);
        assert_eq!(texts(&panel.visible()), ["two", "four"]);
        assert!(panel.visible().iter().all(|t| t.completed));

        panel.set_filter(TodoFilter::All);
        assert_eq!(panel.visible().len(), panel.todos().len());

        assert_eq!(panel.active_count(), 2);
        assert_eq!(panel.completed_count(), 2);
        assert_eq!(backend.request_count(), requests, "filtering must not re-query");
    }

    #[tokio::test]
    async fn delete_and_failed_toggle() {
        let (backend, mut panel) = seeded().await;
        let first = panel.todos()[0].id;

        assert_eq!(panel.delete(first).await, Outcome::Applied);
        assert_eq!(panel.todos().len(), 3);

        let next = panel.todos()[0].id;
        backend.fail_next_request("timeout");
        assert_eq!(panel.toggle(next).await, Outcome::Failed);
        assert_eq!(panel.todos().len(), 3);
        assert!(panel.todos()[0].completed, "flag unchanged after failure");
        assert_eq!(
            panel.notice().map(|n| n.message.as_str()),
            Some("Could not update todo: timeout")
        );
    }
}
