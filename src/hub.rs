//! Application root — session, active tab, auth view and the three panels.
//!
//! The hub owns no data of its own beyond view state. Records live in the
//! panels, which exist only while a user is signed in.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Accepted, AuthEvent, AuthForm, AuthService, Session, Submission};
use crate::error::AuthError;
use crate::notes::{Note, NoteDraft, NotesPanel};
use crate::panel::{Notice, Outcome};
use crate::routines::RoutinePanel;
use crate::store::RowStore;
use crate::todos::{TodoFilter, TodoPanel};

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Routines,
    Todos,
    Notes,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Routines => "routines",
            Self::Todos => "todos",
            Self::Notes => "notes",
        };
        f.write_str(name)
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routines" => Ok(Self::Routines),
            "todos" => Ok(Self::Todos),
            "notes" => Ok(Self::Notes),
            other => Err(format!("unknown tab: {other}")),
        }
    }
}

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Signed out, prompting to sign in.
    Landing,
    /// Signed out, auth form open.
    SignIn,
    /// Signed in.
    Dashboard,
}

/// Panels of the signed-in user.
pub struct Workspace {
    user_id: Uuid,
    pub routines: RoutinePanel,
    pub todos: TodoPanel,
    pub notes: NotesPanel,
}

impl Workspace {
    fn new(store: &Arc<dyn RowStore>, user_id: Uuid) -> Self {
        Self {
            user_id,
            routines: RoutinePanel::new(Arc::clone(store), user_id),
            todos: TodoPanel::new(Arc::clone(store), user_id),
            notes: NotesPanel::new(Arc::clone(store), user_id),
        }
    }

    async fn refresh(&mut self, tab: Tab) -> Outcome {
        match tab {
            Tab::Routines => self.routines.refresh().await,
            Tab::Todos => self.todos.refresh().await,
            Tab::Notes => self.notes.refresh().await,
        }
    }

    fn dismiss_notice(&mut self, tab: Tab) {
        match tab {
            Tab::Routines => self.routines.dismiss_notice(),
            Tab::Todos => self.todos.dismiss_notice(),
            Tab::Notes => self.notes.dismiss_notice(),
        }
    }
}

/// An auth-form submission taken out of the hub, so the provider call can
/// run without holding it.
pub struct AuthAttempt {
    auth: Arc<dyn AuthService>,
    submission: Submission,
}

impl AuthAttempt {
    pub async fn run(&self) -> Result<Accepted, AuthError> {
        self.submission.send(self.auth.as_ref()).await
    }
}

pub struct Hub {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn RowStore>,
    session: Option<Session>,
    tab: Tab,
    show_auth: bool,
    form: AuthForm,
    workspace: Option<Workspace>,
    notice: Option<Notice>,
}

impl Hub {
    pub fn new(auth: Arc<dyn AuthService>, store: Arc<dyn RowStore>) -> Self {
        Self {
            auth,
            store,
            session: None,
            tab: Tab::default(),
            show_auth: false,
            form: AuthForm::new(),
            workspace: None,
            notice: None,
        }
    }

    /// Pick up an existing session and load the default tab.
    pub async fn start(&mut self) {
        let session = self.auth.current_session().await;
        if self.apply_session(session) {
            self.refresh_active().await;
        }
    }

    pub fn view(&self) -> View {
        match (&self.session, self.show_auth) {
            (Some(_), _) => View::Dashboard,
            (None, true) => View::SignIn,
            (None, false) => View::Landing,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Greeting name: username, else email. `None` when signed out.
    pub fn welcome(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.display_name())
    }

    pub fn form(&self) -> &AuthForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AuthForm {
        &mut self.form
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn workspace_mut(&mut self) -> Option<&mut Workspace> {
        self.workspace.as_mut()
    }

    /// Reveal the auth form from the landing view.
    pub fn open_sign_in(&mut self) {
        if self.session.is_none() {
            self.show_auth = true;
        }
    }

    pub fn close_sign_in(&mut self) {
        self.show_auth = false;
    }

    /// Submit the auth form; a returned session enters the dashboard.
    pub async fn submit_auth(&mut self) {
        if let Some(attempt) = self.begin_auth() {
            let result = attempt.run().await;
            self.finish_auth(result).await;
        }
    }

    /// Fill the form from a page request and start submitting it.
    ///
    /// A request arriving while a submission is in flight leaves the form
    /// untouched.
    pub fn begin_auth_with(&mut self, email: String, password: String) -> Option<AuthAttempt> {
        if self.view() != View::SignIn || self.form.loading {
            return None;
        }
        self.form.set_email(email);
        self.form.set_password(password);
        self.begin_auth()
    }

    /// Start submitting the auth form. `None` unless the form is shown, idle
    /// and filled in.
    pub fn begin_auth(&mut self) -> Option<AuthAttempt> {
        if self.view() != View::SignIn {
            return None;
        }
        let submission = self.form.begin()?;
        Some(AuthAttempt {
            auth: Arc::clone(&self.auth),
            submission,
        })
    }

    /// Apply the answer to an attempt from `begin_auth`.
    pub async fn finish_auth(&mut self, result: Result<Accepted, AuthError>) {
        if let Some(session) = self.form.finish(result) {
            if self.apply_session(Some(session)) {
                self.refresh_active().await;
            }
        }
    }

    /// Sign out. Local state is cleared whatever the provider answers.
    pub async fn logout(&mut self) {
        let result = self.auth.sign_out().await;
        self.apply_session(None);
        self.notice = Some(match result {
            Ok(()) => Notice::info("Logged out"),
            Err(e) => {
                warn!(error = %e, "Logout failed remotely");
                Notice::error(format!("Logout error: {e}"))
            }
        });
    }

    /// Apply a session-change notification. Repeats are harmless.
    pub async fn apply_event(&mut self, event: &AuthEvent) {
        if self.apply_session(event.session().cloned()) {
            self.refresh_active().await;
        }
    }

    /// Switch tabs and run the new panel's on-mount fetch.
    pub async fn select_tab(&mut self, tab: Tab) -> Outcome {
        let Some(workspace) = self.workspace.as_mut() else {
            return Outcome::Skipped;
        };
        self.tab = tab;
        workspace.refresh(tab).await
    }

    /// Clear the hub notice and the active panel's notice.
    pub fn dismiss_notices(&mut self) {
        self.notice = None;
        let tab = self.tab;
        if let Some(workspace) = self.workspace.as_mut() {
            workspace.dismiss_notice(tab);
        }
    }

    async fn refresh_active(&mut self) {
        let tab = self.tab;
        if let Some(workspace) = self.workspace.as_mut() {
            workspace.refresh(tab).await;
        }
    }

    /// Store `session`; returns whether the panels were rebuilt or dropped.
    fn apply_session(&mut self, session: Option<Session>) -> bool {
        match session {
            Some(session) => {
                let user_id = session.user.id;
                self.session = Some(session);
                self.show_auth = false;
                if self.workspace.as_ref().is_some_and(|w| w.user_id == user_id) {
                    return false;
                }
                info!(%user_id, "Entering dashboard");
                self.workspace = Some(Workspace::new(&self.store, user_id));
                self.notice = None;
                true
            }
            None => {
                let was_signed_in = self.session.take().is_some() || self.workspace.is_some();
                self.workspace = None;
                self.tab = Tab::default();
                self.show_auth = false;
                if was_signed_in {
                    info!("Returned to landing");
                }
                was_signed_in
            }
        }
    }

    pub fn snapshot(&self) -> HubSnapshot {
        let panel = self.workspace.as_ref().map(|w| match self.tab {
            Tab::Routines => PanelSnapshot::routines(&w.routines),
            Tab::Todos => PanelSnapshot::todos(&w.todos),
            Tab::Notes => PanelSnapshot::notes(&w.notes),
        });
        HubSnapshot {
            view: self.view(),
            tab: self.tab,
            welcome: self.welcome().map(str::to_string),
            notice: self.notice.clone(),
            auth: (self.view() == View::SignIn).then(|| self.form.clone()),
            panel,
        }
    }
}

/// Everything the page needs to render one frame.
#[derive(Debug, Clone, Serialize)]
pub struct HubSnapshot {
    pub view: View,
    pub tab: Tab,
    pub welcome: Option<String>,
    pub notice: Option<Notice>,
    pub auth: Option<AuthForm>,
    pub panel: Option<PanelSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutineItem {
    pub id: i64,
    pub name: String,
    pub time: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodoItem {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub priority: Option<&'static str>,
    pub accent: &'static str,
}

/// The active panel as rendered.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelSnapshot {
    Routines {
        notice: Option<Notice>,
        items: Vec<RoutineItem>,
    },
    Todos {
        notice: Option<Notice>,
        filter: TodoFilter,
        active_count: usize,
        completed_count: usize,
        items: Vec<TodoItem>,
    },
    Notes {
        notice: Option<Notice>,
        items: Vec<Note>,
        selected: Option<Note>,
        draft: Option<NoteDraft>,
    },
}

impl PanelSnapshot {
    fn routines(panel: &RoutinePanel) -> Self {
        Self::Routines {
            notice: panel.notice().cloned(),
            items: panel
                .routines()
                .iter()
                .map(|r| RoutineItem {
                    id: r.id,
                    name: r.name.clone(),
                    time: r.time_label().to_string(),
                    completed: r.completed,
                })
                .collect(),
        }
    }

    fn todos(panel: &TodoPanel) -> Self {
        Self::Todos {
            notice: panel.notice().cloned(),
            filter: panel.filter(),
            active_count: panel.active_count(),
            completed_count: panel.completed_count(),
            items: panel
                .visible()
                .into_iter()
                .map(|t| TodoItem {
                    id: t.id,
                    text: t.text.clone(),
                    completed: t.completed,
                    priority: t.priority.as_str(),
                    accent: t.priority.accent(),
                })
                .collect(),
        }
    }

    fn notes(panel: &NotesPanel) -> Self {
        Self::Notes {
            notice: panel.notice().cloned(),
            items: panel.notes().to_vec(),
            selected: panel.selected().cloned(),
            draft: panel.draft().cloned(),
        }
    }
}
