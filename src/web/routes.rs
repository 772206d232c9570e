//! Route table and handlers.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use super::{HubState, WebError};
use crate::hub::{Hub, HubSnapshot, Tab, Workspace};
use crate::store::RecordId;
use crate::todos::TodoFilter;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

type Reply = Result<Json<HubSnapshot>, WebError>;

/// Build the page and JSON API routes.
pub fn web_routes(state: HubState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/state", get(snapshot))
        .route("/api/notices", delete(dismiss_notices))
        // auth
        .route("/api/auth/open", post(open_sign_in))
        .route("/api/auth/close", post(close_sign_in))
        .route("/api/auth/mode", post(toggle_mode))
        .route("/api/auth/submit", post(submit_auth))
        .route("/api/auth/logout", post(logout))
        // tabs
        .route("/api/tabs/{tab}", put(select_tab))
        // routines
        .route("/api/routines", post(add_routine))
        .route("/api/routines/{id}/toggle", post(toggle_routine))
        .route("/api/routines/{id}", delete(delete_routine))
        // todos
        .route("/api/todos", post(add_todo))
        .route("/api/todos/filter", put(set_todo_filter))
        .route("/api/todos/{id}/toggle", post(toggle_todo))
        .route("/api/todos/{id}", delete(delete_todo))
        // notes
        .route("/api/notes", post(add_note))
        .route("/api/notes/selection", delete(clear_note_selection))
        .route(
            "/api/notes/draft",
            post(begin_note_edit).put(edit_note_draft).delete(cancel_note_edit),
        )
        .route("/api/notes/draft/save", post(save_note))
        .route("/api/notes/{id}/select", post(select_note))
        .route("/api/notes/{id}", delete(delete_note))
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<RecordId, WebError> {
    raw.parse().map_err(|_| WebError::BadId(raw.to_string()))
}

fn signed_in(hub: &mut Hub) -> Result<&mut Workspace, WebError> {
    hub.workspace_mut().ok_or(WebError::SignedOut)
}

// ── Page ────────────────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "productivity-hub"
    }))
}

async fn snapshot(State(state): State<HubState>) -> Json<HubSnapshot> {
    Json(state.hub.lock().await.snapshot())
}

async fn dismiss_notices(State(state): State<HubState>) -> Json<HubSnapshot> {
    let mut hub = state.hub.lock().await;
    hub.dismiss_notices();
    Json(hub.snapshot())
}

// ── Auth ────────────────────────────────────────────────────────────────

async fn open_sign_in(State(state): State<HubState>) -> Json<HubSnapshot> {
    let mut hub = state.hub.lock().await;
    hub.open_sign_in();
    Json(hub.snapshot())
}

async fn close_sign_in(State(state): State<HubState>) -> Json<HubSnapshot> {
    let mut hub = state.hub.lock().await;
    hub.close_sign_in();
    Json(hub.snapshot())
}

async fn toggle_mode(State(state): State<HubState>) -> Json<HubSnapshot> {
    let mut hub = state.hub.lock().await;
    hub.form_mut().toggle_mode();
    Json(hub.snapshot())
}

#[derive(Deserialize)]
struct CredentialsRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn submit_auth(
    State(state): State<HubState>,
    Json(body): Json<CredentialsRequest>,
) -> Json<HubSnapshot> {
    let attempt = {
        let mut hub = state.hub.lock().await;
        match hub.begin_auth_with(body.email, body.password) {
            Some(attempt) => attempt,
            None => return Json(hub.snapshot()),
        }
    };

    // Hub unlocked here; concurrent submits see `loading`.
    let result = attempt.run().await;

    let mut hub = state.hub.lock().await;
    hub.finish_auth(result).await;
    Json(hub.snapshot())
}

async fn logout(State(state): State<HubState>) -> Reply {
    let mut hub = state.hub.lock().await;
    if hub.session().is_none() {
        return Err(WebError::SignedOut);
    }
    hub.logout().await;
    Ok(Json(hub.snapshot()))
}

// ── Tabs ────────────────────────────────────────────────────────────────

async fn select_tab(State(state): State<HubState>, Path(tab): Path<String>) -> Reply {
    let tab: Tab = tab.parse().map_err(WebError::BadValue)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?;
    let outcome = hub.select_tab(tab).await;
    debug!(%tab, ?outcome, "Tab selected");
    Ok(Json(hub.snapshot()))
}

// ── Routines ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NewRoutineRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    time: String,
}

async fn add_routine(
    State(state): State<HubState>,
    Json(body): Json<NewRoutineRequest>,
) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.routines.add(&body.name, &body.time).await;
    Ok(Json(hub.snapshot()))
}

async fn toggle_routine(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.routines.toggle(id).await;
    Ok(Json(hub.snapshot()))
}

async fn delete_routine(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.routines.delete(id).await;
    Ok(Json(hub.snapshot()))
}

// ── Todos ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NewTodoRequest {
    #[serde(default)]
    text: String,
}

async fn add_todo(State(state): State<HubState>, Json(body): Json<NewTodoRequest>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.todos.add(&body.text).await;
    Ok(Json(hub.snapshot()))
}

#[derive(Deserialize)]
struct FilterRequest {
    filter: String,
}

async fn set_todo_filter(
    State(state): State<HubState>,
    Json(body): Json<FilterRequest>,
) -> Reply {
    let filter: TodoFilter = body.filter.parse().map_err(WebError::BadValue)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.todos.set_filter(filter);
    Ok(Json(hub.snapshot()))
}

async fn toggle_todo(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.todos.toggle(id).await;
    Ok(Json(hub.snapshot()))
}

async fn delete_todo(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.todos.delete(id).await;
    Ok(Json(hub.snapshot()))
}

// ── Notes ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NewNoteRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

async fn add_note(State(state): State<HubState>, Json(body): Json<NewNoteRequest>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.add(&body.title, &body.content).await;
    Ok(Json(hub.snapshot()))
}

async fn select_note(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.select(id);
    Ok(Json(hub.snapshot()))
}

async fn clear_note_selection(State(state): State<HubState>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.clear_selection();
    Ok(Json(hub.snapshot()))
}

async fn begin_note_edit(State(state): State<HubState>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.begin_edit();
    Ok(Json(hub.snapshot()))
}

#[derive(Deserialize)]
struct DraftRequest {
    title: Option<String>,
    content: Option<String>,
}

async fn edit_note_draft(
    State(state): State<HubState>,
    Json(body): Json<DraftRequest>,
) -> Reply {
    let mut hub = state.hub.lock().await;
    let notes = &mut signed_in(&mut hub)?.notes;
    if let Some(title) = body.title {
        notes.edit_title(title);
    }
    if let Some(content) = body.content {
        notes.edit_content(content);
    }
    Ok(Json(hub.snapshot()))
}

async fn cancel_note_edit(State(state): State<HubState>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.cancel_edit();
    Ok(Json(hub.snapshot()))
}

async fn save_note(State(state): State<HubState>) -> Reply {
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.save().await;
    Ok(Json(hub.snapshot()))
}

async fn delete_note(State(state): State<HubState>, Path(id): Path<String>) -> Reply {
    let id = parse_id(&id)?;
    let mut hub = state.hub.lock().await;
    signed_in(&mut hub)?.notes.delete(id).await;
    Ok(Json(hub.snapshot()))
}
