//! Integration tests for the Supabase client.
//!
//! A fake project (GoTrue + PostgREST subset) runs on a random port and
//! records every request, so each test can assert on the exact wire traffic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use uuid::Uuid;

use productivity_hub::auth::{AuthEvent, AuthService, Credentials, SignUpOutcome};
use productivity_hub::config::SupabaseConfig;
use productivity_hub::error::StoreError;
use productivity_hub::notes::{NewNote, Note};
use productivity_hub::store::{RowStore, Table};
use productivity_hub::supabase::SupabaseClient;
use productivity_hub::todos::{NewTodo, Todo};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const ANON_KEY: &str = "anon-key";
const USER_ID: &str = "0d7a4c1e-4f4c-4c39-9c55-0d1f2b8f6a11";

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone, Default)]
struct FakeProject {
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl FakeProject {
    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> Captured {
        self.requests().pop().expect("no request recorded")
    }
}

fn token_body(access_token: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": "refresh-token",
        "user": {
            "id": USER_ID,
            "email": "a@x.com",
            "user_metadata": {"username": "ada"}
        }
    })
}

async fn handle(
    State(project): State<FakeProject>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let captured = Captured {
        method: method.clone(),
        path: uri.path().to_string(),
        query,
        headers,
        body,
    };
    project.requests.lock().unwrap().push(captured.clone());

    match (method.as_str(), captured.path.as_str()) {
        ("POST", "/auth/v1/token") => match captured.query("grant_type") {
            Some("password") => match captured.json()["password"].as_str() {
                Some("secret1") => Json(token_body("access-token", 3600)).into_response(),
                Some("short-lived") => Json(token_body("access-token", 10)).into_response(),
                Some("revoked-refresh") => {
                    let mut body = token_body("access-token", 10);
                    body["refresh_token"] = json!("revoked-token");
                    Json(body).into_response()
                }
                Some("logout-fails") => {
                    Json(token_body("failing-logout-token", 3600)).into_response()
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid login credentials"
                    })),
                )
                    .into_response(),
            },
            Some("refresh_token") if captured.json()["refresh_token"] == "revoked-token" => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid Refresh Token: Refresh Token Not Found"
                })),
            )
                .into_response(),
            Some("refresh_token") => Json(token_body("renewed-token", 3600)).into_response(),
            _ => StatusCode::BAD_REQUEST.into_response(),
        },
        ("POST", "/auth/v1/signup") => match captured.json()["password"].as_str() {
            Some("auto-confirm") => Json(token_body("access-token", 3600)).into_response(),
            _ => Json(json!({
                "id": USER_ID,
                "email": "a@x.com",
                "confirmation_sent_at": "2025-07-10T06:59:01Z"
            }))
            .into_response(),
        },
        ("POST", "/auth/v1/logout") => match captured.header("authorization") {
            Some("Bearer failing-logout-token") => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"code": 500, "msg": "Logout failed"})),
            )
                .into_response(),
            _ => StatusCode::NO_CONTENT.into_response(),
        },
        ("GET", "/rest/v1/todos") => Json(json!([
            {
                "id": 1,
                "user_id": USER_ID,
                "text": "Buy milk",
                "completed": false,
                "priority": "high",
                "inserted_at": "2025-07-10T06:59:01.123456+00:00"
            },
            {
                "id": 2,
                "user_id": USER_ID,
                "text": "Call mom",
                "completed": true,
                "priority": null,
                "inserted_at": "2025-07-10T07:01:44.5"
            }
        ]))
        .into_response(),
        ("POST", "/rest/v1/todos") => StatusCode::CREATED.into_response(),
        ("PATCH", "/rest/v1/todos") | ("DELETE", "/rest/v1/todos") => {
            StatusCode::NO_CONTENT.into_response()
        }
        (_, "/rest/v1/notes") => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "code": "42501",
                "message": "new row violates row-level security policy for table \"notes\""
            })),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the fake project on a random port and a client pointed at it.
async fn start_project() -> (FakeProject, Arc<SupabaseClient>) {
    let project = FakeProject::default();
    let app = Router::new().fallback(handle).with_state(project.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = SupabaseConfig::new(format!("http://127.0.0.1:{port}/"), ANON_KEY);
    (project, Arc::new(SupabaseClient::new(config)))
}

async fn signed_in(password: &str) -> (FakeProject, Arc<SupabaseClient>) {
    let (project, client) = start_project().await;
    client
        .sign_in(&Credentials::new("a@x.com", password))
        .await
        .unwrap();
    (project, client)
}

fn user_id() -> Uuid {
    Uuid::parse_str(USER_ID).unwrap()
}

#[tokio::test]
async fn sign_in_uses_password_grant() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = start_project().await;
        let mut events = client.subscribe();

        let session = client
            .sign_in(&Credentials::new("a@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.user.id, user_id());
        assert_eq!(session.user.display_name(), "ada");

        let req = project.last();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/auth/v1/token");
        assert_eq!(req.query("grant_type"), Some("password"));
        assert_eq!(req.header("apikey"), Some(ANON_KEY));
        assert_eq!(req.json(), json!({"email": "a@x.com", "password": "secret1"}));

        assert!(client.current_session().await.is_some());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_sign_in_keeps_session_empty() {
    timeout(TEST_TIMEOUT, async {
        let (_project, client) = start_project().await;

        let err = client
            .sign_in(&Credentials::new("a@x.com", "wrong-pw"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(client.current_session().await.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sign_up_without_session_awaits_confirmation() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = start_project().await;

        let outcome = client
            .sign_up(&Credentials::new("a@x.com", "secret1"))
            .await
            .unwrap();
        let SignUpOutcome::ConfirmationPending(user) = outcome else {
            panic!("expected confirmation to be pending");
        };
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert_eq!(project.last().path, "/auth/v1/signup");
        assert!(client.current_session().await.is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn select_sends_filter_order_and_bearer() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("secret1").await;
        let todos: Table<Todo> = Table::new(client.clone());

        let list = todos.list_for_user(user_id()).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text, "Buy milk");
        assert!(list[0].inserted_at < list[1].inserted_at);

        let req = project.last();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/rest/v1/todos");
        assert_eq!(req.query("select"), Some("*"));
        assert_eq!(req.query("user_id"), Some(format!("eq.{USER_ID}").as_str()));
        assert_eq!(req.query("order"), Some("inserted_at.asc"));
        assert_eq!(req.header("apikey"), Some(ANON_KEY));
        assert_eq!(req.header("authorization"), Some("Bearer access-token"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn insert_posts_one_row_array() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("secret1").await;
        let todos: Table<Todo> = Table::new(client.clone());

        todos.insert(&NewTodo::new(user_id(), "Buy milk")).await.unwrap();

        let req = project.last();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.header("prefer"), Some("return=minimal"));
        let body = req.json();
        let rows = body.as_array().expect("array body");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text"], "Buy milk");
        assert_eq!(rows[0]["priority"], "medium");
        assert!(rows[0].get("id").is_none());
        assert!(rows[0].get("inserted_at").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn update_and_delete_address_rows_by_id() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("secret1").await;

        client
            .update("todos", 7, json!({"completed": true}))
            .await
            .unwrap();
        let req = project.last();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.query("id"), Some("eq.7"));
        assert_eq!(req.json(), json!({"completed": true}));

        client.delete("todos", 7).await.unwrap();
        let req = project.last();
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.query("id"), Some("eq.7"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_row_request_carries_status_and_message() {
    timeout(TEST_TIMEOUT, async {
        let (_project, client) = signed_in("secret1").await;
        let notes: Table<Note> = Table::new(client.clone());

        let err = notes
            .insert(&NewNote::new(Uuid::new_v4(), "Ideas", "body"))
            .await
            .unwrap_err();
        match &err {
            StoreError::Rejected { table, status, .. } => {
                assert_eq!(table, "notes");
                assert_eq!(*status, 403);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "new row violates row-level security policy for table \"notes\""
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn signed_out_requests_use_anon_key_as_bearer() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = start_project().await;

        client.delete("todos", 1).await.unwrap();
        assert_eq!(
            project.last().header("authorization"),
            Some(format!("Bearer {ANON_KEY}").as_str())
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn expiring_token_is_renewed_before_row_request() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("short-lived").await;
        let mut events = client.subscribe();

        client.delete("todos", 1).await.unwrap();

        let requests = project.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].path, "/auth/v1/token");
        assert_eq!(requests[1].query("grant_type"), Some("refresh_token"));
        assert_eq!(requests[1].json()["refresh_token"], "refresh-token");
        assert_eq!(requests[2].header("authorization"), Some("Bearer renewed-token"));

        assert!(matches!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed(_)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sign_out_revokes_and_clears() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("secret1").await;
        let mut events = client.subscribe();

        client.sign_out().await.unwrap();

        let req = project.last();
        assert_eq!(req.path, "/auth/v1/logout");
        assert_eq!(req.header("authorization"), Some("Bearer access-token"));
        assert!(client.current_session().await.is_none());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_renewal_signs_out_and_falls_back_to_anon_key() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("revoked-refresh").await;
        let mut events = client.subscribe();

        client.delete("todos", 1).await.unwrap();

        let requests = project.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].query("grant_type"), Some("refresh_token"));
        assert_eq!(requests[1].json()["refresh_token"], "revoked-token");
        assert_eq!(requests[2].method, Method::DELETE);
        assert_eq!(requests[2].header("authorization"), Some("Bearer anon-key"));

        assert!(client.current_session().await.is_none());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn auto_confirmed_sign_up_signs_in() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = start_project().await;
        let mut events = client.subscribe();

        let outcome = client
            .sign_up(&Credentials::new("a@x.com", "auto-confirm"))
            .await
            .unwrap();
        let SignUpOutcome::SignedIn(session) = outcome else {
            panic!("expected a session, got {outcome:?}");
        };
        assert_eq!(session.user.id, user_id());
        assert_eq!(project.last().path, "/auth/v1/signup");

        let current = client.current_session().await.expect("session stored");
        assert_eq!(current.user.display_name(), "ada");
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedIn(_)));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn remote_logout_failure_still_clears_session() {
    timeout(TEST_TIMEOUT, async {
        let (project, client) = signed_in("logout-fails").await;
        let mut events = client.subscribe();

        let err = client.sign_out().await.unwrap_err();
        assert_eq!(err.to_string(), "Logout failed");

        let req = project.last();
        assert_eq!(req.path, "/auth/v1/logout");
        assert_eq!(req.header("authorization"), Some("Bearer failing-logout-token"));
        assert!(client.current_session().await.is_none());
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
    })
    .await
    .expect("test timed out");
}
