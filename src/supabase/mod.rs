//! Supabase client for GoTrue auth and PostgREST rows.
//!
//! One `SupabaseClient` implements both `AuthService` and `RowStore`. It keeps
//! the current session in memory, sends the access token on row requests and
//! renews it shortly before expiry.

mod auth;
mod rest;

use chrono::{Duration, TimeZone, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthEvent, Session, User};
use crate::config::SupabaseConfig;
use crate::error::{AuthError, StoreError};

const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Supabase project client.
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            config,
            http: reqwest::Client::new(),
            session: RwLock::new(None),
            events,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url)
    }

    /// Attach the project's public API key.
    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.config.anon_key.expose_secret())
    }

    /// Bearer token for row requests: the session's access token (renewed if
    /// close to expiry), else the anon key.
    async fn bearer(&self) -> String {
        let current = self.session.read().await.clone();
        match current {
            Some(session) if session.needs_refresh(Utc::now()) => {
                match self.refresh(&session).await {
                    Ok(renewed) => renewed.access_token.expose_secret().to_string(),
                    Err(e) => {
                        warn!(error = %e, "Session renewal failed; signing out locally");
                        self.replace_session(None).await;
                        self.config.anon_key.expose_secret().to_string()
                    }
                }
            }
            Some(session) => session.access_token.expose_secret().to_string(),
            None => self.config.anon_key.expose_secret().to_string(),
        }
    }

    /// Store `session` and announce the change.
    async fn replace_session(&self, session: Option<Session>) {
        *self.session.write().await = session.clone();
        let event = match session {
            Some(session) => AuthEvent::SignedIn(session),
            None => AuthEvent::SignedOut,
        };
        let _ = self.events.send(event);
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_ref()
            .ok_or_else(|| AuthError::Rejected {
                message: "Session expired".into(),
            })?;

        let resp = self
            .with_api_key(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let token: TokenResponse = read_auth_json(resp).await?;
        let renewed = token.into_session();
        *self.session.write().await = Some(renewed.clone());
        info!(user_id = %renewed.user.id, "Session renewed");
        let _ = self.events.send(AuthEvent::TokenRefreshed(renewed.clone()));
        Ok(renewed)
    }
}

/// User object as returned by GoTrue.
#[derive(Debug, Deserialize)]
struct RawUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        let username = raw
            .user_metadata
            .as_ref()
            .and_then(|meta| meta.get("username"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self {
            id: raw.id,
            email: raw.email,
            username,
        }
    }
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: RawUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => {
                Duration::try_seconds(secs).and_then(|ttl| Utc::now().checked_add_signed(ttl))
            }
            (None, None) => None,
        };
        Session {
            user: self.user.into(),
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at,
        }
    }
}

/// Human-readable message from an error response body.
///
/// GoTrue and PostgREST disagree on the field name, so the first of `msg`,
/// `message`, `error_description` and `error` wins.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| json.get(key).and_then(|v| v.as_str()).map(str::to_string))
        });

    from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

/// Split a response into success or `(status, message)`.
async fn check(resp: Response) -> Result<Response, (StatusCode, String)> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err((status, error_message(status, &body)))
}

async fn read_auth_json<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, AuthError> {
    let resp = check(resp)
        .await
        .map_err(|(_, message)| AuthError::Rejected { message })?;
    resp.json()
        .await
        .map_err(|e| AuthError::Decode(e.to_string()))
}

fn store_failure(table: &str, (status, message): (StatusCode, String)) -> StoreError {
    StoreError::Rejected {
        table: table.to_string(),
        status: status.as_u16(),
        message,
    }
}

fn transport_failure(table: &str, err: reqwest::Error) -> StoreError {
    StoreError::Request {
        table: table.to_string(),
        reason: err.to_string(),
    }
}
