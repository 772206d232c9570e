//! GoTrue endpoints.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{RawUser, SupabaseClient, TokenResponse, check, read_auth_json};
use crate::auth::{AuthEvent, AuthService, Credentials, Session, SignUpOutcome};
use crate::error::AuthError;

/// `/signup` answers with a session when the project auto-confirms, with a
/// bare user (older GoTrue) or a `{user, session: null}` pair otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Wrapped { user: RawUser },
    User(RawUser),
}

fn credentials_body(credentials: &Credentials) -> serde_json::Value {
    serde_json::json!({
        "email": credentials.email,
        "password": credentials.password.expose_secret(),
    })
}

#[async_trait]
impl AuthService for SupabaseClient {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        let resp = self
            .with_api_key(self.http.post(self.auth_url("signup")))
            .json(&credentials_body(credentials))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        match read_auth_json::<SignUpResponse>(resp).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session();
                info!(user_id = %session.user.id, "Signed up and signed in");
                self.replace_session(Some(session.clone())).await;
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::Wrapped { user } | SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationPending(user.into()))
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let resp = self
            .with_api_key(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&credentials_body(credentials))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let token: TokenResponse = read_auth_json(resp).await?;
        let session = token.into_session();
        info!(user_id = %session.user.id, "Signed in");
        self.replace_session(Some(session.clone())).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.session.read().await.clone();
        // Local state goes first so the UI is signed out whatever the server says.
        self.replace_session(None).await;

        let Some(session) = previous else {
            return Ok(());
        };

        let resp = self
            .with_api_key(self.http.post(self.auth_url("logout")))
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        match check(resp).await {
            Ok(_) => {
                info!(user_id = %session.user.id, "Signed out");
                Ok(())
            }
            Err((status, message)) => {
                warn!(%status, message = %message, "Remote sign-out failed");
                Err(AuthError::Rejected { message })
            }
        }
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
