//! Local UI server: the static page plus a JSON action API over the `Hub`.
//!
//! Every action route answers with the full `HubSnapshot`, so the page only
//! ever re-renders from the latest state.

mod routes;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::AuthService;
use crate::hub::Hub;

pub use routes::web_routes;

/// Shared state for the UI routes.
#[derive(Clone)]
pub struct HubState {
    pub hub: Arc<Mutex<Hub>>,
}

impl HubState {
    pub fn new(hub: Hub) -> Self {
        Self {
            hub: Arc::new(Mutex::new(hub)),
        }
    }
}

/// Errors answered by the action routes.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not signed in")]
    SignedOut,

    #[error("Invalid record id: {0}")]
    BadId(String),

    #[error("{0}")]
    BadValue(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::SignedOut => StatusCode::UNAUTHORIZED,
            Self::BadId(_) | Self::BadValue(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Forward provider session changes into the hub.
pub fn spawn_auth_listener(auth: &dyn AuthService, state: HubState) -> JoinHandle<()> {
    let mut rx = auth.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!(?event, "Session change");
                    state.hub.lock().await.apply_event(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Auth listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
