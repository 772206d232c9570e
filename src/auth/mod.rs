//! Authentication provider seam, session types and the sign-in form.

pub mod form;
pub mod session;

pub use form::{Accepted, AuthForm, AuthMessage, AuthMode, MessageKind, Submission};
pub use session::{AuthEvent, Credentials, Session, SignUpOutcome, User};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::AuthError;

/// Credential-based auth provider.
///
/// Implementations own the session. Every transition (sign-in, token
/// refresh, sign-out) is announced on the channel returned by `subscribe`.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError>;

    /// Sign in with email and password.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// End the current session.
    ///
    /// The local session is cleared even when the provider call fails.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The current session, if signed in.
    async fn current_session(&self) -> Option<Session>;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
