//! Sign-in / sign-up form state.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, warn};

use super::{AuthService, Credentials, Session, SignUpOutcome};
use crate::error::AuthError;

pub const SIGN_UP_MESSAGE: &str = "Sign-up successful! Check your email for confirmation.";
pub const SIGN_IN_MESSAGE: &str = "Logged in successfully!";

/// Which action the form submits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Success,
    Error,
}

/// Feedback line shown under the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl AuthMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// The auth form: mode, field contents, in-flight flag and last message.
///
/// The password is kept only until the next successful submission clears it;
/// it is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    #[serde(skip)]
    password: SecretString,
    pub loading: bool,
    pub message: Option<AuthMessage>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            email: String::new(),
            password: SecretString::from(String::new()),
            loading: false,
            message: None,
        }
    }
}

/// Credentials taken from the form for one provider call.
#[derive(Debug)]
pub struct Submission {
    pub mode: AuthMode,
    pub credentials: Credentials,
}

/// A submission the provider accepted.
#[derive(Debug)]
pub struct Accepted {
    message: &'static str,
    session: Option<Session>,
}

impl Submission {
    /// Run the provider call. Borrows nothing from the form, so the caller
    /// may release it while the call is in flight.
    pub async fn send(&self, auth: &dyn AuthService) -> Result<Accepted, AuthError> {
        match self.mode {
            AuthMode::SignUp => {
                let outcome = auth.sign_up(&self.credentials).await?;
                let session = match outcome {
                    SignUpOutcome::ConfirmationPending(_) => None,
                    SignUpOutcome::SignedIn(session) => Some(session),
                };
                Ok(Accepted {
                    message: SIGN_UP_MESSAGE,
                    session,
                })
            }
            AuthMode::Login => {
                let session = auth.sign_in(&self.credentials).await?;
                Ok(Accepted {
                    message: SIGN_IN_MESSAGE,
                    session: Some(session),
                })
            }
        }
    }
}

impl AuthForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch between login and sign-up.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::Login,
        };
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = SecretString::from(password.into());
    }

    pub fn password_is_empty(&self) -> bool {
        self.password.expose_secret().is_empty()
    }

    /// Start a submission: mark the form loading and hand out the
    /// credentials.
    ///
    /// `None` while a previous submission is still in flight, and when either
    /// field is empty.
    pub fn begin(&mut self) -> Option<Submission> {
        if self.loading || self.email.is_empty() || self.password_is_empty() {
            return None;
        }
        self.loading = true;
        self.message = None;
        Some(Submission {
            mode: self.mode,
            credentials: Credentials {
                email: self.email.clone(),
                password: self.password.clone(),
            },
        })
    }

    /// Apply the provider's answer to a submission started with `begin`.
    ///
    /// Returns the session when the submission signed the user in.
    pub fn finish(&mut self, result: Result<Accepted, AuthError>) -> Option<Session> {
        self.loading = false;
        match result {
            Ok(accepted) => {
                info!(mode = ?self.mode, email = %self.email, "Auth form submitted");
                self.message = Some(AuthMessage::success(accepted.message));
                self.email.clear();
                self.password = SecretString::from(String::new());
                accepted.session
            }
            Err(e) => {
                warn!(mode = ?self.mode, error = %e, "Auth form rejected");
                self.message = Some(AuthMessage::error(e.to_string()));
                None
            }
        }
    }

    /// Submit the form in its current mode and wait for the answer.
    pub async fn submit(&mut self, auth: &dyn AuthService) -> Option<Session> {
        let submission = self.begin()?;
        let result = submission.send(auth).await;
        self.finish(result)
    }
}
