//! In-memory backend holding auth and rows in one process-local store.
//!
//! Behaves like a Supabase project with row-level security on every table:
//! rows are only visible to, and writable by, their owner. Used by the tests
//! and by `HUB_BACKEND=memory` for offline use.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::table::{INSERTED_AT_COLUMN, OWNER_COLUMN};
use super::traits::{Filter, Order, RecordId, RowStore};
use crate::auth::{AuthEvent, AuthService, Credentials, Session, SignUpOutcome, User};
use crate::error::{AuthError, StoreError};

const DEFAULT_BROADCAST_CAPACITY: usize = 64;
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: User,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Value>>,
    next_id: RecordId,
    last_inserted_at: Option<DateTime<Utc>>,
    fail_next: Option<String>,
    requests: usize,
}

/// Process-local auth provider and row store.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    events: broadcast::Sender<AuthEvent>,
    auto_confirm: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A backend where new accounts must confirm their email before signing in.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
            auto_confirm: false,
        }
    }

    /// A backend where sign-up signs the new account in immediately.
    pub fn with_auto_confirm() -> Self {
        Self {
            auto_confirm: true,
            ..Self::new()
        }
    }

    /// Create a confirmed account directly.
    pub fn register(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            username: None,
        };
        self.lock().accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            confirmed: true,
        });
        user
    }

    /// Mark an account's email as confirmed. Returns false if unknown.
    pub fn confirm(&self, email: &str) -> bool {
        let mut inner = self.lock();
        match inner
            .accounts
            .iter_mut()
            .find(|a| a.user.email.as_deref() == Some(email))
        {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Make the next row request fail with `message`.
    pub fn fail_next_request(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Number of row requests served so far (including failed ones).
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    /// Raw rows of `table`, in insertion order, regardless of owner.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_session(user: &User) -> Session {
        Session {
            user: user.clone(),
            access_token: SecretString::from(format!("memory-{}", Uuid::new_v4())),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }

    fn announce(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Shared preamble for row requests: count, injected failure, caller id.
    fn begin_request(inner: &mut Inner, table: &str) -> Result<Uuid, StoreError> {
        inner.requests += 1;
        if let Some(message) = inner.fail_next.take() {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                status: 500,
                message,
            });
        }
        inner
            .session
            .as_ref()
            .map(|s| s.user.id)
            .ok_or(StoreError::NotAuthenticated)
    }
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
    match (a.get(column), b.get(column)) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn owned_by(row: &Value, user_id: Uuid) -> bool {
    column_text(row, OWNER_COLUMN).as_deref() == Some(user_id.to_string().as_str())
}

fn row_id(row: &Value) -> Option<RecordId> {
    row.get("id").and_then(Value::as_i64)
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        let email = credentials.email.trim();
        let password = credentials.password.expose_secret();

        if !email.contains('@') {
            return Err(AuthError::Rejected {
                message: "Unable to validate email address: invalid format".into(),
            });
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected {
                message: format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            });
        }

        let mut inner = self.lock();
        if inner
            .accounts
            .iter()
            .any(|a| a.user.email.as_deref() == Some(email))
        {
            return Err(AuthError::Rejected {
                message: "User already registered".into(),
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            username: None,
        };
        inner.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            confirmed: self.auto_confirm,
        });
        info!(user_id = %user.id, "Account registered");

        if self.auto_confirm {
            let session = Self::open_session(&user);
            inner.session = Some(session.clone());
            drop(inner);
            self.announce(AuthEvent::SignedIn(session.clone()));
            Ok(SignUpOutcome::SignedIn(session))
        } else {
            Ok(SignUpOutcome::ConfirmationPending(user))
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .iter()
            .find(|a| {
                a.user.email.as_deref() == Some(credentials.email.trim())
                    && a.password == credentials.password.expose_secret()
            })
            .ok_or_else(|| AuthError::Rejected {
                message: "Invalid login credentials".into(),
            })?;

        if !account.confirmed {
            return Err(AuthError::Rejected {
                message: "Email not confirmed".into(),
            });
        }

        let session = Self::open_session(&account.user);
        inner.session = Some(session.clone());
        drop(inner);

        info!(user_id = %session.user.id, "Signed in");
        self.announce(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.lock().session.take();
        if let Some(session) = previous {
            info!(user_id = %session.user.id, "Signed out");
        }
        self.announce(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: &Order,
    ) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.lock();
        let caller = Self::begin_request(&mut inner, table)?;

        let mut rows: Vec<Value> = inner
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| owned_by(row, caller))
                    .filter(|row| {
                        column_text(row, &filter.column).as_deref() == Some(filter.value.as_str())
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort keeps insertion order among equal keys.
        rows.sort_by(|a, b| {
            let ord = compare_column(a, b, &order.column);
            if order.ascending { ord } else { ord.reverse() }
        });

        debug!(table, rows = rows.len(), "Memory select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let caller = Self::begin_request(&mut inner, table)?;

        let Value::Object(mut fields) = row else {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                status: 400,
                message: "Expected a JSON object row".into(),
            });
        };
        if fields.get(OWNER_COLUMN).and_then(Value::as_str) != Some(caller.to_string().as_str()) {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                status: 403,
                message: format!("new row violates row-level security policy for table \"{table}\""),
            });
        }

        inner.next_id += 1;
        let id = inner.next_id;

        let mut inserted_at = Utc::now();
        if let Some(last) = inner.last_inserted_at {
            if inserted_at <= last {
                inserted_at = last + Duration::microseconds(1);
            }
        }
        inner.last_inserted_at = Some(inserted_at);

        fields.insert("id".into(), Value::from(id));
        fields.insert(
            INSERTED_AT_COLUMN.into(),
            Value::String(inserted_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
        );
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Value::Object(fields));

        debug!(table, id, "Memory insert");
        Ok(())
    }

    async fn update(&self, table: &str, id: RecordId, patch: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let caller = Self::begin_request(&mut inner, table)?;

        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                status: 400,
                message: "Expected a JSON object patch".into(),
            });
        };

        if let Some(row) = inner
            .tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row_id(row) == Some(id) && owned_by(row, caller))
            })
            .and_then(Value::as_object_mut)
        {
            for (key, value) in patch {
                if key != "id" && key != INSERTED_AT_COLUMN && key != OWNER_COLUMN {
                    row.insert(key, value);
                }
            }
        }

        debug!(table, id, "Memory update");
        Ok(())
    }

    async fn delete(&self, table: &str, id: RecordId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let caller = Self::begin_request(&mut inner, table)?;

        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|row| !(row_id(row) == Some(id) && owned_by(row, caller)));
        }

        debug!(table, id, "Memory delete");
        Ok(())
    }
}
