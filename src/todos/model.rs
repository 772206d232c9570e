//! Todo items, their priority and the list view filter.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::table::timestamp;
use crate::store::{Record, RecordId};

/// Priority of a todo. Values outside the known set read as `Unspecified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    Unspecified,
}

impl Priority {
    /// Priority given to every new todo.
    pub const DEFAULT: Priority = Priority::Medium;

    /// Accent colour used for the item's left border.
    pub fn accent(&self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "yellow",
            Self::Low => "green",
            Self::Unspecified => "gray",
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::High => Some("high"),
            Self::Medium => Some("medium"),
            Self::Low => Some("low"),
            Self::Unspecified => None,
        }
    }
}

impl From<Option<String>> for Priority {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("high") => Self::High,
            Some("medium") => Self::Medium,
            Some("low") => Self::Low,
            _ => Self::Unspecified,
        }
    }
}

impl From<Priority> for Option<String> {
    fn from(priority: Priority) -> Self {
        priority.as_str().map(str::to_string)
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: RecordId,
    pub user_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(with = "timestamp")]
    pub inserted_at: DateTime<Utc>,
}

impl Record for Todo {
    const TABLE: &'static str = "todos";
}

/// Insert payload for a new todo.
#[derive(Debug, Clone, Serialize)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
}

impl NewTodo {
    pub fn new(user_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            user_id,
            text: text.into(),
            completed: false,
            priority: Priority::DEFAULT,
        }
    }
}

/// Patch flipping the completion flag.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionPatch {
    pub completed: bool,
}

/// Which todos the list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

impl FromStr for TodoFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown todo filter: {other}")),
        }
    }
}
