//! `RowStore` trait — the generic row API every panel persists through.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Server-assigned primary key.
pub type RecordId = i64;

/// Column equality filter (`column = value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Sort order for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }
}

/// Backend-agnostic row storage, addressed by table name.
///
/// Rows travel as JSON objects; `Table<T>` layers the typed view on top.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All rows of `table` matching `filter`, sorted by `order`.
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: &Order,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert one row. The server assigns `id` and `inserted_at`.
    async fn insert(&self, table: &str, row: Value) -> Result<(), StoreError>;

    /// Apply `patch` to the row with primary key `id`.
    async fn update(&self, table: &str, id: RecordId, patch: Value) -> Result<(), StoreError>;

    /// Delete the row with primary key `id`.
    async fn delete(&self, table: &str, id: RecordId) -> Result<(), StoreError>;
}
