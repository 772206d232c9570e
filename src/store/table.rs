//! Typed access to one table of a `RowStore`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::traits::{Filter, Order, RecordId, RowStore};
use crate::error::StoreError;

/// Column holding the owner's user id.
pub const OWNER_COLUMN: &str = "user_id";
/// Column holding the server-assigned insertion timestamp.
pub const INSERTED_AT_COLUMN: &str = "inserted_at";

/// A row type stored in its own table.
pub trait Record: DeserializeOwned + Send {
    const TABLE: &'static str;
}

/// Typed handle on the table holding `T`.
pub struct Table<T> {
    store: Arc<dyn RowStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Table<T> {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Every record owned by `user_id`, oldest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<T>, StoreError> {
        let rows = self
            .store
            .select(
                T::TABLE,
                &Filter::eq(OWNER_COLUMN, user_id),
                &Order::asc(INSERTED_AT_COLUMN),
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| StoreError::Decode {
                    table: T::TABLE.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    pub async fn insert<N: Serialize + Sync>(&self, row: &N) -> Result<(), StoreError> {
        let row = self.encode(row)?;
        self.store.insert(T::TABLE, row).await
    }

    pub async fn update<P: Serialize + Sync>(
        &self,
        id: RecordId,
        patch: &P,
    ) -> Result<(), StoreError> {
        let patch = self.encode(patch)?;
        self.store.update(T::TABLE, id, patch).await
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.store.delete(T::TABLE, id).await
    }

    fn encode<V: Serialize>(&self, value: &V) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(value).map_err(|e| StoreError::Decode {
            table: T::TABLE.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Lenient `inserted_at` parsing: RFC 3339, or an offset-less timestamp read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
