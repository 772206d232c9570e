//! Routine data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::table::timestamp;
use crate::store::{Record, RecordId};

/// A daily routine owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: RecordId,
    pub user_id: Uuid,
    pub name: String,
    /// Time of day, `HH:MM` or `HH:MM:SS`.
    pub time: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub inserted_at: DateTime<Utc>,
}

impl Record for Routine {
    const TABLE: &'static str = "routines";
}

impl Routine {
    /// Time of day without a zero seconds component (`07:00:00` → `07:00`).
    pub fn time_label(&self) -> &str {
        self.time.strip_suffix(":00").filter(|t| t.len() == 5).unwrap_or(&self.time)
    }
}

/// Insert payload for a new routine.
#[derive(Debug, Clone, Serialize)]
pub struct NewRoutine {
    pub user_id: Uuid,
    pub name: String,
    pub time: String,
    pub completed: bool,
}

impl NewRoutine {
    pub fn new(user_id: Uuid, name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            time: time.into(),
            completed: false,
        }
    }
}

/// Patch flipping the completion flag.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionPatch {
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine(time: &str) -> Routine {
        Routine {
            id: 1,
            user_id: Uuid::new_v4(),
            name: "Stretch".into(),
            time: time.into(),
            completed: false,
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn time_label_drops_zero_seconds() {
        assert_eq!(routine("07:00:00").time_label(), "07:00");
        assert_eq!(routine("07:00").time_label(), "07:00");
        assert_eq!(routine("07:30:15").time_label(), "07:30:15");
        assert_eq!(routine("19:00").time_label(), "19:00");
    }

    #[test]
    fn decodes_postgrest_row() {
        let row = serde_json::json!({
            "id": 7,
            "user_id": "0d7a4c1e-4f4c-4c39-9c55-0d1f2b8f6a11",
            "name": "Stretch",
            "time": "07:00:00",
            "completed": false,
            "inserted_at": "2025-07-10T06:59:01.123456+00:00"
        });
        let routine: Routine = serde_json::from_value(row).unwrap();
        assert_eq!(routine.id, 7);
        assert_eq!(routine.time_label(), "07:00");
        assert!(!routine.completed);
    }

    #[test]
    fn new_routine_starts_incomplete_without_server_columns() {
        let json = serde_json::to_value(NewRoutine::new(Uuid::new_v4(), "Read", "21:00")).unwrap();
        assert_eq!(json["completed"], false);
        assert!(json.get("id").is_none());
        assert!(json.get("inserted_at").is_none());
    }
}
