use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use uuid::Uuid;

/// One logged action. Mirrors what an action-log row would carry.
#[derive(Clone, Debug, Serialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub action: String,
    pub status: String,
    pub target: String,
    pub detail: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub duration_ms: Option<i64>,
}

/// In-memory action log, passed explicitly into each operation instead of a
/// process-wide logger.
#[derive(Default)]
pub struct ActionLog {
    records: Mutex<Vec<ActionRecord>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: &str, status: &str, target: &str, detail: Option<&str>) -> Uuid {
        self.record_with_metadata(action, status, target, detail, None)
    }

    /// Log an action with metadata (context info).
    pub fn record_with_metadata(
        &self,
        action: &str,
        status: &str,
        target: &str,
        detail: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        println!("📝 [Recovery] Logged: {} - {} ({})", action, status, id);
        self.records.lock().unwrap().push(ActionRecord {
            id,
            action: action.to_string(),
            status: status.to_string(),
            target: target.to_string(),
            detail: detail.map(|d| d.to_string()),
            metadata,
            created_at: Utc::now(),
            duration_ms: None,
        });
        id
    }

    /// Mark a previously logged action finished, with its duration.
    pub fn complete(&self, id: Uuid, status: &str, duration_ms: i64, detail: Option<&str>) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|record| record.id == id) {
            record.status = status.to_string();
            record.duration_ms = Some(duration_ms);
            if let Some(detail) = detail {
                record.detail = Some(detail.to_string());
            }
        }
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.lock().unwrap().clone()
    }
}
