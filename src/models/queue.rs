use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::{InsightType, QueueState};

/// Deferred generation work for one report.
///
/// There is no status column: `(started_at, completed_at, retry_count,
/// max_retries)` decide the visible state, see [`QueueItem::state`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: Uuid,
    pub report_id: Uuid,
    pub insight_types: Vec<InsightType>,
    pub priority: i64,
    pub scheduled_for: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn state(&self) -> QueueState {
        if self.completed_at.is_some() {
            QueueState::Completed
        } else if self.retry_count >= self.max_retries {
            QueueState::Failed
        } else if self.started_at.is_some() {
            QueueState::Processing
        } else {
            QueueState::Pending
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Queue item with denormalized display fields for status listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItemSummary {
    #[serde(flatten)]
    pub item: QueueItem,
    pub state: QueueState,
    pub report_type: String,
    pub fiscal_year: Option<i32>,
    pub company_name: String,
}
