use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EngagementAction;

/// Fallback user for engagement calls that carry no user id.
pub const ANONYMOUS_USER_ID: Uuid = Uuid::nil();

/// One row per (user, insight); the latest action wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub insight_id: Uuid,
    pub action: EngagementAction,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Stored interest list. Entries are insight type names or industry ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
