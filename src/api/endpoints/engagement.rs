//! `POST /api/insights/engagement` — best-effort engagement telemetry.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{json_body, required_uuid};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{EngagementAction, ANONYMOUS_USER_ID};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRequest {
    pub insight_id: Option<String>,
    pub action: Option<String>,
    pub duration_seconds: Option<i64>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct EngagementResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn record(
    State(ctx): State<ApiContext>,
    payload: Result<Json<EngagementRequest>, JsonRejection>,
) -> Result<Json<EngagementResponse>, ApiError> {
    let req = json_body(payload)?;
    let insight_id = required_uuid("insightId", req.insight_id.as_deref())?;
    let action: EngagementAction = req
        .action
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing required field: action".into()))?
        .parse()
        .map_err(|_| ApiError::BadRequest("action must be one of view, like, share, bookmark, skip".into()))?;
    let user_id = match req.user_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => required_uuid("userId", Some(raw))?,
        _ => ANONYMOUS_USER_ID,
    };
    let duration = req.duration_seconds;

    // Telemetry never fails the caller.
    let outcome = ctx
        .with_db(move |_, conn| Ok(db::upsert_engagement(conn, &user_id, &insight_id, action, duration)?))
        .await;
    if let Err(e) = outcome {
        tracing::warn!(insight_id = %insight_id, error = %e, "Engagement not recorded");
    }

    Ok(Json(EngagementResponse {
        success: true,
        message: "Engagement recorded",
    }))
}
