//! Queue endpoints.
//!
//! - `POST /api/insights/queue` — enqueue work for a report
//! - `GET /api/insights/queue` — state counts plus recent items
//! - `POST /api/insights/process-queue` — release stale claims, run one batch (bearer secret)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{insight_types, json_body, required_uuid};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::InsightType;
use crate::pipeline::queue::{BatchOutcome, QueueStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub report_id: Option<String>,
    pub insight_types: Option<Value>,
    pub priority: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub success: bool,
    pub message: &'static str,
    pub queue_id: Uuid,
    pub report_id: Uuid,
    pub insight_types: Vec<InsightType>,
    pub priority: i64,
}

pub async fn enqueue(
    State(ctx): State<ApiContext>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let req = json_body(payload)?;
    let report_id = required_uuid("reportId", req.report_id.as_deref())?;
    let types = insight_types(req.insight_types.as_ref())?;
    let priority = req.priority.unwrap_or(0);

    let item = ctx
        .with_db(move |core, conn| Ok(core.processor().enqueue(conn, &report_id, &types, priority)?))
        .await?;

    Ok(Json(EnqueueResponse {
        success: true,
        message: "Insights queued for processing",
        queue_id: item.id,
        report_id: item.report_id,
        insight_types: item.insight_types,
        priority: item.priority,
    }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: QueueStatus,
}

pub async fn status(State(ctx): State<ApiContext>) -> Result<Json<StatusResponse>, ApiError> {
    let status = ctx
        .with_db(|core, conn| Ok(core.processor().queue_status(conn)?))
        .await?;
    Ok(Json(StatusResponse { success: true, status }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessQuery {
    pub batch_size: Option<u32>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

pub async fn process(
    State(ctx): State<ApiContext>,
    Query(query): Query<ProcessQuery>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let outcome = ctx
        .with_db(move |core, conn| {
            let processor = core.processor();
            let batch_size = query.batch_size.unwrap_or(processor.config().batch_size);
            tracing::info!(batch_size, "Processing insights queue");
            processor.recover_stale_claims(conn, Utc::now())?;
            Ok(processor.process_batch(conn, batch_size)?)
        })
        .await?;

    Ok(Json(ProcessResponse { success: true, outcome }))
}
