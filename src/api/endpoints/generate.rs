//! `POST /api/insights/generate` — synchronous generation for one report.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{insight_types, json_body, required_uuid};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::InsightGenerationResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub report_id: Option<String>,
    pub insight_types: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub report_id: Uuid,
    pub results: Vec<InsightGenerationResult>,
    pub total_generated: usize,
    pub total_failed: usize,
}

pub async fn generate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let req = json_body(payload)?;
    let report_id = required_uuid("reportId", req.report_id.as_deref())?;
    let types = insight_types(req.insight_types.as_ref())?;

    let results = ctx
        .with_db(move |core, conn| Ok(core.generator().generate_insights_for_report(conn, &report_id, &types)?))
        .await?;

    let total_generated = results.iter().filter(|r| r.success).count();
    Ok(Json(GenerateResponse {
        success: true,
        report_id,
        total_failed: results.len() - total_generated,
        total_generated,
        results,
    }))
}
