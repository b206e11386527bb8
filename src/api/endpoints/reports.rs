//! `POST /api/reports/:id/extraction/refresh` — discard cached text and
//! extract again.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::ExtractionMethod;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub report_id: Uuid,
    pub extraction_id: Uuid,
    pub page_count: u32,
    pub method: ExtractionMethod,
    pub text_length: usize,
}

pub async fn refresh_extraction(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let report_id = Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest("Report id must be a UUID".into()))?;

    let extraction = ctx
        .with_db(move |core, conn| Ok(core.generator().extraction().refresh(conn, &report_id)?))
        .await?;

    Ok(Json(RefreshResponse {
        success: true,
        report_id,
        extraction_id: extraction.id,
        page_count: extraction.page_count,
        method: extraction.method,
        text_length: extraction.text.chars().count(),
    }))
}
