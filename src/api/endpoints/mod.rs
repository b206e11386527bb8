//! API endpoint handlers, one module per resource.

pub mod engagement;
pub mod feed;
pub mod generate;
pub mod health;
pub mod preferences;
pub mod queue;
pub mod reports;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::InsightType;

/// Unwrap a JSON body, turning extractor rejections into 400s.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub(crate) fn required_uuid(field: &str, value: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {field}")))?;
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("{field} must be a UUID")))
}

/// Non-empty array of known insight type names.
pub(crate) fn insight_types(value: Option<&Value>) -> Result<Vec<InsightType>, ApiError> {
    let items = value
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::BadRequest("insightTypes must be a non-empty array".into()))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse::<InsightType>().ok())
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown insight type: {item}")))
        })
        .collect()
}
