//! Interest list used to personalize the feed.
//!
//! - `GET /api/insights/preferences?userId=`
//! - `POST /api/insights/preferences` with `{userId, interests}`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_body, required_uuid};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub user_id: Option<String>,
    pub interests: Option<Value>,
}

#[derive(Serialize)]
pub struct PreferencesResponse {
    pub success: bool,
    pub interests: Vec<String>,
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Query(query): Query<PreferencesQuery>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let user_id = required_uuid("userId", query.user_id.as_deref())?;
    let interests = ctx
        .with_db(move |_, conn| Ok(db::get_user_interests(conn, &user_id)?))
        .await?;
    Ok(Json(PreferencesResponse { success: true, interests }))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let req = json_body(payload)?;
    let user_id = required_uuid("userId", req.user_id.as_deref())?;
    let interests = parse_interests(req.interests.as_ref())?;

    let profile = ctx
        .with_db(move |_, conn| Ok(db::set_user_interests(conn, &user_id, &interests)?))
        .await?;
    Ok(Json(PreferencesResponse {
        success: true,
        interests: profile.interests,
    }))
}

fn parse_interests(value: Option<&Value>) -> Result<Vec<String>, ApiError> {
    let invalid = || ApiError::BadRequest("Interests must be an array of strings".into());
    value
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}
