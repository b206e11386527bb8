//! `GET /api/insights/feed` — paginated completed insights, newest first.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::required_uuid;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{self, FeedFilter};
use crate::models::FeedPage;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: FeedPage,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let user_id = query
        .user_id
        .as_deref()
        .map(|raw| required_uuid("userId", Some(raw)))
        .transpose()?;

    let page = ctx
        .with_db(move |_, conn| {
            let filter = match user_id {
                Some(id) => FeedFilter::from_interests(&db::get_user_interests(conn, &id)?),
                None => FeedFilter::default(),
            };
            Ok(db::list_feed(conn, &filter, limit, offset)?)
        })
        .await?;

    Ok(Json(FeedResponse { success: true, page }))
}
