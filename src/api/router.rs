//! API router.
//!
//! Routes are nested under `/api/`. Processing triggers sit behind the
//! bearer-secret middleware; the rest are open.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
fn build_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route("/insights/process-queue", post(endpoints::queue::process))
        .route("/insights/generate", post(endpoints::generate::generate))
        .route(
            "/reports/:id/extraction/refresh",
            post(endpoints::reports::refresh_extraction),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_cron_secret))
        .layer(axum::Extension(ctx.clone()));

    let open = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/insights/queue",
            get(endpoints::queue::status).post(endpoints::queue::enqueue),
        )
        .route("/insights/feed", get(endpoints::feed::list))
        .route("/insights/engagement", post(endpoints::engagement::record))
        .route(
            "/insights/preferences",
            get(endpoints::preferences::get).post(endpoints::preferences::update),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", open)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
