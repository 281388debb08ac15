// HTTP routes

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chunk_repo::ChunkRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) chunk_repo: Arc<ChunkRepo>,
}

pub fn app(chunk_repo: Arc<ChunkRepo>) -> Router {
    let state = AppState { chunk_repo };
    Router::new()
        .route("/", get(|| async { "insightd: deployment insights" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/insights/{application_id}/{kind}/{step}",
            get(http::insights_handler),
        ) // GET /api/insights/:app/:kind/:step?from=&to=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
