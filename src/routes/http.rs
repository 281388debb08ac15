// GET handlers: version, insights

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use crate::models::{DataPoint, MetricKind, Step};
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// Optional bucket range; `from` inclusive, `to` exclusive.
#[derive(Debug, Deserialize)]
pub(super) struct RangeQuery {
    from: Option<i64>,
    to: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsightsResponse {
    application_id: String,
    kind: MetricKind,
    step: Step,
    accumulated_to: i64,
    data_points: Vec<DataPoint>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

/// GET /api/insights/{application_id}/{kind}/{step}: stored buckets of one chunk and step.
/// A chunk that was never collected yields an empty list.
pub(super) async fn insights_handler(
    State(state): State<AppState>,
    Path((application_id, kind, step)): Path<(String, String, String)>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let kind: MetricKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{}", e)),
    };
    let step: Step = match step.parse() {
        Ok(s) => s,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{}", e)),
    };

    let chunk = match state.chunk_repo.load(&application_id, kind).await {
        Ok(c) => c,
        Err(e) => {
            warn!(application_id = %application_id, kind = %kind, error = %e, "load chunk failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e));
        }
    };

    let from = range.from.unwrap_or(i64::MIN);
    let to = range.to.unwrap_or(i64::MAX);
    let (accumulated_to, data_points) = match chunk {
        Some(chunk) => {
            let points = chunk
                .points(step)
                .iter()
                .filter(|p| p.timestamp() >= from && p.timestamp() < to)
                .cloned()
                .collect();
            (chunk.accumulated_to, points)
        }
        None => (0, Vec::new()),
    };

    axum::Json(InsightsResponse {
        application_id,
        kind,
        step,
        accumulated_to,
        data_points,
    })
    .into_response()
}
