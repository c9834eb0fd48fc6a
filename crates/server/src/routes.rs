use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use shelflife_core::ScanReport;
use shelflife_scan::ScanPipeline;

/// Assemble the HTTP surface around one shared pipeline.
///
/// `POST /api/scan` takes raw image bytes and answers with the scan report;
/// `GET /api/health` is a liveness probe. Oversized bodies are cut off at
/// `max_body_bytes` by the limit layer (413).
pub fn router(pipeline: Arc<ScanPipeline>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/scan", post(scan))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

type ErrorReply = (StatusCode, Json<serde_json::Value>);

async fn scan(
    State(pipeline): State<Arc<ScanPipeline>>,
    body: Bytes,
) -> Result<Json<ScanReport>, ErrorReply> {
    if body.is_empty() {
        return Err(error_reply(StatusCode::BAD_REQUEST, "empty request body"));
    }

    let scan_id = Uuid::new_v4();
    tracing::info!(%scan_id, bytes = body.len(), "scan request");

    // The pipeline is synchronous and oracle-bound; keep it off the
    // async workers.
    let report = tokio::task::spawn_blocking(move || pipeline.scan(&body))
        .await
        .map_err(|e| {
            tracing::error!(%scan_id, error = %e, "scan task failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "scan failed")
        })?;

    tracing::info!(%scan_id, source = %report.expiry.source, "scan reply");
    Ok(Json(report))
}

fn error_reply(status: StatusCode, message: &str) -> ErrorReply {
    (status, Json(json!({ "error": message })))
}
