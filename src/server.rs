//! HTTP surface: `/api/health`, `/api/analysis/chat` and `/api/analysis/chat-stream`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::analysis::{ChunkStream, FinancialAnalyst};
use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::ingestion::{parse_body, RawAnalysisPayload};

pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
pub const DONE_SENTINEL: &str = "[DONE]";

const INVALID_QUESTION_MESSAGE: &str = "Invalid question";
const INVALID_DATA_MESSAGE: &str = "Invalid financial data";
const ANALYSIS_FAILED_MESSAGE: &str = "Failed to process analysis";
const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    analyst: Arc<FinancialAnalyst>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

pub fn router(analyst: FinancialAnalyst) -> Router {
    let state = AppState {
        analyst: Arc::new(analyst),
    };

    let analysis_routes = Router::new()
        .route("/chat", post(chat))
        .route("/chat-stream", post(chat_stream));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/analysis", analysis_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: &Config, analyst: FinancialAnalyst) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, router(analyst))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// POST /api/analysis/chat
///
/// Shape errors are the caller's fault and get a 400. Records that fail to
/// normalize are reported like any other analysis failure.
async fn chat(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let payload = match read_body("/chat", body).and_then(|body| {
        parse_body(&body)
            .and_then(RawAnalysisPayload::from_body)
            .map_err(|e| reject("/chat", e))
    }) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    let request = match payload.normalize() {
        Ok(request) => request,
        Err(e) => {
            warn!("/chat rejected records: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED_MESSAGE);
        }
    };

    info!(
        "/chat: {} accounts, {} transactions, {} goals",
        request.accounts.len(),
        request.transactions.len(),
        request.goals.len()
    );

    match state.analyst.analyze(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED_MESSAGE),
    }
}

/// POST /api/analysis/chat-stream
///
/// Shape errors get a plain 400. Past that point the response is an event
/// stream and every outcome, record parse failures included, is an event.
async fn chat_stream(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let payload = match read_body("/chat-stream", body).and_then(|body| {
        parse_body(&body)
            .and_then(RawAnalysisPayload::from_body)
            .map_err(|e| reject("/chat-stream", e))
    }) {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    let chunks: ChunkStream = match payload.normalize() {
        Ok(request) => {
            info!(
                "/chat-stream: {} accounts, {} transactions, {} goals",
                request.accounts.len(),
                request.transactions.len(),
                request.goals.len()
            );
            state.analyst.chunks(&request)
        }
        Err(e) => {
            warn!("/chat-stream rejected records: {}", e);
            stream::once(async { Err::<String, _>(AnalysisError::AnalysisFailed) }).boxed()
        }
    };

    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(relay_events(chunks)),
    )
        .into_response()
}

/// One `{chunk}` event per fragment, then `[DONE]`. A failure yields a single
/// `{error}` event and ends the stream without the sentinel.
fn relay_events(chunks: ChunkStream) -> BoxStream<'static, std::result::Result<Event, Infallible>> {
    stream::unfold(Some(chunks), |state| async move {
        let mut chunks = match state {
            Some(chunks) => chunks,
            None => return None,
        };

        let event = match chunks.next().await {
            Some(Ok(chunk)) => {
                let event = Event::default().data(json!({ "chunk": chunk }).to_string());
                return Some((Ok::<Event, Infallible>(event), Some(chunks)));
            }
            Some(Err(_)) => {
                Event::default().data(json!({ "error": ANALYSIS_FAILED_MESSAGE }).to_string())
            }
            None => Event::default().data(DONE_SENTINEL),
        };

        Some((Ok(event), None))
    })
    .boxed()
}

/// Body-limit and read failures keep the `{ error }` shape.
fn read_body(
    route: &str,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Bytes, Response> {
    body.map_err(|rejection| {
        warn!("{} could not read body: {}", route, rejection);
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            error_response(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE_MESSAGE)
        } else {
            error_response(StatusCode::BAD_REQUEST, INVALID_DATA_MESSAGE)
        }
    })
}

fn reject(route: &str, err: AnalysisError) -> Response {
    warn!("{} rejected request: {}", route, err);
    match err {
        AnalysisError::InvalidQuestion => {
            error_response(StatusCode::BAD_REQUEST, INVALID_QUESTION_MESSAGE)
        }
        e if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, INVALID_DATA_MESSAGE),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED_MESSAGE),
    }
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}
