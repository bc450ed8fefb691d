//! HTTP handlers

use super::models::{error_codes, ApiError, IdeationRequest};
use crate::metrics::METRICS;
use crate::stream::{EventFraming, EventSink, Orchestrator};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "research-ideation";

/// Events buffered between the pipeline and a slow client
const EVENT_BUFFER: usize = 32;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Framing used when the request does not pick one
    pub framing: EventFraming,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let framing = EventFraming::from(orchestrator.config().server.stream_format);
        Self {
            orchestrator,
            framing,
        }
    }
}

/// Start an ideation run and stream its progress
///
/// POST /ideation
pub async fn ideation(
    State(state): State<AppState>,
    payload: Result<Json<IdeationRequest>, JsonRejection>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected ideation body: {}", rejection);
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(error_codes::INVALID_BODY, rejection.body_text())),
        )
    })?;

    let Some(query) = request.query().map(str::to_string) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                error_codes::VALIDATION_ERROR,
                "Query cannot be empty",
            )),
        ));
    };

    let framing = request.format.map(EventFraming::from).unwrap_or(state.framing);
    info!("Ideation request accepted ({:?} framing)", framing);

    let (sink, rx) = EventSink::channel(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run(query, sink).await;
    });

    let events = ReceiverStream::new(rx)
        .map(move |event| Ok::<Event, Infallible>(framing.encode(&event)));
    let terminator = stream::iter(framing.terminator().map(Ok::<Event, Infallible>));

    let mut response = Sse::new(events.chain(terminator)).into_response();
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

/// GET /health
pub async fn health() -> Json<Value> {
    let now = chrono::Utc::now();
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": now.timestamp_millis() as f64 / 1000.0,
    }))
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "ideation": "POST /ideation",
            "health": "GET /health",
            "metrics": "GET /metrics",
        },
    }))
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        METRICS.export_prometheus(),
    )
}
