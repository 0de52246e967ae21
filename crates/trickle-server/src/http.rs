//! Axum NDJSON transport
//!
//! One long-lived response per exchange: the client POSTs a request and reads
//! newline-delimited event records until the terminal one, after which the
//! body closes. The producer task runs independently of the response body
//! consumer; a slow or absent reader is bounded by the channel capacity and
//! never stalls model generation beyond it.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

use trickle_core::{SchemaRegistry, StreamRequest};

use crate::producer::{ProducerConfig, ProducerLoop};
use crate::source::GenerationSource;

/// Backlog between the producer task and the response body
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared server state: the generation backend, the completeness registry,
/// and producer tuning
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn GenerationSource>,
    registry: Arc<SchemaRegistry>,
    config: ProducerConfig,
}

impl AppState {
    /// State with default producer tuning
    pub fn new(source: Arc<dyn GenerationSource>, registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(source, registry, ProducerConfig::default())
    }

    /// State with explicit producer tuning
    pub fn with_config(
        source: Arc<dyn GenerationSource>,
        registry: Arc<SchemaRegistry>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            source,
            registry,
            config,
        }
    }
}

/// Build the streaming router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/stream", post(stream_handler))
        .with_state(state)
}

/// One exchange per request: spawn the producer, stream its events out
async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Response {
    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let chunks = state.source.stream(&request);
    let producer = ProducerLoop::with_config(state.registry.clone(), state.config);
    tokio::spawn(async move {
        producer.run(request, chunks, tx).await;
    });

    let body = Body::from_stream(async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            match event.encode() {
                Ok(line) => yield Ok::<_, Infallible>(Bytes::from(line)),
                Err(err) => warn!(%err, "dropping unencodable event"),
            }
            // The transport closes exactly once, after the terminal event
            if terminal {
                break;
            }
        }
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response()
}
