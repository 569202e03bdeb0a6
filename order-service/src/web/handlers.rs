//! HTTP endpoint handlers.
//!
//! Handlers translate publish outcomes into the HTTP contract: health probes
//! answer JSON with a `detail` field on failure, order intake answers plain
//! text. Each accepted request publishes at most one message.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::queue::{PublishError, Publisher};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub publisher: Publisher,
}

impl AppState {
    pub fn new(config: Config, publisher: Publisher) -> Self {
        Self {
            config: Arc::new(config),
            publisher,
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/healthz/rabbitmq", get(rabbitmq_healthz))
        .route("/orders", post(submit_order))
        .with_state(state)
}

// =============================================================================
// Health Probes
// =============================================================================

/// Liveness response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe. Always succeeds; says nothing about the broker.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness response for the broker probe.
#[derive(Serialize)]
pub struct BrokerHealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'static str>,
}

/// Readiness probe performing a `ping` round trip through the broker.
///
/// Publishes the literal bytes `ping` to the configured queue; consumers must
/// tolerate these probe messages.
pub async fn rabbitmq_healthz(State(state): State<AppState>) -> Response {
    let queue = &state.config.order_queue;

    match state.publisher.publish(queue, b"ping").await {
        Ok(()) => (
            StatusCode::OK,
            Json(BrokerHealthResponse {
                status: "ok",
                queue: Some(queue.clone()),
                detail: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "rabbitmq_probe_failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(BrokerHealthResponse {
                    status: "error",
                    queue: None,
                    detail: Some(probe_detail(&e)),
                }),
            )
                .into_response()
        }
    }
}

/// Probe `detail` strings; orchestrators match on these, keep them stable.
fn probe_detail(err: &PublishError) -> &'static str {
    match err {
        PublishError::Connect(_) => "connect failed",
        PublishError::Channel(_) => "channel failed",
        PublishError::Declare(_) | PublishError::Publish(_) | PublishError::Nacked => {
            "publish failed"
        }
        PublishError::Timeout(_) => "timed out",
    }
}

// =============================================================================
// Order Intake
// =============================================================================

/// Order submission endpoint.
///
/// The body is an opaque JSON document; no schema is enforced. Its
/// serialization is forwarded verbatim as the message payload.
pub async fn submit_order(State(state): State<AppState>, Json(order): Json<Value>) -> Response {
    let payload = match serde_json::to_vec(&order) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "order_serialize_failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error encoding order").into_response();
        }
    };

    let queue = &state.config.order_queue;

    match state.publisher.publish(queue, &payload).await {
        Ok(()) => {
            info!(queue = %queue, body_length = payload.len(), "order_enqueued");
            (StatusCode::OK, "Order received").into_response()
        }
        Err(e) => {
            error!(error = %e, "order_publish_failed");
            (StatusCode::INTERNAL_SERVER_ERROR, order_failure_body(&e)).into_response()
        }
    }
}

/// Plain-text bodies for failed order submissions, one per failing stage.
fn order_failure_body(err: &PublishError) -> &'static str {
    match err {
        PublishError::Connect(_) => "Error connecting to RabbitMQ",
        PublishError::Channel(_) => "Error creating channel",
        PublishError::Declare(_) | PublishError::Publish(_) | PublishError::Nacked => {
            "Error publishing order"
        }
        PublishError::Timeout(_) => "Timed out publishing order",
    }
}
