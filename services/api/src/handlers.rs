//! Axum Handlers for the REST API
//!
//! Event ingress, health, and the speech provider relay. It uses `utoipa`
//! doc comments to generate OpenAPI documentation.

use animus_core::{AnimMessage, Event};
use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{ErrorResponse, EventPayload, HealthResponse, IngressResponse},
    relay::{RealtimeRelay, RelayError},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn bad_gateway(err: RelayError) -> ApiError {
    warn!(error = %err, "Speech provider request failed");
    ApiError::BadGateway(err.to_string())
}

fn relay(state: &AppState) -> Result<&Arc<dyn RealtimeRelay>, ApiError> {
    state.relay.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Realtime relay is not configured".to_string())
    })
}

/// Submit a semantic event and publish the resulting command batch.
///
/// The body is read leniently: anything that is not a JSON object is
/// treated as an empty event, which produces an `idle` batch.
#[utoipa::path(
    post,
    path = "/events",
    request_body = EventPayload,
    responses(
        (status = 200, description = "Batch generated and published", body = IngressResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn submit_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngressResponse>, ApiError> {
    let event = Event::from_bytes(&body);
    let batch = state.generator.generate(&event).stamp(Utc::now());
    let anim = AnimMessage::new(batch, event);

    let report = state.fanout.publish(anim.to_json()?).await?;
    info!(
        source = %anim.batch.provenance.source_event_id,
        commands = anim.batch.commands.len(),
        delivered = report.delivered,
        dropped = report.dropped,
        "Published animation batch"
    );

    Ok(Json(IngressResponse {
        anim,
        delivered: report.delivered,
        dropped: report.dropped,
    }))
}

/// Liveness probe with the number of connected viewers.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn healthz(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let viewers = state.fanout.viewer_count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        viewers,
    }))
}

/// Mint an ephemeral speech session with the provider.
#[utoipa::path(
    post,
    path = "/realtime/session",
    responses(
        (status = 200, description = "Provider session", body = serde_json::Value),
        (status = 502, description = "Provider unreachable or rejected the request", body = ErrorResponse),
        (status = 503, description = "Relay not configured", body = ErrorResponse)
    )
)]
pub async fn realtime_session(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let session = relay(&state)?.create_session().await.map_err(bad_gateway)?;
    Ok(Json(session))
}

/// Forward a WebRTC SDP offer to the provider and return its answer.
#[utoipa::path(
    post,
    path = "/realtime/offer",
    request_body(content = String, content_type = "application/sdp"),
    responses(
        (status = 200, description = "SDP answer", body = String, content_type = "application/sdp"),
        (status = 400, description = "Empty offer", body = ErrorResponse),
        (status = 502, description = "Provider unreachable or rejected the offer", body = ErrorResponse),
        (status = 503, description = "Relay not configured", body = ErrorResponse)
    )
)]
pub async fn realtime_offer(
    State(state): State<Arc<AppState>>,
    offer: String,
) -> Result<Response, ApiError> {
    let relay = relay(&state)?;
    if offer.trim().is_empty() {
        return Err(ApiError::BadRequest("SDP offer body is empty".to_string()));
    }
    let answer = relay.exchange_offer(&offer).await.map_err(bad_gateway)?;
    Ok(([(header::CONTENT_TYPE, "application/sdp")], answer).into_response())
}
