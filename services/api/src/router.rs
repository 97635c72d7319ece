//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application:
//! event ingress, the `/anim` WebSocket stream, the speech relay, OpenAPI
//! documentation, and static files for everything else.

use crate::{
    handlers,
    models::{ErrorResponse, EventPayload, HealthResponse, IngressResponse},
    state::AppState,
    ws::{PublishReport, anim_handler},
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::submit_event,
        handlers::healthz,
        handlers::realtime_session,
        handlers::realtime_offer,
    ),
    components(
        schemas(EventPayload, IngressResponse, HealthResponse, PublishReport, ErrorResponse)
    ),
    tags(
        (name = "Animus API", description = "Event ingress and animation command fanout for avatar viewers")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let site = ServeDir::new(&app_state.config.site_dir);

    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/events", post(handlers::submit_event))
        .route("/healthz", get(handlers::healthz))
        .route("/realtime/session", post(handlers::realtime_session))
        .route("/realtime/offer", post(handlers::realtime_offer))
        .route("/anim", get(anim_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .fallback_service(site)
}
