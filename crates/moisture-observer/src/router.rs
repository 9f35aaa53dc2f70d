//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// See [`handlers`] for the REST table; `GET /ws` streams reading batches.
/// `cors_allow_origins` containing `*` allows any origin.
pub fn build_router(state: Arc<AppState>, cors_allow_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::create_device),
        )
        .route(
            "/devices/{id}",
            get(handlers::get_device)
                .patch(handlers::update_device)
                .delete(handlers::delete_device),
        )
        .route("/devices/{id}/water", post(handlers::set_watering))
        .route("/devices/{id}/status", post(handlers::set_status))
        .route("/devices/{id}/reading", get(handlers::current_reading))
        .route("/devices/{id}/readings", get(handlers::list_readings))
        .route("/ws", get(ws::ws_readings))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_allow_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, "Ignoring unusable CORS origin: {e}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
