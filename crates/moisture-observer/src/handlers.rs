//! REST endpoint handlers.
//!
//! Every handler is a thin wrapper over one [`DeviceStore`] operation:
//! decode and validate the request, call the store, serialize the result.
//! Store errors propagate through [`ObserverError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness plus server time and tick interval |
//! | `GET` | `/devices` | List all devices |
//! | `POST` | `/devices` | Create a device |
//! | `GET` | `/devices/{id}` | Get one device |
//! | `PATCH` | `/devices/{id}` | Update name, plant type, location, or config |
//! | `DELETE` | `/devices/{id}` | Delete a device and its history |
//! | `POST` | `/devices/{id}/water` | Turn watering on or off |
//! | `POST` | `/devices/{id}/status` | Set `ok`, `fault`, or `offline` |
//! | `GET` | `/devices/{id}/reading` | Latest reading |
//! | `GET` | `/devices/{id}/readings` | Recent readings, oldest first |
//!
//! [`DeviceStore`]: moisture_core::store::DeviceStore

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use moisture_core::error::StoreError;
use moisture_types::{DeviceId, DevicePatch, NewDevice};
use tracing::debug;
use validator::Validate;

use crate::error::ObserverError;
use crate::state::AppState;

/// History length returned when `limit` is not given.
const DEFAULT_READINGS_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of `POST /devices/{id}/water`.
#[derive(Debug, serde::Deserialize)]
pub struct WaterCommand {
    /// Desired actuator state.
    pub on: bool,
}

/// Body of `POST /devices/{id}/status`.
#[derive(Debug, serde::Deserialize)]
pub struct StatusCommand {
    /// One of `ok`, `fault`, `offline`.
    pub status: String,
}

/// Query parameters for `GET /devices/{id}/readings`.
#[derive(Debug, serde::Deserialize)]
pub struct ReadingsQuery {
    /// Number of readings wanted (default 100).
    pub limit: Option<i64>,
}

/// Device ids are opaque to clients, so anything that does not parse is
/// simply an id that does not exist.
fn parse_device_id(raw: &str) -> Result<DeviceId, ObserverError> {
    raw.parse::<DeviceId>().map_err(|e| {
        debug!(id = raw, error = %e, "Unparsable device id");
        ObserverError::Store(StoreError::NotFound {
            device_id: raw.to_owned(),
        })
    })
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "now": Utc::now(),
        "tick_seconds": state.settings.tick_seconds,
    }))
}

// ---------------------------------------------------------------------------
// /devices
// ---------------------------------------------------------------------------

/// List every device.
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.list().await)
}

/// Create a device. Responds `201 Created` with the new device.
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewDevice>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let device = state.store.create(payload).await;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Fetch one device.
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    Ok(Json(state.store.get(id).await?))
}

/// Apply a partial update.
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<DevicePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    let Json(patch) = payload?;
    patch.validate()?;

    Ok(Json(state.store.update(id, patch).await?))
}

/// Delete a device. Responds `204 No Content`.
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Turn watering on or off. `409` if the device is offline.
pub async fn set_watering(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<WaterCommand>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    let Json(command) = payload?;
    Ok(Json(state.store.set_watering(id, command.on).await?))
}

/// Change the device status. `422` for an unknown status.
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusCommand>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    let Json(command) = payload?;
    Ok(Json(state.store.set_status(id, &command.status).await?))
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Latest reading for a device.
pub async fn current_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    Ok(Json(state.store.current(id).await?))
}

/// Up to `limit` most recent readings, oldest first. The limit is clamped
/// into `[1, max_history]`.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<ReadingsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_device_id(&id)?;
    let Query(query) = query?;

    let requested = query.limit.unwrap_or(DEFAULT_READINGS_LIMIT).max(1);
    let limit = state
        .settings
        .clamp_history_limit(usize::try_from(requested).unwrap_or(usize::MAX));

    Ok(Json(state.store.history(id, limit).await?))
}
