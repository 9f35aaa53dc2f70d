//! Integration tests for the REST endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use moisture_core::config::SimulationSettings;
use moisture_observer::router::build_router;
use moisture_observer::state::AppState;
use moisture_types::{DeviceId, NewDevice};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_state(max_history: usize) -> Arc<AppState> {
    Arc::new(AppState::from_settings(SimulationSettings {
        max_history,
        rng_seed: Some(5),
        ..SimulationSettings::default()
    }))
}

fn router(state: &Arc<AppState>) -> Router {
    build_router(Arc::clone(state), &["*".to_owned()])
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn seed_device(state: &Arc<AppState>, name: &str, moisture: f64) -> DeviceId {
    state
        .store
        .create(NewDevice {
            initial_moisture: moisture,
            ..NewDevice::named(name)
        })
        .await
        .id
}

#[tokio::test]
async fn test_health() {
    let state = make_state(2000);
    let response = router(&state).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert!((json["tick_seconds"].as_f64().unwrap() - 1.0).abs() < f64::EPSILON);
    assert!(json["now"].is_string());
}

#[tokio::test]
async fn test_create_device_returns_201_with_defaults() {
    let state = make_state(2000);
    let response = router(&state)
        .oneshot(send_json(
            "POST",
            "/devices",
            &json!({"name": "Monstera - Office", "plant_type": "monstera", "location": "Office", "initial_moisture": 58.0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Monstera - Office");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["watering"], false);
    assert_eq!(json["config"]["min_threshold"], 25.0);

    let id = json["id"].as_str().unwrap().to_owned();
    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/reading")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reading = body_to_json(response.into_body()).await;
    assert_eq!(reading["moisture"], 58.0);
    assert_eq!(reading["device_id"], id.as_str());
}

#[tokio::test]
async fn test_create_device_rejects_invalid_payload() {
    let state = make_state(2000);

    let response = router(&state)
        .oneshot(send_json("POST", "/devices", &json!({"name": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 422);

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            "/devices",
            &json!({"name": "Fern", "initial_moisture": 120.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(state.store.list().await.is_empty());
}

#[tokio::test]
async fn test_list_devices() {
    let state = make_state(2000);
    seed_device(&state, "A", 30.0).await;
    seed_device(&state, "B", 40.0).await;

    let response = router(&state).oneshot(get("/devices")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_device_not_found() {
    let state = make_state(2000);
    let path = format!("/devices/{}", DeviceId::new());

    let response = router(&state).oneshot(get(&path)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_unparsable_id_is_not_found() {
    let state = make_state(2000);
    let response = router(&state)
        .oneshot(get("/devices/not-a-device"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_device() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;

    let response = router(&state)
        .oneshot(send_json(
            "PATCH",
            &format!("/devices/{id}"),
            &json!({"location": "Hallway", "config": {"auto_mode": true}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Fern");
    assert_eq!(json["location"], "Hallway");
    assert_eq!(json["config"]["auto_mode"], true);
    assert_eq!(json["config"]["max_threshold"], 60.0);
}

#[tokio::test]
async fn test_delete_device() {
    let state = make_state(2000);
    let id = seed_device(&state, "Gone", 50.0).await;
    let path = format!("/devices/{id}");

    let response = router(&state)
        .oneshot(Request::delete(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router(&state)
        .oneshot(get(&format!("{path}/readings")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router(&state)
        .oneshot(Request::delete(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_watering_conflicts_when_offline() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            &format!("/devices/{id}/water"),
            &json!({"on": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["watering"], true);

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            &format!("/devices/{id}/status"),
            &json!({"status": "offline"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            &format!("/devices/{id}/water"),
            &json!({"on": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn test_bogus_status_is_unprocessable() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            &format!("/devices/{id}/status"),
            &json!({"status": "bogus"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(state.store.get(id).await.unwrap().status.as_str(), "ok");
}

#[tokio::test]
async fn test_missing_body_field_is_rejected() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;

    let response = router(&state)
        .oneshot(send_json(
            "POST",
            &format!("/devices/{id}/water"),
            &json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!state.store.get(id).await.unwrap().watering);
}

#[tokio::test]
async fn test_readings_limit_is_clamped() {
    let state = make_state(5);
    let id = seed_device(&state, "Fern", 50.0).await;
    for _ in 0..8 {
        state.store.tick(1.0, Utc::now()).await;
    }

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings?limit=1000")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await.as_array().unwrap().len(), 5);

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings?limit=2")))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await.as_array().unwrap().len(), 2);

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings?limit=-4")))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await.as_array().unwrap().len(), 1);

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings")))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_malformed_limit_is_bad_request() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings?limit=lots")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_readings_are_oldest_first() {
    let state = make_state(2000);
    let id = seed_device(&state, "Fern", 50.0).await;
    state.store.tick(1.0, Utc::now()).await;

    let response = router(&state)
        .oneshot(get(&format!("/devices/{id}/readings")))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let readings = json.as_array().unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0]["moisture"], 50.0);
    let first: DateTime<Utc> = readings[0]["timestamp"].as_str().unwrap().parse().unwrap();
    let second: DateTime<Utc> = readings[1]["timestamp"].as_str().unwrap().parse().unwrap();
    assert!(first <= second);
}
