//! Integration tests for the `/ws` live-readings socket.
//!
//! Unlike the REST tests these need a real listener: the router is served
//! on an ephemeral port and a `tokio-tungstenite` client connects to it.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use moisture_core::config::SimulationSettings;
use moisture_observer::router::build_router;
use moisture_observer::state::AppState;
use moisture_types::{DeviceId, NewDevice, ObserverMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

fn make_state() -> Arc<AppState> {
    Arc::new(AppState::from_settings(SimulationSettings {
        max_history: 50,
        rng_seed: Some(9),
        ..SimulationSettings::default()
    }))
}

async fn serve(state: &Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::clone(state), &["*".to_owned()]);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn seed_device(state: &Arc<AppState>, name: &str) -> DeviceId {
    state.store.create(NewDevice::named(name)).await.id
}

/// Next text frame, decoded. Control frames are skipped.
async fn next_batch(client: &mut Client) -> ObserverMessage {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for_observers(state: &Arc<AppState>, expected: usize) {
    let settled = tokio::time::timeout(FRAME_TIMEOUT, async {
        while state.hub.observer_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        settled.is_ok(),
        "observer count stuck at {}, wanted {expected}",
        state.hub.observer_count().await
    );
}

#[tokio::test]
async fn session_gets_catch_up_then_tick_and_unregisters_on_close() {
    let state = make_state();
    let id = seed_device(&state, "Monstera").await;
    let addr = serve(&state).await;

    let mut client = connect(addr).await;

    let catch_up = next_batch(&mut client).await;
    assert_eq!(catch_up.readings().len(), 1);
    let first = catch_up.readings().first().unwrap().clone();
    assert_eq!(first.device_id, id);
    assert_eq!(state.hub.observer_count().await, 1);

    let batch = state.store.tick_now(1.0).await;
    assert_eq!(state.hub.broadcast(batch).await, 1);

    let tick = next_batch(&mut client).await;
    assert_eq!(tick.readings().len(), 1);
    let reading = tick.readings().first().unwrap();
    assert_eq!(reading.device_id, id);
    assert!(reading.timestamp >= first.timestamp);

    client.close(None).await.unwrap();
    while let Ok(Some(Ok(_))) = tokio::time::timeout(FRAME_TIMEOUT, client.next()).await {}

    wait_for_observers(&state, 0).await;
}

#[tokio::test]
async fn catch_up_on_empty_store_is_an_empty_batch() {
    let state = make_state();
    let addr = serve(&state).await;

    let mut client = connect(addr).await;
    let catch_up = next_batch(&mut client).await;
    assert!(catch_up.readings().is_empty());
}

#[tokio::test]
async fn every_connected_client_receives_the_tick() {
    let state = make_state();
    seed_device(&state, "Fig").await;
    seed_device(&state, "Cactus").await;
    let addr = serve(&state).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    assert_eq!(next_batch(&mut a).await.readings().len(), 2);
    assert_eq!(next_batch(&mut b).await.readings().len(), 2);

    let batch = state.store.tick_now(1.0).await;
    assert_eq!(state.hub.broadcast(batch).await, 2);

    assert_eq!(next_batch(&mut a).await.readings().len(), 2);
    assert_eq!(next_batch(&mut b).await.readings().len(), 2);

    drop(a);
    wait_for_observers(&state, 1).await;
}

#[tokio::test]
async fn client_ping_is_answered() {
    let state = make_state();
    let addr = serve(&state).await;

    let mut client = connect(addr).await;
    next_batch(&mut client).await;

    client.send(Message::Ping(vec![7, 7])).await.unwrap();
    let pong = loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Pong(data) = frame {
            break data;
        }
    };
    assert_eq!(pong, vec![7, 7]);
}
