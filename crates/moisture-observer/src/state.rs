//! Shared application state for the HTTP layer.
//!
//! [`AppState`] holds the handles every request needs: the device store,
//! the broadcast hub WebSocket connections register with, and the resolved
//! simulation settings. It is built once at startup and shared behind an
//! [`Arc`].

use std::sync::Arc;

use moisture_core::config::SimulationSettings;
use moisture_core::hub::BroadcastHub;
use moisture_core::store::DeviceStore;

/// Shared state passed to every Axum handler.
#[derive(Debug)]
pub struct AppState {
    /// The device store.
    pub store: Arc<DeviceStore>,
    /// Observer registry for `/ws` connections.
    pub hub: Arc<BroadcastHub>,
    /// Tick interval and history bound, for `/health` and limit clamping.
    pub settings: SimulationSettings,
}

impl AppState {
    /// Bundle the shared handles.
    pub const fn new(
        store: Arc<DeviceStore>,
        hub: Arc<BroadcastHub>,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            store,
            hub,
            settings,
        }
    }

    /// Build a fresh store and hub from `settings`. Handy for tests and
    /// for embedding the router without the engine binary.
    pub fn from_settings(settings: SimulationSettings) -> Self {
        let store = Arc::new(match settings.rng_seed {
            Some(seed) => DeviceStore::with_seed(settings.max_history, seed),
            None => DeviceStore::new(settings.max_history),
        });
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&store)));
        Self::new(store, hub, settings)
    }
}
