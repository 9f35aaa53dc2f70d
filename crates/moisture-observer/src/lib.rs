//! HTTP and `WebSocket` surface for the moisture simulator.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for device CRUD, watering and status commands, and
//!   reading history
//! - **`WebSocket` endpoint** (`/ws`) streaming `readings_batch` messages,
//!   starting with a catch-up snapshot of every device
//! - **Health probe** (`/health`)
//!
//! # Architecture
//!
//! Handlers call straight into the shared [`DeviceStore`]; store errors map
//! onto HTTP statuses in [`ObserverError`]. Each `WebSocket` connection is an
//! observer registered with the [`BroadcastHub`] for the lifetime of the
//! socket.
//!
//! [`DeviceStore`]: moisture_core::store::DeviceStore
//! [`BroadcastHub`]: moisture_core::hub::BroadcastHub
//! [`ObserverError`]: error::ObserverError

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
