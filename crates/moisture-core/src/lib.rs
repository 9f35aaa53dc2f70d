//! Device store, physics, broadcast hub, and simulation clock for the
//! moisture sensor simulator.
//!
//! # Modules
//!
//! - [`store`] -- [`DeviceStore`]: device state plus bounded reading history
//!   behind one exclusive lock.
//! - [`physics`] -- The per-tick moisture, battery, and watering update.
//! - [`hub`] -- [`BroadcastHub`]: fan-out of reading batches to observers.
//! - [`clock`] -- [`SimulationClock`]: the periodic tick loop.
//! - [`config`] -- Loading `moisture-config.yaml` into typed structs.
//! - [`error`] -- [`StoreError`].
//!
//! [`DeviceStore`]: store::DeviceStore
//! [`BroadcastHub`]: hub::BroadcastHub
//! [`SimulationClock`]: clock::SimulationClock
//! [`StoreError`]: error::StoreError

pub mod clock;
pub mod config;
pub mod error;
pub mod hub;
pub mod physics;
pub mod store;
