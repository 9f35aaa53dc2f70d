//! Shared type definitions for the moisture sensor fleet simulator.
//!
//! Types defined here flow downstream to `TypeScript` via `ts-rs` for the
//! dashboard that consumes the device API and the live readings socket.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for device and observer identifiers
//! - [`enums`] -- Device status
//! - [`structs`] -- Device, configuration, reading, and create/update payloads
//! - [`messages`] -- The `readings_batch` message pushed to observers

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{DeviceStatus, UnknownStatus};
pub use ids::{DeviceId, ObserverId};
pub use messages::ObserverMessage;
pub use structs::{Device, DeviceConfig, DevicePatch, NewDevice, Reading};
