//! Core entity structs: device configuration, device state, readings, and
//! the create/update payloads accepted by the device store.
//!
//! Field ranges are declared with `validator` so the routing layer can
//! reject out-of-range input before it reaches the store. The store itself
//! still clamps moisture and battery, so the `[0, 100]` invariants hold even
//! for callers that skip validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::DeviceStatus;
use crate::ids::DeviceId;

// ---------------------------------------------------------------------------
// Device configuration
// ---------------------------------------------------------------------------

/// Per-device tunables for the physics model.
///
/// Rates are expressed in percent per tick-second. Any field missing from
/// incoming JSON takes its default; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeviceConfig {
    /// Auto mode turns watering on below this moisture percentage.
    #[serde(default = "default_min_threshold")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_threshold: f64,

    /// Auto mode turns watering off at or above this moisture percentage.
    #[serde(default = "default_max_threshold")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_threshold: f64,

    /// Moisture lost per second to evaporation while not watering.
    #[serde(default = "default_evaporation_rate")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub evaporation_rate: f64,

    /// Moisture gained per second while watering.
    #[serde(default = "default_irrigation_rate")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub irrigation_rate: f64,

    /// Sensor noise level. Carried for clients; the physics model does not
    /// read it.
    #[serde(default = "default_noise")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub noise: f64,

    /// Whether the device drives its own watering from the thresholds.
    #[serde(default)]
    pub auto_mode: bool,

    /// Mean of the diurnal temperature curve in degrees Celsius.
    #[serde(default = "default_temp_mean_c")]
    pub temp_mean_c: f64,

    /// Amplitude of the diurnal temperature curve in degrees Celsius.
    #[serde(default = "default_temp_amp_c")]
    #[validate(range(min = 0.0))]
    pub temp_amp_c: f64,

    /// Extra moisture lost per second through drainage.
    #[serde(default = "default_leak_rate")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub leak_rate: f64,

    /// Battery percentage consumed per hour of normal operation.
    #[serde(default = "default_battery_drain_per_hour")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub battery_drain_per_hour: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            min_threshold: default_min_threshold(),
            max_threshold: default_max_threshold(),
            evaporation_rate: default_evaporation_rate(),
            irrigation_rate: default_irrigation_rate(),
            noise: default_noise(),
            auto_mode: false,
            temp_mean_c: default_temp_mean_c(),
            temp_amp_c: default_temp_amp_c(),
            leak_rate: default_leak_rate(),
            battery_drain_per_hour: default_battery_drain_per_hour(),
        }
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// A simulated moisture sensor node.
///
/// Owned exclusively by the device store; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Device {
    /// Unique device identifier.
    pub id: DeviceId,
    /// Display name.
    pub name: String,
    /// Plant type the sensor is attached to.
    pub plant_type: String,
    /// Optional free-form location.
    pub location: Option<String>,
    /// When the device was created.
    pub created_at: DateTime<Utc>,
    /// When the device was last modified (by a caller or by a tick).
    pub updated_at: DateTime<Utc>,
    /// Operational status.
    pub status: DeviceStatus,
    /// Battery level, 0-100.
    pub battery: f64,
    /// Whether the watering actuator is on.
    pub watering: bool,
    /// Soil moisture, 0-100.
    pub moisture: f64,
    /// Physics tunables.
    pub config: DeviceConfig,
}

/// Payload for creating a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewDevice {
    /// Display name (required, 1-120 characters).
    #[validate(length(min = 1, max = 120))]
    pub name: String,

    /// Plant type (defaults to `generic`).
    #[serde(default = "default_plant_type")]
    #[validate(length(max = 80))]
    pub plant_type: String,

    /// Optional location.
    #[serde(default)]
    #[validate(length(max = 120))]
    pub location: Option<String>,

    /// Starting moisture percentage.
    #[serde(default = "default_initial_moisture")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub initial_moisture: f64,

    /// Starting battery percentage.
    #[serde(default = "default_battery")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery: f64,

    /// Physics tunables; defaults apply when absent.
    #[serde(default)]
    #[validate(nested)]
    pub config: Option<DeviceConfig>,
}

impl NewDevice {
    /// A create payload with the given name and every other field at its
    /// default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plant_type: default_plant_type(),
            location: None,
            initial_moisture: default_initial_moisture(),
            battery: default_battery(),
            config: None,
        }
    }
}

/// Partial update for a device. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DevicePatch {
    /// New display name.
    #[serde(default)]
    #[validate(length(max = 120))]
    pub name: Option<String>,

    /// New plant type.
    #[serde(default)]
    #[validate(length(max = 80))]
    pub plant_type: Option<String>,

    /// New location.
    #[serde(default)]
    #[validate(length(max = 120))]
    pub location: Option<String>,

    /// Replacement configuration (replaces the whole config).
    #[serde(default)]
    #[validate(nested)]
    pub config: Option<DeviceConfig>,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Immutable, timestamped snapshot of one device's observable state.
///
/// Numeric fields are rounded to two decimal places when the reading is
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Reading {
    /// When the reading was taken (UTC).
    pub timestamp: DateTime<Utc>,
    /// The device that produced it.
    pub device_id: DeviceId,
    /// Soil moisture percentage.
    pub moisture: f64,
    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Battery percentage.
    pub battery: f64,
    /// Whether watering was on.
    pub watering: bool,
    /// Device status at the time of the reading.
    pub status: DeviceStatus,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_min_threshold() -> f64 {
    25.0
}

const fn default_max_threshold() -> f64 {
    60.0
}

const fn default_evaporation_rate() -> f64 {
    0.015
}

const fn default_irrigation_rate() -> f64 {
    0.25
}

const fn default_noise() -> f64 {
    0.35
}

const fn default_temp_mean_c() -> f64 {
    22.0
}

const fn default_temp_amp_c() -> f64 {
    4.0
}

const fn default_leak_rate() -> f64 {
    0.0
}

const fn default_battery_drain_per_hour() -> f64 {
    0.2
}

fn default_plant_type() -> String {
    String::from("generic")
}

const fn default_initial_moisture() -> f64 {
    50.0
}

const fn default_battery() -> f64 {
    100.0
}
