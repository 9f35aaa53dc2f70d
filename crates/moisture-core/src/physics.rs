//! Physics applied to every device once per tick.
//!
//! Given a device's current state and configuration, the elapsed tick
//! duration `dt` (seconds), and the wall-clock instant `now`, compute the
//! next moisture, battery, and watering values. No shared state and no I/O:
//! the only external input is the random source used for fault noise, which
//! the caller owns.
//!
//! # Order of operations
//!
//! 1. Offline devices drain battery at 1/20th the normal rate and stop.
//! 2. Faulted devices receive a random moisture perturbation of up to 4
//!    points in either direction (not scaled by `dt`).
//! 3. Watering adds `irrigation_rate * dt`; otherwise evaporation plus leak,
//!    boosted by the diurnal heat factor, removes moisture.
//! 4. Moisture is clamped to `[0, 100]`.
//! 5. Auto mode (status `ok` only) applies the threshold hysteresis.
//! 6. Battery drains by `battery_drain_per_hour / 3600 * dt` and is clamped.

use std::f64::consts::PI;

use chrono::{DateTime, Timelike, Utc};
use moisture_types::{Device, DeviceConfig, DeviceStatus};
use rand::Rng;

/// Seconds in one day.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Seconds in one hour.
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Fraction of the normal battery drain applied while offline.
const OFFLINE_DRAIN_FACTOR: f64 = 0.05;

/// Largest fault-mode moisture perturbation, in percentage points.
const FAULT_NOISE_MAX: f64 = 4.0;

/// Upper bound of the heat factor that accelerates drying.
const MAX_HEAT_FACTOR: f64 = 0.3;

/// Lower/upper bound shared by moisture and battery.
const PERCENT_MIN: f64 = 0.0;
const PERCENT_MAX: f64 = 100.0;

/// Temperature on a smooth 24-hour sine curve.
///
/// `mean + amp * sin(2π * secondsOfDay / 86400 - π/2)`: the curve bottoms
/// out at midnight, crosses the mean at 06:00 and 18:00, and peaks at noon.
pub fn diurnal_temp(at: DateTime<Utc>, mean: f64, amp: f64) -> f64 {
    let seconds = f64::from(at.num_seconds_from_midnight());
    let phase = 2.0 * PI * seconds / SECONDS_PER_DAY;
    amp.mul_add((phase - PI / 2.0).sin(), mean)
}

/// How much warmer than the mean it is, scaled into `[0, 0.3]`.
pub fn heat_factor(at: DateTime<Utc>, config: &DeviceConfig) -> f64 {
    let temp = diurnal_temp(at, config.temp_mean_c, config.temp_amp_c);
    ((temp - config.temp_mean_c) / 10.0).clamp(0.0, MAX_HEAT_FACTOR)
}

/// Round to two decimal places, as readings are reported.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a percentage quantity into `[0, 100]`.
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(PERCENT_MIN, PERCENT_MAX)
}

/// Apply one simulation step to a device in place.
///
/// Only moisture, battery, and watering change. Timestamps and the
/// resulting reading are the store's responsibility.
pub fn apply_physics_tick<R: Rng + ?Sized>(
    device: &mut Device,
    dt: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) {
    let drain_per_second = device.config.battery_drain_per_hour / SECONDS_PER_HOUR;

    // 1. Offline: slow battery drain only.
    if device.status == DeviceStatus::Offline {
        device.battery =
            clamp_percent(device.battery - drain_per_second * dt * OFFLINE_DRAIN_FACTOR);
        return;
    }

    // 2. Fault noise.
    if device.status == DeviceStatus::Fault {
        let magnitude = rng.random_range(0.0..=FAULT_NOISE_MAX);
        let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        device.moisture += sign * magnitude;
    }

    // 3. Irrigation or drying.
    if device.watering {
        device.moisture += device.config.irrigation_rate * dt;
    } else {
        let dry_rate = (device.config.evaporation_rate + device.config.leak_rate)
            * (1.0 + heat_factor(now, &device.config));
        device.moisture -= dry_rate * dt;
    }

    // 4.
    device.moisture = clamp_percent(device.moisture);

    // 5. Auto mode hysteresis, only for healthy devices.
    if device.config.auto_mode && device.status == DeviceStatus::Ok {
        if device.moisture < device.config.min_threshold {
            device.watering = true;
        } else if device.moisture >= device.config.max_threshold {
            device.watering = false;
        }
    }

    // 6. Battery drain applies whether or not the pump runs.
    device.battery = clamp_percent(device.battery - drain_per_second * dt);
}
