//! The device store: device state plus a bounded reading history per device.
//!
//! Every operation, reads included, goes through one exclusive
//! [`tokio::sync::Mutex`]. The working set is small and in memory, so a
//! single lock keeps every mutation atomic with respect to every other one
//! and to [`DeviceStore::tick`]. The lock is only held while state changes;
//! nothing in this module performs network I/O, and callers hand the
//! returned batches to the broadcast hub after the lock is released.
//!
//! Devices live in a [`BTreeMap`] keyed by time-ordered [`DeviceId`]s, so
//! iteration (and therefore batch order) follows creation order.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use moisture_types::{Device, DeviceId, DevicePatch, DeviceStatus, NewDevice, Reading};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::physics::{self, clamp_percent, round2};

/// A device together with its bounded history.
#[derive(Debug)]
struct DeviceEntry {
    device: Device,
    /// Oldest first. Never longer than the store's `max_history`.
    history: VecDeque<Reading>,
}

impl DeviceEntry {
    /// Snapshot the device at `at`, append the reading, evict the oldest on
    /// overflow, and return a copy of the new reading.
    fn record(&mut self, at: DateTime<Utc>, max_history: usize) -> Reading {
        let d = &self.device;
        let temperature = physics::diurnal_temp(at, d.config.temp_mean_c, d.config.temp_amp_c);
        let reading = Reading {
            timestamp: at,
            device_id: d.id,
            moisture: round2(d.moisture),
            temperature_c: round2(temperature),
            battery: round2(d.battery),
            watering: d.watering,
            status: d.status,
        };

        self.history.push_back(reading.clone());
        while self.history.len() > max_history {
            self.history.pop_front();
        }
        reading
    }
}

/// State guarded by the store lock.
#[derive(Debug)]
struct StoreInner {
    devices: BTreeMap<DeviceId, DeviceEntry>,
    /// Random source for fault-mode noise.
    rng: StdRng,
}

impl StoreInner {
    fn entry_mut(&mut self, id: DeviceId) -> Result<&mut DeviceEntry, StoreError> {
        self.devices
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(id))
    }

    fn entry(&self, id: DeviceId) -> Result<&DeviceEntry, StoreError> {
        self.devices.get(&id).ok_or_else(|| StoreError::not_found(id))
    }
}

/// Thread-safe store of simulated devices and their reading history.
///
/// Construct one instance at process start and share it behind an
/// [`Arc`](std::sync::Arc) with the routing layer and the simulation clock.
#[derive(Debug)]
pub struct DeviceStore {
    inner: Mutex<StoreInner>,
    max_history: usize,
}

impl DeviceStore {
    /// Create an empty store keeping at most `max_history` readings per
    /// device. A bound of 0 is treated as 1 so every device always has a
    /// current reading.
    pub fn new(max_history: usize) -> Self {
        Self::with_rng(max_history, StdRng::from_os_rng())
    }

    /// Create an empty store whose fault noise is drawn from a seeded
    /// generator, for reproducible runs.
    pub fn with_seed(max_history: usize, seed: u64) -> Self {
        Self::with_rng(max_history, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_history: usize, rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                devices: BTreeMap::new(),
                rng,
            }),
            max_history: max_history.max(1),
        }
    }

    /// The per-device history bound.
    pub const fn max_history(&self) -> usize {
        self.max_history
    }

    /// Create a device and synchronously seed its first reading.
    ///
    /// The device starts `ok`, not watering, with moisture and battery taken
    /// from `new` (clamped into `[0, 100]`). A missing config means
    /// [`DeviceConfig::default`].
    pub async fn create(&self, new: NewDevice) -> Device {
        let mut inner = self.inner.lock().await;

        let now = Utc::now();
        let id = DeviceId::new();
        let device = Device {
            id,
            name: new.name,
            plant_type: new.plant_type,
            location: new.location,
            created_at: now,
            updated_at: now,
            status: DeviceStatus::Ok,
            battery: clamp_percent(new.battery),
            watering: false,
            moisture: clamp_percent(new.initial_moisture),
            config: new.config.unwrap_or_default(),
        };

        let mut entry = DeviceEntry {
            device: device.clone(),
            history: VecDeque::new(),
        };
        entry.record(now, self.max_history);
        inner.devices.insert(id, entry);

        info!(device_id = %id, name = %device.name, "Device created");
        device
    }

    /// Snapshot of every device, in store iteration order.
    pub async fn list(&self) -> Vec<Device> {
        let inner = self.inner.lock().await;
        inner
            .devices
            .values()
            .map(|entry| entry.device.clone())
            .collect()
    }

    /// Look up one device.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn get(&self, id: DeviceId) -> Result<Device, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.entry(id)?.device.clone())
    }

    /// Apply the fields present in `patch` and bump the update timestamp.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn update(&self, id: DeviceId, patch: DevicePatch) -> Result<Device, StoreError> {
        let mut inner = self.inner.lock().await;
        let device = &mut inner.entry_mut(id)?.device;

        if let Some(name) = patch.name {
            device.name = name;
        }
        if let Some(plant_type) = patch.plant_type {
            device.plant_type = plant_type;
        }
        if let Some(location) = patch.location {
            device.location = Some(location);
        }
        if let Some(config) = patch.config {
            device.config = config;
        }
        device.updated_at = Utc::now();

        debug!(device_id = %id, "Device updated");
        Ok(device.clone())
    }

    /// Remove a device together with its history.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn delete(&self, id: DeviceId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .devices
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(id))?;

        info!(device_id = %id, "Device deleted");
        Ok(())
    }

    /// The most recent `limit` readings, oldest first.
    ///
    /// Callers clamp `limit` to the configured maximum; asking for more than
    /// the device holds returns everything it holds.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn history(&self, id: DeviceId, limit: usize) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.lock().await;
        let history = &inner.entry(id)?.history;
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }

    /// The most recent reading.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn current(&self, id: DeviceId) -> Result<Reading, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .entry(id)?
            .history
            .back()
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    /// Set a device's status from its wire name (`ok`, `fault`, `offline`).
    ///
    /// The status is parsed before the device is looked up, so a bogus value
    /// is rejected without touching any state.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] for an unknown status,
    /// [`StoreError::NotFound`] if no such device exists.
    pub async fn set_status(&self, id: DeviceId, status: &str) -> Result<Device, StoreError> {
        let status: DeviceStatus = status.parse()?;

        let mut inner = self.inner.lock().await;
        let device = &mut inner.entry_mut(id)?.device;
        device.status = status;
        device.updated_at = Utc::now();

        info!(device_id = %id, %status, "Device status changed");
        Ok(device.clone())
    }

    /// Turn the watering actuator on or off by explicit command.
    ///
    /// This bypasses the auto-mode thresholds; the next tick may still flip
    /// it back if auto mode is enabled.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such device exists,
    /// [`StoreError::Conflict`] if the device is offline.
    pub async fn set_watering(&self, id: DeviceId, on: bool) -> Result<Device, StoreError> {
        let mut inner = self.inner.lock().await;
        let device = &mut inner.entry_mut(id)?.device;
        if device.status == DeviceStatus::Offline {
            return Err(StoreError::Conflict {
                reason: String::from("device is offline"),
            });
        }
        device.watering = on;
        device.updated_at = Utc::now();

        info!(device_id = %id, watering = on, "Watering command applied");
        Ok(device.clone())
    }

    /// The latest reading of every device, for an observer catch-up.
    pub async fn latest_readings(&self) -> Vec<Reading> {
        let inner = self.inner.lock().await;
        inner
            .devices
            .values()
            .filter_map(|entry| entry.history.back().cloned())
            .collect()
    }

    /// Advance every device by one step of `dt` seconds, stamped with the
    /// wall clock read after the lock is held.
    ///
    /// This is what the simulation clock calls: any mutation that won the
    /// lock first already carries an earlier timestamp.
    pub async fn tick_now(&self, dt: f64) -> Vec<Reading> {
        let mut guard = self.inner.lock().await;
        let now = Utc::now();
        self.sweep(&mut guard, dt, now)
    }

    /// Advance every device by one step of `dt` seconds at instant `now`.
    ///
    /// All devices share the same `dt` and timestamp. A `now` older than the
    /// newest timestamp already in the store is raised to it, so history
    /// never goes backwards. Returns one new reading per device, in store
    /// iteration order.
    pub async fn tick(&self, dt: f64, now: DateTime<Utc>) -> Vec<Reading> {
        let mut guard = self.inner.lock().await;
        self.sweep(&mut guard, dt, now)
    }

    fn sweep(&self, inner: &mut StoreInner, dt: f64, now: DateTime<Utc>) -> Vec<Reading> {
        let StoreInner { devices, rng } = inner;

        let floor = devices
            .values()
            .flat_map(|entry| {
                let last = entry.history.back().map(|reading| reading.timestamp);
                [Some(entry.device.updated_at), last]
            })
            .flatten()
            .max();
        let now = floor.map_or(now, |floor| now.max(floor));

        let batch: Vec<Reading> = devices
            .values_mut()
            .map(|entry| {
                physics::apply_physics_tick(&mut entry.device, dt, now, &mut *rng);
                entry.device.updated_at = now;
                entry.record(now, self.max_history)
            })
            .collect();

        debug!(devices = batch.len(), dt, "Tick applied");
        batch
    }
}
