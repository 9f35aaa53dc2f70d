//! The simulation clock: a background task that ticks the store at a fixed
//! interval and broadcasts each batch.
//!
//! The clock is either stopped or running. [`SimulationClock::stop`] is
//! cooperative: it raises a flag, wakes the loop if it is sleeping, and waits
//! for the task to finish. A tick that is already in progress always runs to
//! completion, including its broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::BroadcastHub;
use crate::store::DeviceStore;

/// Stop signal shared between the clock and its loop.
#[derive(Debug, Default)]
struct LoopControl {
    stop_requested: AtomicBool,
    wake: Notify,
}

impl LoopControl {
    fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct RunningLoop {
    control: Arc<LoopControl>,
    handle: JoinHandle<()>,
}

/// Periodic driver of `tick -> broadcast -> sleep`.
#[derive(Debug)]
pub struct SimulationClock {
    store: Arc<DeviceStore>,
    hub: Arc<BroadcastHub>,
    interval: Duration,
    running: Mutex<Option<RunningLoop>>,
    ticks: Arc<AtomicU64>,
}

impl SimulationClock {
    /// Create a stopped clock. The tick duration fed to the physics equals
    /// `interval`.
    pub fn new(store: Arc<DeviceStore>, hub: Arc<BroadcastHub>, interval: Duration) -> Self {
        Self {
            store,
            hub,
            interval,
            running: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The configured interval between ticks.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks completed since the clock was created, across restarts.
    pub fn ticks_completed(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Whether the background loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Spawn the tick loop. Does nothing if it is already running.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("Simulation clock already running");
            return;
        }

        let control = Arc::new(LoopControl::default());
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.store),
            Arc::clone(&self.hub),
            self.interval,
            Arc::clone(&control),
            Arc::clone(&self.ticks),
        ));
        *running = Some(RunningLoop { control, handle });

        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Simulation clock started"
        );
    }

    /// Signal the loop to stop and wait for it to finish its current
    /// iteration. Does nothing if the clock is stopped.
    pub async fn stop(&self) {
        let Some(RunningLoop { control, handle }) = self.running.lock().await.take() else {
            return;
        };

        control.request_stop();
        if let Err(err) = handle.await {
            warn!(error = %err, "Simulation loop ended abnormally");
        }

        info!(ticks = self.ticks_completed(), "Simulation clock stopped");
    }
}

async fn run_loop(
    store: Arc<DeviceStore>,
    hub: Arc<BroadcastHub>,
    interval: Duration,
    control: Arc<LoopControl>,
    ticks: Arc<AtomicU64>,
) {
    let dt = interval.as_secs_f64();

    loop {
        if control.is_stop_requested() {
            break;
        }

        // --- Tick, then broadcast with the store lock released ---
        let batch = store.tick_now(dt).await;
        hub.broadcast(batch).await;
        ticks.fetch_add(1, Ordering::AcqRel);

        if control.is_stop_requested() {
            break;
        }

        // --- Sleep, waking early on stop ---
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = control.wake.notified() => {}
        }
    }
}
