//! Fan-out of reading batches to connected observers.
//!
//! An observer is anything that can accept an [`ObserverMessage`] without
//! blocking: in production a WebSocket connection task fed through a bounded
//! channel ([`ChannelObserver`]), in tests a recording stub. Delivery is
//! non-blocking on purpose. A slow observer fills its channel and is dropped
//! instead of stalling the tick loop.
//!
//! The observer set has its own lock. [`BroadcastHub::register`] reads the
//! store snapshot while holding it, which orders the catch-up batch before
//! any tick batch for that observer. The tick path never holds the store
//! lock while broadcasting, so the two locks are always taken in the order
//! observers then store.

use std::collections::BTreeMap;
use std::sync::Arc;

use moisture_types::{ObserverId, ObserverMessage, Reading};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::store::DeviceStore;

/// Buffered messages per WebSocket observer before it counts as lagging.
pub const OBSERVER_CHANNEL_CAPACITY: usize = 64;

/// Why a message could not be handed to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The observer is not keeping up and its buffer is full.
    #[error("observer is lagging behind")]
    Lagging,

    /// The observer's receiving side has gone away.
    #[error("observer disconnected")]
    Disconnected,
}

/// A receiver of broadcast messages.
///
/// `deliver` must not block. Any error removes the observer from the hub.
pub trait Observer: Send + Sync {
    /// Hand one message to the observer.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the observer cannot accept the message.
    fn deliver(&self, message: &Arc<ObserverMessage>) -> Result<(), DeliveryError>;

    /// Best-effort close, called once when the hub drops the observer.
    fn close(&self) {}
}

/// Observer backed by a bounded [`mpsc`] channel.
///
/// The connection task owns the receiver and forwards every message to its
/// socket. Dropping this observer drops the sender, which ends the
/// receiver's stream.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<Arc<ObserverMessage>>,
}

impl ChannelObserver {
    /// Create an observer and the receiver its connection task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<ObserverMessage>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn deliver(&self, message: &Arc<ObserverMessage>) -> Result<(), DeliveryError> {
        self.tx
            .try_send(Arc::clone(message))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DeliveryError::Lagging,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
            })
    }
}

/// The live set of observers and the store they take catch-up snapshots from.
pub struct BroadcastHub {
    store: Arc<DeviceStore>,
    observers: Mutex<BTreeMap<ObserverId, Box<dyn Observer>>>,
}

impl core::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BroadcastHub").finish_non_exhaustive()
    }
}

impl BroadcastHub {
    /// Create a hub with no observers.
    pub fn new(store: Arc<DeviceStore>) -> Self {
        Self {
            store,
            observers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add an observer and send it one catch-up batch holding the latest
    /// reading of every device (possibly empty).
    ///
    /// # Errors
    ///
    /// If the catch-up cannot be delivered the observer is not added and the
    /// delivery error is returned.
    pub async fn register(&self, observer: Box<dyn Observer>) -> Result<ObserverId, DeliveryError> {
        let mut observers = self.observers.lock().await;

        let latest = self.store.latest_readings().await;
        let devices = latest.len();
        let catch_up = Arc::new(ObserverMessage::readings_batch(latest));
        if let Err(err) = observer.deliver(&catch_up) {
            observer.close();
            return Err(err);
        }

        let id = ObserverId::new();
        observers.insert(id, observer);
        info!(
            observer_id = %id,
            devices,
            observers = observers.len(),
            "Observer registered"
        );
        Ok(id)
    }

    /// Remove an observer and close it. Unknown ids are ignored.
    pub async fn unregister(&self, id: ObserverId) {
        let removed = self.observers.lock().await.remove(&id);
        if let Some(observer) = removed {
            observer.close();
            info!(observer_id = %id, "Observer unregistered");
        }
    }

    /// Number of live observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.lock().await.len()
    }

    /// Deliver a batch to every live observer and drop those that fail.
    ///
    /// Does nothing for an empty batch. Returns how many observers accepted
    /// the message.
    pub async fn broadcast(&self, batch: Vec<Reading>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let message = Arc::new(ObserverMessage::readings_batch(batch));

        let mut observers = self.observers.lock().await;
        let mut failed = Vec::new();
        for (id, observer) in observers.iter() {
            if let Err(err) = observer.deliver(&message) {
                failed.push((*id, err));
            }
        }

        let delivered = observers.len().saturating_sub(failed.len());
        for (id, err) in failed {
            if let Some(observer) = observers.remove(&id) {
                observer.close();
            }
            warn!(observer_id = %id, error = %err, "Dropping observer after failed delivery");
        }

        debug!(readings = message.readings().len(), delivered, "Batch broadcast");
        delivered
    }
}
