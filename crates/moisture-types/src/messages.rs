//! Messages pushed to live-readings observers.
//!
//! Wire contract: a JSON object with a `"type"` discriminator and a `data`
//! array of reading objects. The catch-up snapshot sent on connect and the
//! per-tick batches share the same `readings_batch` shape.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::Reading;

/// A message delivered to every registered observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObserverMessage {
    /// A batch of readings, one per device.
    ReadingsBatch {
        /// The readings, in store iteration order.
        data: Vec<Reading>,
    },
}

impl ObserverMessage {
    /// Wrap readings in a `readings_batch` message.
    pub const fn readings_batch(data: Vec<Reading>) -> Self {
        Self::ReadingsBatch { data }
    }

    /// The readings carried by this message.
    pub fn readings(&self) -> &[Reading] {
        match self {
            Self::ReadingsBatch { data } => data,
        }
    }
}
