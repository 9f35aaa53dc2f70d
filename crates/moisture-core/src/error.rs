//! Errors returned by device store operations.
//!
//! These propagate unchanged to the routing layer, which maps them onto its
//! own transport representation.

use moisture_types::DeviceId;

/// Errors that can occur during device store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No device with the given identifier exists.
    #[error("device not found: {device_id}")]
    NotFound {
        /// The identifier that was looked up.
        device_id: String,
    },

    /// An argument was outside its accepted set.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Explanation of what was rejected.
        reason: String,
    },

    /// The request conflicts with the device's current state.
    #[error("conflict: {reason}")]
    Conflict {
        /// Explanation of the conflict.
        reason: String,
    },
}

impl StoreError {
    /// Build a [`StoreError::NotFound`] for a typed device id.
    pub fn not_found(id: DeviceId) -> Self {
        Self::NotFound {
            device_id: id.to_string(),
        }
    }
}

impl From<moisture_types::UnknownStatus> for StoreError {
    fn from(err: moisture_types::UnknownStatus) -> Self {
        Self::InvalidArgument {
            reason: err.to_string(),
        }
    }
}
