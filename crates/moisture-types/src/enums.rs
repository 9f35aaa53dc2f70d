//! Enumeration types for the moisture simulator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Operational status of a simulated device.
///
/// Status gates the physics: an offline device only drains its battery
/// (slowly), a faulted device produces noisy moisture values, and automatic
/// watering control only runs while a device is [`DeviceStatus::Ok`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum DeviceStatus {
    /// Normal operation.
    #[default]
    Ok,
    /// The sensor is malfunctioning; readings carry random noise.
    Fault,
    /// The device is unreachable; nothing but the battery changes.
    Offline,
}

impl DeviceStatus {
    /// Every accepted status, in wire order.
    pub const ALL: [Self; 3] = [Self::Ok, Self::Fault, Self::Offline];

    /// The wire representation (`ok`, `fault`, `offline`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Fault => "fault",
            Self::Offline => "offline",
        }
    }
}

impl core::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of `ok`, `fault`, `offline`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {value:?} (expected one of ok, fault, offline)")]
pub struct UnknownStatus {
    /// The rejected input.
    pub value: String,
}

impl core::str::FromStr for DeviceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_lowercase_on_the_wire() {
        let json = serde_json::to_string(&DeviceStatus::Offline).ok();
        assert_eq!(json.as_deref(), Some("\"offline\""));
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!("fault".parse::<DeviceStatus>().ok(), Some(DeviceStatus::Fault));
        assert!("Fault".parse::<DeviceStatus>().is_err());
        assert!("bogus".parse::<DeviceStatus>().is_err());
        assert!("".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for status in DeviceStatus::ALL {
            assert_eq!(status.to_string().parse::<DeviceStatus>().ok(), Some(status));
        }
    }
}
