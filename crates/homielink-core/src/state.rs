//! Device lifecycle states.

use std::fmt;
use std::str::FromStr;

/// Canonical lifecycle state of a device.
///
/// The wire representation is the lowercase state name, published retained
/// under the `$state` device attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// The device is connected but still publishing its description.
    Init,
    /// The device is connected and fully operational.
    Ready,
    /// The device announced a clean shutdown.
    Disconnected,
    /// The device is in deep sleep and will not answer.
    Sleeping,
    /// The device is operational but requires attention.
    Alert,
    /// The device vanished without a clean shutdown (last-will payload).
    Lost,
}

impl DeviceState {
    /// Wire string for this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
            Self::Sleeping => "sleeping",
            Self::Alert => "alert",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "ready" => Ok(Self::Ready),
            "disconnected" => Ok(Self::Disconnected),
            "sleeping" => Ok(Self::Sleeping),
            "alert" => Ok(Self::Alert),
            "lost" => Ok(Self::Lost),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}

/// Error returned when parsing a string that names no known device state.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown device state: {0}")]
pub struct UnknownStateError(pub String);
