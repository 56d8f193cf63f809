use core::fmt;
use serde::{Deserialize, Serialize};

/// Flight mode reported by the vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightMode {
    Manual,
    PositionHold,
    Offboard,
    #[default]
    Unknown,
}

impl FlightMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FlightMode::Manual => "MANUAL",
            FlightMode::PositionHold => "POSCTL",
            FlightMode::Offboard => "OFFBOARD",
            FlightMode::Unknown => "UNKNOWN",
        }
    }
}

impl From<&str> for FlightMode {
    /// Parse a mode string as reported by the autopilot.
    /// Unrecognized modes are tracked as [`FlightMode::Unknown`].
    fn from(mode: &str) -> Self {
        match mode {
            "MANUAL" => FlightMode::Manual,
            "POSCTL" => FlightMode::PositionHold,
            "OFFBOARD" => FlightMode::Offboard,
            _ => FlightMode::Unknown,
        }
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current flight mode along with the mode before the most recent update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeState {
    pub current: FlightMode,
    pub previous: FlightMode,
}

impl ModeState {
    /// Apply a mode update, remembering the mode it replaces.
    pub fn update(&mut self, mode: FlightMode) {
        self.previous = self.current;
        self.current = mode;
    }

    /// Returns `true` if the most recent update entered `mode` from a different mode.
    pub fn entered(&self, mode: FlightMode) -> bool {
        self.current == mode && self.previous != mode
    }
}
