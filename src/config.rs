use crate::{Error, Rate};
use serde::{Deserialize, Serialize};

/// Offboard controller configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maneuver sampling and setpoint publishing rate (in hz).
    pub rate_hz: f32,

    /// Maximum published speed (in m/s).
    pub max_speed: f32,

    /// Minimum speed (in m/s). Reserved, not applied to setpoints.
    pub min_speed: f32,

    /// Maximum maneuver distance (in meters). Reserved, not applied to maneuvers.
    pub max_distance: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_hz: 10.,
            max_speed: 0.5,
            min_speed: 0.01,
            max_distance: 2.,
        }
    }
}

impl Config {
    pub fn rate(&self) -> Rate {
        Rate::new(self.rate_hz)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0. {
            return Err(Error::InvalidConfig("rate_hz must be positive"));
        }
        if !self.max_speed.is_finite() || self.max_speed <= 0. {
            return Err(Error::InvalidConfig("max_speed must be positive"));
        }
        if !(0. ..=self.max_speed).contains(&self.min_speed) {
            return Err(Error::InvalidConfig("min_speed must be within [0, max_speed]"));
        }
        Ok(())
    }
}
