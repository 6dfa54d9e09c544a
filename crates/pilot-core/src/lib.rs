pub mod altitude;
pub mod connection;
pub mod dispatch;
pub mod phase;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testutil;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_TARGET_ALTITUDE_FEET: i32 = 4500;
pub const DEFAULT_TAXI_SPEED_KTS_MAX: i32 = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct PilotConfig {
    /// Altitude the climb/cruise throttle law holds, feet MSL.
    #[serde(default = "default_target_altitude_feet")]
    pub target_altitude_feet: i32,

    /// Ground-speed ceiling during taxi, knots. The controller tolerates
    /// +2 kt before it cuts throttle and taps the brakes.
    #[serde(default = "default_taxi_speed_kts_max")]
    pub taxi_speed_kts_max: i32,

    /// Start with the hold-short directive active. Also settable at
    /// runtime through `FlightController::set_hold_short`.
    #[serde(default)]
    pub hold_short: bool,
}

fn default_target_altitude_feet() -> i32 {
    DEFAULT_TARGET_ALTITUDE_FEET
}

fn default_taxi_speed_kts_max() -> i32 {
    DEFAULT_TAXI_SPEED_KTS_MAX
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            target_altitude_feet: DEFAULT_TARGET_ALTITUDE_FEET,
            taxi_speed_kts_max: DEFAULT_TAXI_SPEED_KTS_MAX,
            hold_short: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target_altitude_feet must be positive (got {0})")]
    BadTargetAltitude(i32),
    #[error("taxi_speed_kts_max out of range 1..=40 (got {0})")]
    BadTaxiSpeed(i32),
}

impl PilotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_altitude_feet <= 0 {
            return Err(ConfigError::BadTargetAltitude(self.target_altitude_feet));
        }
        if !(1..=40).contains(&self.taxi_speed_kts_max) {
            return Err(ConfigError::BadTaxiSpeed(self.taxi_speed_kts_max));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference() {
        let cfg = PilotConfig::default();
        assert_eq!(cfg.target_altitude_feet, 4500);
        assert_eq!(cfg.taxi_speed_kts_max, 15);
        assert!(!cfg.hold_short);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = PilotConfig { target_altitude_feet: 0, ..PilotConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::BadTargetAltitude(0))));

        let cfg = PilotConfig { taxi_speed_kts_max: 55, ..PilotConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::BadTaxiSpeed(55))));
    }
}
