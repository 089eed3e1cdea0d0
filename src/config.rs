//! Configuration
//!
//! World settings come from environment variables; per-archetype tuning
//! comes from JSON properties files.

use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::vehicle::motion::PhysicsConstants;
use crate::vehicle::properties::VehicleProperties;

/// Accepted simulation rates, in ticks per second.
pub const TICK_RATE_RANGE: RangeInclusive<u32> = 1..=1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Properties file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Properties file is not valid JSON for the expected shape.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A setting has an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Setting name
        name: String,
        /// Rejected value
        value: String,
    },
}

/// World settings.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Ticks between status log lines (0 disables them).
    pub status_interval_ticks: u64,
    /// Ground friction before the wheel/terrain factor.
    pub ground_friction: f32,
    /// Downward acceleration in blocks per tick squared.
    pub gravity: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let physics = PhysicsConstants::default();
        Self {
            tick_rate: crate::TICK_RATE,
            status_interval_ticks: 20 * 60,
            ground_friction: physics.ground_friction,
            gravity: physics.gravity,
        }
    }
}

impl WorldConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            tick_rate: parse_var(&lookup, "VEHICLE_TICK_RATE")?.unwrap_or(defaults.tick_rate),
            status_interval_ticks: parse_var(&lookup, "VEHICLE_STATUS_INTERVAL")?
                .unwrap_or(defaults.status_interval_ticks),
            ground_friction: parse_var(&lookup, "VEHICLE_GROUND_FRICTION")?.unwrap_or(defaults.ground_friction),
            gravity: parse_var(&lookup, "VEHICLE_GRAVITY")?.unwrap_or(defaults.gravity),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !TICK_RATE_RANGE.contains(&self.tick_rate) {
            return Err(invalid("VEHICLE_TICK_RATE", self.tick_rate));
        }
        if !self.ground_friction.is_finite() || self.ground_friction < 0.0 {
            return Err(invalid("VEHICLE_GROUND_FRICTION", self.ground_friction));
        }
        if !self.gravity.is_finite() {
            return Err(invalid("VEHICLE_GRAVITY", self.gravity));
        }
        Ok(())
    }

    /// Physics constants for the motion profiles.
    pub fn physics(&self) -> PhysicsConstants {
        PhysicsConstants {
            gravity: self.gravity,
            ground_friction: self.ground_friction,
        }
    }

    /// Wall-clock length of one tick.
    pub fn tick_duration(&self) -> Duration {
        let rate = self.tick_rate.clamp(*TICK_RATE_RANGE.start(), *TICK_RATE_RANGE.end());
        Duration::from_micros(1_000_000 / rate as u64)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name: name.to_string(), value: raw }),
    }
}

fn invalid(name: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Parse vehicle properties from JSON. Missing keys keep `base` values.
pub fn parse_properties(json: &str, base: &VehicleProperties) -> Result<VehicleProperties, ConfigError> {
    let mut value = serde_json::to_value(base)?;
    let overrides: serde_json::Value = serde_json::from_str(json)?;
    if let (Some(target), serde_json::Value::Object(entries)) = (value.as_object_mut(), overrides) {
        for (key, entry) in entries {
            target.insert(key, entry);
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Load vehicle properties from a JSON file over `base`.
pub fn load_properties(path: impl AsRef<Path>, base: &VehicleProperties) -> Result<VehicleProperties, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    parse_properties(&json, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::surface::WheelType;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = WorldConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.tick_duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_overrides() {
        let config = WorldConfig::from_lookup(lookup(&[
            ("VEHICLE_TICK_RATE", "40"),
            ("VEHICLE_GROUND_FRICTION", " 0.5 "),
        ]))
        .unwrap();
        assert_eq!(config.tick_rate, 40);
        assert_eq!(config.physics().ground_friction, 0.5);
        assert_eq!(config.gravity, PhysicsConstants::default().gravity);
    }

    #[test]
    fn test_invalid_values() {
        let err = WorldConfig::from_lookup(lookup(&[("VEHICLE_GRAVITY", "heavy")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "VEHICLE_GRAVITY"));

        let err = WorldConfig::from_lookup(lookup(&[("VEHICLE_TICK_RATE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_tick_rate_bounded() {
        let err = WorldConfig::from_lookup(lookup(&[("VEHICLE_TICK_RATE", "2000000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "VEHICLE_TICK_RATE"));
        assert!(WorldConfig::from_lookup(lookup(&[("VEHICLE_TICK_RATE", "1001")])).is_err());

        let fastest = WorldConfig::from_lookup(lookup(&[("VEHICLE_TICK_RATE", "1000")])).unwrap();
        assert_eq!(fastest.tick_duration(), Duration::from_millis(1));

        let unchecked = WorldConfig { tick_rate: u32::MAX, ..WorldConfig::default() };
        assert!(unchecked.tick_duration() > Duration::ZERO);
    }

    #[test]
    fn test_properties_over_base() {
        let props = parse_properties(r#"{ "wheel_type": "OFF_ROAD", "max_speed": 0.9 }"#, &VehicleProperties::moped())
            .unwrap();
        assert_eq!(props.wheel_type, WheelType::OffRoad);
        assert_eq!(props.max_speed, 0.9);
        assert_eq!(props.engine_power, VehicleProperties::moped().engine_power);
    }

    #[test]
    fn test_properties_parse_error() {
        let result = parse_properties("{ not json", &VehicleProperties::plane());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_properties("/nonexistent/vehicle.json", &VehicleProperties::plane());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
