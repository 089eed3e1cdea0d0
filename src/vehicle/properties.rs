//! Vehicle Properties
//!
//! Static tuning values for a vehicle archetype. Loaded once per archetype
//! and shared by every instance of it.

use serde::{Serialize, Deserialize};

use crate::vehicle::surface::WheelType;

/// Tuning values for one archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleProperties {
    /// Engine power; scales thrust and propeller spin-up
    pub engine_power: f32,
    /// Speed (blocks/second) at which lift fully counters gravity
    pub min_flight_speed: f32,
    /// Largest flap deflection in degrees
    pub max_flap_angle: f32,
    /// Wheels fitted to the vehicle
    pub wheel_type: WheelType,
    /// Engine sound pitch at idle
    pub min_engine_pitch: f32,
    /// Engine sound pitch at full power
    pub max_engine_pitch: f32,
    /// Largest front wheel angle in degrees
    pub max_steering_angle: f32,
    /// Yaw change per tick at full lock, in degrees
    pub steering_speed: f32,
    /// Top ground speed in blocks per tick
    pub max_speed: f32,
}

impl VehicleProperties {
    /// Defaults for a light propeller plane.
    pub fn plane() -> Self {
        Self {
            engine_power: 15.0,
            min_flight_speed: 16.0,
            max_flap_angle: 45.0,
            wheel_type: WheelType::Standard,
            min_engine_pitch: 0.8,
            max_engine_pitch: 1.6,
            max_steering_angle: 45.0,
            steering_speed: 5.0,
            max_speed: 1.5,
        }
    }

    /// Defaults for a moped.
    pub fn moped() -> Self {
        Self {
            engine_power: 10.0,
            min_flight_speed: 0.0,
            max_flap_angle: 0.0,
            wheel_type: WheelType::Standard,
            min_engine_pitch: 0.5,
            max_engine_pitch: 1.2,
            max_steering_angle: 45.0,
            steering_speed: 6.0,
            max_speed: 0.6,
        }
    }
}

impl Default for VehicleProperties {
    fn default() -> Self {
        Self::plane()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let props: VehicleProperties =
            serde_json::from_str(r#"{ "engine_power": 30.0, "wheel_type": "SPORTS" }"#).unwrap();
        assert_eq!(props.engine_power, 30.0);
        assert_eq!(props.wheel_type, WheelType::Sports);
        assert_eq!(props.min_flight_speed, VehicleProperties::plane().min_flight_speed);
    }
}
