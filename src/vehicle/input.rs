//! Control Input and Environment
//!
//! `ControlInput` is what the controlling occupant sends each tick;
//! `Environment` is the read-only snapshot of host state the integrator
//! consults. Neither has an identity of its own: both are overwritten
//! every tick.

use serde::{Serialize, Deserialize};

use crate::vehicle::surface::TerrainClass;

/// Largest magnitude of a normalized control axis.
pub const MAX_AXIS: f32 = 1.0;

/// Normalized control signals from the controlling occupant.
///
/// Wire layout is three float32 values: lift, forward, side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct ControlInput {
    /// Lift command: -1 (dive) to +1 (climb)
    pub lift: f32,
    /// Forward input: -1 (reverse/brake) to +1 (throttle)
    pub forward: f32,
    /// Side input: -1 (right) to +1 (left)
    pub side: f32,
}

impl ControlInput {
    /// Size in bytes on the wire
    pub const SIZE: usize = 12;

    /// No input on any axis.
    pub const IDLE: Self = Self { lift: 0.0, forward: 0.0, side: 0.0 };

    /// Create a new input.
    pub const fn new(lift: f32, forward: f32, side: f32) -> Self {
        Self { lift, forward, side }
    }

    /// Clamp every axis into [-1, 1]; non-finite axes become 0.
    pub fn normalized(self) -> Self {
        Self {
            lift: clamp_axis(self.lift),
            forward: clamp_axis(self.forward),
            side: clamp_axis(self.side),
        }
    }

    /// Whether the occupant is pushing the throttle.
    #[inline]
    pub fn is_throttling(&self) -> bool {
        self.forward > 0.0
    }
}

#[inline]
fn clamp_axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-MAX_AXIS, MAX_AXIS)
    } else {
        0.0
    }
}

/// Host state read by the integrator for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Ground-contact test result
    pub on_ground: bool,
    /// Terrain class at the vehicle's position
    pub terrain: TerrainClass,
    /// A controlling occupant is present
    pub occupied: bool,
    /// Engine can run (fuel, not destroyed, ...)
    pub engine_powered: bool,
}

impl Environment {
    /// Grounded on road with nobody aboard.
    pub const PARKED: Self = Self {
        on_ground: true,
        terrain: TerrainClass::Road,
        occupied: false,
        engine_powered: true,
    };

    /// Airborne with a pilot and a running engine.
    pub const PILOTED_AIRBORNE: Self = Self {
        on_ground: false,
        terrain: TerrainClass::Road,
        occupied: true,
        engine_powered: true,
    };

    /// Occupied and able to drive.
    #[inline]
    pub fn can_drive(&self) -> bool {
        self.occupied && self.engine_powered
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::PARKED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_axes() {
        let input = ControlInput::new(3.0, -7.5, 0.25).normalized();
        assert_eq!(input, ControlInput::new(1.0, -1.0, 0.25));
    }

    #[test]
    fn test_normalized_drops_non_finite() {
        let input = ControlInput::new(f32::NAN, f32::INFINITY, -0.5).normalized();
        assert_eq!(input, ControlInput::new(0.0, 0.0, -0.5));
    }

    #[test]
    fn test_throttle() {
        assert!(!ControlInput::IDLE.is_throttling());
        assert!(ControlInput::new(0.0, 0.1, 0.0).is_throttling());
        assert!(!ControlInput::new(0.0, -1.0, 0.0).is_throttling());
    }

    #[test]
    fn test_binary_size() {
        let bytes = bincode::serialize(&ControlInput::new(1.0, 0.5, -0.5)).unwrap();
        assert_eq!(bytes.len(), ControlInput::SIZE);
    }

    #[test]
    fn test_can_drive() {
        assert!(!Environment::PARKED.can_drive());
        assert!(Environment::PILOTED_AIRBORNE.can_drive());
        let no_fuel = Environment { engine_powered: false, ..Environment::PILOTED_AIRBORNE };
        assert!(!no_fuel.can_drive());
    }
}
