//! Motion Integrators
//!
//! One `MotionProfile` per vehicle archetype. A profile advances a
//! `VehicleState` by exactly one fixed tick from a control input and a
//! read-only environment snapshot, and reports what the host should apply.
//!
//! ## Profiles
//!
//! - `plane`: flight model (roll, propeller, flaps, lift)
//! - `land`: wheeled model (steering, traction table)
//!
//! Profiles never fail: degenerate inputs are clamped.

pub mod land;
pub mod plane;

use std::fmt;

use glam::DVec3;
use serde::{Serialize, Deserialize};

use crate::vehicle::input::{ControlInput, Environment};
use crate::vehicle::properties::VehicleProperties;
use crate::vehicle::state::{BodyRotation, FlightMode, VehicleState};
use crate::vehicle::synced::FieldKey;

pub use land::LandProfile;
pub use plane::PlaneProfile;

/// Seconds per tick at the host's 20 Hz rate; scales per-second forces.
pub const TICK_SCALE: f64 = 0.05;

/// World-level constants shared by every profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConstants {
    /// Downward acceleration in blocks per tick squared
    pub gravity: f64,
    /// Ground friction before the wheel/terrain factor
    pub ground_friction: f32,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            gravity: 0.05,
            ground_friction: 0.8,
        }
    }
}

/// Engine sound scalars for the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineAudio {
    pub pitch: f32,
    pub volume: f32,
}

/// Volume used when the engine is off or nobody is aboard.
pub const SILENT_VOLUME: f32 = 0.001;

/// Result of one integration step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionOutput {
    /// Displacement to apply this tick
    pub displacement: DVec3,
    /// Heading pitch after the tick
    pub pitch: f32,
    /// Heading yaw after the tick
    pub yaw: f32,
    /// Roll after the tick
    pub roll: f32,
    /// Smoothed body orientation
    pub body: BodyRotation,
    /// Engine sound scalars
    pub audio: EngineAudio,
    /// Mode this tick ran in
    pub mode: FlightMode,
}

impl MotionOutput {
    fn from_state(state: &VehicleState, audio: EngineAudio, mode: FlightMode) -> Self {
        Self {
            displacement: state.velocity,
            pitch: state.pitch,
            yaw: state.yaw,
            roll: state.roll(),
            body: state.body,
            audio,
            mode,
        }
    }
}

/// Per-archetype motion behaviour.
pub trait MotionProfile: fmt::Debug + Send + Sync {
    /// Archetype this profile implements.
    fn archetype(&self) -> Archetype;

    /// Tuning values in use.
    fn properties(&self) -> &VehicleProperties;

    /// Advance `state` by one tick.
    fn integrate(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment) -> MotionOutput;

    /// Engine sound scalars for the current state.
    fn engine_audio(&self, state: &VehicleState, env: &Environment) -> EngineAudio;

    /// Whether landing hard hurts the occupants.
    fn takes_fall_damage(&self) -> bool {
        true
    }

    /// Whether the wheels can be swapped.
    fn can_change_wheels(&self) -> bool {
        true
    }
}

// =============================================================================
// ARCHETYPE
// =============================================================================

/// Vehicle archetype, selecting the motion profile and replicated fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Archetype {
    /// Propeller plane
    Plane = 0,
    /// Two-wheeled moped
    Moped = 1,
}

const PLANE_FIELDS: [FieldKey; 4] = [
    FieldKey::Lift,
    FieldKey::ForwardInput,
    FieldKey::SideInput,
    FieldKey::Roll,
];

const MOPED_FIELDS: [FieldKey; 3] = [
    FieldKey::ForwardInput,
    FieldKey::SideInput,
    FieldKey::WheelAngle,
];

impl Archetype {
    /// Synchronized fields every instance of this archetype declares.
    pub fn synced_keys(self) -> &'static [FieldKey] {
        match self {
            Archetype::Plane => &PLANE_FIELDS,
            Archetype::Moped => &MOPED_FIELDS,
        }
    }

    /// Default tuning values.
    pub fn default_properties(self) -> VehicleProperties {
        match self {
            Archetype::Plane => VehicleProperties::plane(),
            Archetype::Moped => VehicleProperties::moped(),
        }
    }

    /// Build the motion profile for this archetype.
    pub fn profile(self, properties: VehicleProperties, constants: PhysicsConstants) -> Box<dyn MotionProfile> {
        match self {
            Archetype::Plane => Box::new(PlaneProfile::new(properties, constants)),
            Archetype::Moped => Box::new(LandProfile::new(properties, constants)),
        }
    }

    /// Lowercase name for logs and properties files.
    pub fn name(self) -> &'static str {
        match self {
            Archetype::Plane => "plane",
            Archetype::Moped => "moped",
        }
    }
}
