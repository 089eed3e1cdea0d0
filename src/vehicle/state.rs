//! Vehicle State Definitions
//!
//! The per-instance state the motion integrator advances. One
//! `VehicleState` exists per spawned vehicle and is dropped when the
//! vehicle leaves the world.

use glam::DVec3;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::vehicle::input::ControlInput;
use crate::vehicle::synced::{FieldKey, Side, SyncedFields};

// =============================================================================
// VEHICLE ID
// =============================================================================

/// Unique vehicle identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub [u8; 16]);

impl VehicleId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create a fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

// =============================================================================
// FLIGHT MODE
// =============================================================================

/// Macro-state chosen each tick by the ground-contact test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightMode {
    /// In contact with the ground
    #[default]
    Grounded,
    /// No ground contact
    Airborne,
}

impl FlightMode {
    /// Mode for a ground-contact test result.
    #[inline]
    pub fn from_ground_contact(on_ground: bool) -> Self {
        if on_ground {
            FlightMode::Grounded
        } else {
            FlightMode::Airborne
        }
    }

    #[inline]
    pub fn is_airborne(self) -> bool {
        self == FlightMode::Airborne
    }
}

// =============================================================================
// BODY ROTATION
// =============================================================================

/// Smoothed body orientation handed to the host, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyRotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

// =============================================================================
// VEHICLE STATE
// =============================================================================

/// Physics state of a single vehicle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleState {
    /// World position
    pub position: DVec3,

    /// Heading yaw in degrees
    pub yaw: f32,

    /// Heading pitch in degrees (positive = nose down)
    pub pitch: f32,

    /// Velocity in blocks per tick
    pub velocity: DVec3,

    /// Replicated scalar fields (lift, inputs, roll, ...)
    pub fields: SyncedFields,

    // =========================================================================
    // Transient state (regenerated from inputs, never persisted)
    // =========================================================================

    /// Propeller / rotor speed
    pub propeller_speed: f32,

    /// Current flap deflection in degrees
    pub flap_angle: f32,

    /// Smoothed body orientation
    pub body: BodyRotation,

    /// Mode at the end of the previous tick
    pub mode: FlightMode,
}

impl VehicleState {
    /// Create a state at rest at `position` facing `yaw`.
    pub fn new(position: DVec3, yaw: f32, fields: SyncedFields) -> Self {
        Self {
            position,
            yaw,
            pitch: 0.0,
            velocity: DVec3::ZERO,
            fields,
            propeller_speed: 0.0,
            flap_angle: 0.0,
            body: BodyRotation { pitch: 0.0, yaw, roll: 0.0 },
            mode: FlightMode::Grounded,
        }
    }

    /// Side this state lives on.
    #[inline]
    pub fn side(&self) -> Side {
        self.fields.side()
    }

    #[inline]
    pub fn lift(&self) -> f32 {
        self.fields.get(FieldKey::Lift)
    }

    #[inline]
    pub fn set_lift(&mut self, lift: f32) {
        self.fields.set(FieldKey::Lift, lift);
    }

    #[inline]
    pub fn roll(&self) -> f32 {
        self.fields.get(FieldKey::Roll)
    }

    #[inline]
    pub fn set_roll(&mut self, roll: f32) {
        self.fields.set(FieldKey::Roll, roll);
    }

    #[inline]
    pub fn wheel_angle(&self) -> f32 {
        self.fields.get(FieldKey::WheelAngle)
    }

    #[inline]
    pub fn set_wheel_angle(&mut self, angle: f32) {
        self.fields.set(FieldKey::WheelAngle, angle);
    }

    /// Current control input as held in the synchronized fields.
    pub fn controls(&self) -> ControlInput {
        ControlInput {
            lift: self.fields.get(FieldKey::Lift),
            forward: self.fields.get(FieldKey::ForwardInput),
            side: self.fields.get(FieldKey::SideInput),
        }
    }

    /// Store a control input in the synchronized fields.
    pub fn set_controls(&mut self, input: ControlInput) {
        self.fields.set(FieldKey::Lift, input.lift);
        self.fields.set(FieldKey::ForwardInput, input.forward);
        self.fields.set(FieldKey::SideInput, input.side);
    }

    /// Speed in blocks per tick.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Hash the replicated physics subset.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_dvec3(self.velocity);
        hasher.update_f32(self.roll());
        hasher.update_f32(self.lift());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_fields() -> SyncedFields {
        SyncedFields::new(
            Side::Authority,
            &[FieldKey::Lift, FieldKey::ForwardInput, FieldKey::SideInput, FieldKey::Roll],
        )
    }

    #[test]
    fn test_vehicle_id_ordering() {
        let id1 = VehicleId::new([0; 16]);
        let id2 = VehicleId::new([1; 16]);
        assert!(id1 < id2);
    }

    #[test]
    fn test_vehicle_id_uuid_roundtrip() {
        let id = VehicleId::random();
        let parsed = VehicleId::from_uuid_str(&id.to_uuid_string()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_controls_through_fields() {
        let mut state = VehicleState::new(DVec3::ZERO, 0.0, plane_fields());
        state.set_controls(ControlInput::new(0.5, 1.0, -1.0));
        assert_eq!(state.controls(), ControlInput::new(0.5, 1.0, -1.0));
        assert_eq!(state.lift(), 0.5);
    }

    #[test]
    fn test_flight_mode_from_contact() {
        assert_eq!(FlightMode::from_ground_contact(true), FlightMode::Grounded);
        assert!(FlightMode::from_ground_contact(false).is_airborne());
    }
}
