//! Persistence Adapter
//!
//! Converts the durable subset of a vehicle's physics state to and from a
//! tagged key-value record, and encodes the narrower spawn snapshot sent
//! to newly observing clients.
//!
//! ## Record layout
//!
//! ```text
//! {
//!   "Lift":      Float,
//!   "PlaneRoll": Float,
//!   "Velocity":  { "X": Double, "Y": Double, "Z": Double }
//! }
//! ```
//!
//! Propeller speed and flap angle are transient and never written; they
//! regenerate from the next tick's control input.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use glam::DVec3;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::vehicle::state::VehicleState;

/// Record key for the lift command.
pub const KEY_LIFT: &str = "Lift";
/// Record key for plane roll.
pub const KEY_ROLL: &str = "PlaneRoll";
/// Record key for the velocity compound.
pub const KEY_VELOCITY: &str = "Velocity";

const AXES: [&str; 3] = ["X", "Y", "Z"];

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// A field holds a different tag type than expected.
    #[error("field {key} is not a {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Tag type the reader wanted
        expected: &'static str,
    },
    /// Velocity compound present without all three axes.
    #[error("velocity record is missing axis {missing}")]
    IncompleteVelocity {
        /// First absent axis
        missing: &'static str,
    },
    /// A stored number is NaN or infinite.
    #[error("field {key} is not finite")]
    NonFinite {
        /// Offending key
        key: String,
    },
    /// Buffer ended early.
    #[error("buffer truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        remaining: usize,
    },
    /// JSON encoding failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Binary encoding failed.
    #[error("binary: {0}")]
    Binary(#[from] bincode::Error),
}

// =============================================================================
// TAGGED RECORD
// =============================================================================

/// A typed value stored in a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Nested record
    Compound(Compound),
}

impl Tag {
    fn type_name(&self) -> &'static str {
        match self {
            Tag::Float(_) => "float",
            Tag::Double(_) => "double",
            Tag::Compound(_) => "compound",
        }
    }
}

/// A named collection of tags with deterministic key order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compound {
    entries: BTreeMap<String, Tag>,
}

impl Compound {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) {
        self.entries.insert(key.into(), tag);
    }

    /// Raw tag at `key`.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning its tag.
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Float at `key`, or `None` if absent.
    pub fn get_float(&self, key: &str) -> Result<Option<f32>, PersistError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Tag::Float(v)) => Ok(Some(*v)),
            Some(_) => Err(wrong_type(key, "float")),
        }
    }

    /// Double at `key`, or `None` if absent.
    pub fn get_double(&self, key: &str) -> Result<Option<f64>, PersistError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Tag::Double(v)) => Ok(Some(*v)),
            Some(_) => Err(wrong_type(key, "double")),
        }
    }

    /// Nested compound at `key`, or `None` if absent.
    pub fn get_compound(&self, key: &str) -> Result<Option<&Compound>, PersistError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Tag::Compound(c)) => Ok(Some(c)),
            Some(other) => {
                tracing::trace!(key, found = other.type_name(), "unexpected tag");
                Err(wrong_type(key, "compound"))
            }
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PersistError> {
        Ok(bincode::deserialize(data)?)
    }
}

fn wrong_type(key: &str, expected: &'static str) -> PersistError {
    PersistError::WrongType { key: key.to_string(), expected }
}

// =============================================================================
// SAVE / LOAD
// =============================================================================

/// Write the durable physics subset of `state`.
pub fn save_record(state: &VehicleState) -> Compound {
    use crate::vehicle::synced::FieldKey;

    let mut velocity = Compound::new();
    velocity.insert("X", Tag::Double(state.velocity.x));
    velocity.insert("Y", Tag::Double(state.velocity.y));
    velocity.insert("Z", Tag::Double(state.velocity.z));

    let mut record = Compound::new();
    record.insert(KEY_LIFT, Tag::Float(state.fields.local_value(FieldKey::Lift)));
    record.insert(KEY_ROLL, Tag::Float(state.fields.local_value(FieldKey::Roll)));
    record.insert(KEY_VELOCITY, Tag::Compound(velocity));
    record
}

/// Fields parsed out of a record before anything is applied.
struct LoadedRecord {
    lift: Option<f32>,
    roll: f32,
    velocity: DVec3,
}

fn read_velocity(record: &Compound) -> Result<DVec3, PersistError> {
    let Some(velocity) = record.get_compound(KEY_VELOCITY)? else {
        return Ok(DVec3::ZERO);
    };

    let mut axes = [0.0f64; 3];
    for (slot, axis) in axes.iter_mut().zip(AXES) {
        let value = velocity
            .get_double(axis)?
            .ok_or(PersistError::IncompleteVelocity { missing: axis })?;
        if !value.is_finite() {
            return Err(non_finite(&format!("{}.{}", KEY_VELOCITY, axis)));
        }
        *slot = value;
    }
    Ok(DVec3::from_array(axes))
}

fn read_finite_float(record: &Compound, key: &str) -> Result<Option<f32>, PersistError> {
    match record.get_float(key)? {
        Some(value) if !value.is_finite() => Err(non_finite(key)),
        value => Ok(value),
    }
}

fn non_finite(key: &str) -> PersistError {
    PersistError::NonFinite { key: key.to_string() }
}

fn parse_record(record: &Compound) -> Result<LoadedRecord, PersistError> {
    Ok(LoadedRecord {
        lift: read_finite_float(record, KEY_LIFT)?,
        roll: read_finite_float(record, KEY_ROLL)?.unwrap_or(0.0),
        velocity: read_velocity(record)?,
    })
}

/// Restore velocity, roll and lift from `record`.
///
/// The whole record is validated before `state` is touched: on error the
/// state is left exactly as it was.
pub fn load_record(state: &mut VehicleState, record: &Compound) -> Result<(), PersistError> {
    let loaded = parse_record(record)?;

    if let Some(lift) = loaded.lift {
        state.set_lift(lift);
    }
    state.set_roll(loaded.roll);
    state.velocity = loaded.velocity;
    Ok(())
}

// =============================================================================
// SPAWN SNAPSHOT
// =============================================================================

/// Velocity sent to a client when it starts observing a vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnSnapshot {
    pub velocity: DVec3,
}

impl SpawnSnapshot {
    /// Size in bytes on the wire
    pub const SIZE: usize = 24;

    /// Snapshot of `state`.
    pub fn of(state: &VehicleState) -> Self {
        Self { velocity: state.velocity }
    }

    /// Append X, Y, Z as big-endian float64 after the base spawn fields.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(Self::SIZE);
        buf.put_f64(self.velocity.x);
        buf.put_f64(self.velocity.y);
        buf.put_f64(self.velocity.z);
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Read the triplet from the front of `buf`.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, PersistError> {
        if buf.remaining() < Self::SIZE {
            return Err(PersistError::Truncated {
                needed: Self::SIZE,
                remaining: buf.remaining(),
            });
        }
        let x = buf.get_f64();
        let y = buf.get_f64();
        let z = buf.get_f64();
        Ok(Self { velocity: DVec3::new(x, y, z) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::motion::Archetype;
    use crate::vehicle::synced::{Side, SyncedFields};
    use proptest::prelude::*;

    fn plane_state() -> VehicleState {
        let fields = SyncedFields::new(Side::Authority, Archetype::Plane.synced_keys());
        VehicleState::new(DVec3::ZERO, 0.0, fields)
    }

    #[test]
    fn test_record_layout() {
        let mut state = plane_state();
        state.velocity = DVec3::new(1.0, -2.0, 0.5);
        state.set_roll(30.0);
        state.set_lift(-1.0);

        let record = save_record(&state);
        assert_eq!(record.get_float(KEY_LIFT).unwrap(), Some(-1.0));
        assert_eq!(record.get_float(KEY_ROLL).unwrap(), Some(30.0));
        let velocity = record.get_compound(KEY_VELOCITY).unwrap().unwrap();
        assert_eq!(velocity.get_double("Y").unwrap(), Some(-2.0));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_transient_fields_not_persisted() {
        let mut state = plane_state();
        state.propeller_speed = 150.0;
        state.flap_angle = 12.0;

        let mut restored = plane_state();
        load_record(&mut restored, &save_record(&state)).unwrap();
        assert_eq!(restored.propeller_speed, 0.0);
        assert_eq!(restored.flap_angle, 0.0);
    }

    #[test]
    fn test_missing_lift_keeps_current() {
        let mut source = plane_state();
        source.set_roll(10.0);
        let mut record = save_record(&source);
        record.remove(KEY_LIFT);

        let mut state = plane_state();
        state.set_lift(0.75);
        load_record(&mut state, &record).unwrap();
        assert_eq!(state.lift(), 0.75);
        assert_eq!(state.roll(), 10.0);
    }

    #[test]
    fn test_empty_record_defaults() {
        let mut state = plane_state();
        state.velocity = DVec3::new(3.0, 3.0, 3.0);
        state.set_roll(45.0);

        load_record(&mut state, &Compound::new()).unwrap();
        assert_eq!(state.velocity, DVec3::ZERO);
        assert_eq!(state.roll(), 0.0);
    }

    #[test]
    fn test_partial_velocity_rejected() {
        let mut velocity = Compound::new();
        velocity.insert("X", Tag::Double(1.0));
        velocity.insert("Z", Tag::Double(1.0));
        let mut record = Compound::new();
        record.insert(KEY_VELOCITY, Tag::Compound(velocity));

        let mut state = plane_state();
        let result = load_record(&mut state, &record);
        assert!(matches!(result, Err(PersistError::IncompleteVelocity { missing: "Y" })));
    }

    #[test]
    fn test_wrong_type_leaves_state_untouched() {
        let mut record = Compound::new();
        record.insert(KEY_ROLL, Tag::Float(60.0));
        record.insert(KEY_LIFT, Tag::Double(1.0));

        let mut state = plane_state();
        state.set_roll(-5.0);
        let result = load_record(&mut state, &record);
        assert!(matches!(result, Err(PersistError::WrongType { expected: "float", .. })));
        assert_eq!(state.roll(), -5.0);
    }

    #[test]
    fn test_non_finite_roll_rejected_from_bytes() {
        let mut source = plane_state();
        source.velocity = DVec3::new(0.2, 0.0, 0.4);
        let mut record = save_record(&source);
        record.insert(KEY_ROLL, Tag::Float(f32::INFINITY));
        let decoded = Compound::from_bytes(&record.to_bytes().unwrap()).unwrap();

        let mut state = plane_state();
        state.set_roll(-5.0);
        let result = load_record(&mut state, &decoded);
        assert!(matches!(result, Err(PersistError::NonFinite { ref key }) if key == KEY_ROLL));
        assert_eq!(state.roll(), -5.0);
        assert_eq!(state.velocity, DVec3::ZERO);
    }

    #[test]
    fn test_non_finite_velocity_rejected() {
        let mut source = plane_state();
        source.velocity = DVec3::new(f64::NAN, 0.0, 1.0);
        let record = Compound::from_bytes(&save_record(&source).to_bytes().unwrap()).unwrap();

        let mut state = plane_state();
        state.set_lift(0.5);
        let result = load_record(&mut state, &record);
        assert!(matches!(result, Err(PersistError::NonFinite { ref key }) if key == "Velocity.X"));
        assert_eq!(state.lift(), 0.5);

        let mut lift_record = Compound::new();
        lift_record.insert(KEY_LIFT, Tag::Float(f32::NEG_INFINITY));
        assert!(matches!(load_record(&mut state, &lift_record), Err(PersistError::NonFinite { .. })));
        assert_eq!(state.lift(), 0.5);
    }

    #[test]
    fn test_velocity_must_be_compound() {
        let mut record = Compound::new();
        record.insert(KEY_VELOCITY, Tag::Double(0.0));
        let mut state = plane_state();
        assert!(matches!(
            load_record(&mut state, &record),
            Err(PersistError::WrongType { expected: "compound", .. })
        ));
    }

    #[test]
    fn test_record_survives_json() {
        let mut state = plane_state();
        state.velocity = DVec3::new(0.1, 0.2, 0.3);
        let record = save_record(&state);

        let json = record.to_json().unwrap();
        assert!(json.contains("\"PlaneRoll\""));
        assert_eq!(Compound::from_json(&json).unwrap(), record);
        assert_eq!(Compound::from_bytes(&record.to_bytes().unwrap()).unwrap(), record);
    }

    #[test]
    fn test_spawn_snapshot_wire_order() {
        let snapshot = SpawnSnapshot { velocity: DVec3::new(1.0, 2.0, -0.5) };
        let bytes = snapshot.to_bytes();
        assert_eq!(bytes.len(), SpawnSnapshot::SIZE);
        assert_eq!(&bytes[..8], &1.0f64.to_be_bytes());
        assert_eq!(&bytes[16..], &(-0.5f64).to_be_bytes());
    }

    #[test]
    fn test_spawn_snapshot_after_base_fields() {
        let mut buf = BytesMut::new();
        buf.put_u32(0xCAFE);
        SpawnSnapshot { velocity: DVec3::new(0.0, -0.05, 0.7) }.encode(&mut buf);

        let mut read = buf.freeze();
        assert_eq!(read.get_u32(), 0xCAFE);
        let snapshot = SpawnSnapshot::decode(&mut read).unwrap();
        assert_eq!(snapshot.velocity, DVec3::new(0.0, -0.05, 0.7));
        assert!(!read.has_remaining());
    }

    #[test]
    fn test_spawn_snapshot_truncated() {
        let mut short = Bytes::from_static(&[0u8; 20]);
        let result = SpawnSnapshot::decode(&mut short);
        assert!(matches!(result, Err(PersistError::Truncated { needed: 24, remaining: 20 })));
    }

    proptest! {
        #[test]
        fn prop_save_load_idempotent(
            x in -1.0e6f64..1.0e6,
            y in -1.0e6f64..1.0e6,
            z in -1.0e6f64..1.0e6,
            roll in -180.0f32..180.0,
            zero in any::<bool>(),
        ) {
            let mut state = plane_state();
            state.velocity = if zero { DVec3::ZERO } else { DVec3::new(x, y, z) };
            state.set_roll(roll);

            let mut restored = plane_state();
            load_record(&mut restored, &save_record(&state)).unwrap();
            prop_assert_eq!(restored.velocity, state.velocity);
            prop_assert_eq!(restored.roll(), state.roll());
        }
    }
}
