//! Synchronized Properties
//!
//! A synchronized value keeps two copies of one scalar:
//!
//! - the **local** copy, last written on this side
//! - the **replicated** copy, last value published by (authority) or
//!   received from (observer) the replication channel
//!
//! Only the authority's writes are queued for replication. An observer may
//! write its local copy (the controlling client's own input) but that never
//! reaches the authoritative state; the input travels as a separate
//! control message instead.

use serde::{Serialize, Deserialize};

/// Which side of the replication channel a value lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Owns the state; runs the simulation tick.
    Authority,
    /// Mirrors the state; never mutates authoritative values.
    Observer,
}

// =============================================================================
// SYNCED VALUE
// =============================================================================

/// A single value mirrored between the authority and its observers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncedValue<T> {
    local: T,
    replicated: T,
    #[serde(skip)]
    dirty: bool,
}

impl<T: Copy + PartialEq> SyncedValue<T> {
    /// Create a value whose copies both start at `initial`.
    pub const fn new(initial: T) -> Self {
        Self {
            local: initial,
            replicated: initial,
            dirty: false,
        }
    }

    /// Most recently known value for `side`.
    ///
    /// The authority reads its own copy; an observer reads what was last
    /// replicated to it.
    #[inline]
    pub fn get(&self, side: Side) -> T {
        match side {
            Side::Authority => self.local,
            Side::Observer => self.replicated,
        }
    }

    /// Write a new value from `side`.
    ///
    /// On the authority this stamps the value for the next replication
    /// flush. On an observer only the local copy changes.
    #[inline]
    pub fn set(&mut self, side: Side, value: T) {
        self.local = value;
        if side == Side::Authority {
            self.dirty = true;
        }
    }

    /// Raw last-written value, without regard to replication.
    #[inline]
    pub fn local_value(&self) -> T {
        self.local
    }

    /// Whether the authority has a write not yet published.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.dirty && self.local != self.replicated
    }

    /// Publish a pending authoritative write, returning the published value.
    pub fn take_pending(&mut self) -> Option<T> {
        let pending = self.is_pending();
        self.dirty = false;
        if pending {
            self.replicated = self.local;
            Some(self.local)
        } else {
            None
        }
    }

    /// Accept a value from the replication channel (observer side).
    #[inline]
    pub fn receive(&mut self, value: T) {
        self.replicated = value;
    }
}

impl<T: Copy + PartialEq + Default> Default for SyncedValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// =============================================================================
// FIELD REGISTRY
// =============================================================================

/// Name of a synchronized scalar field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FieldKey {
    /// Lift command (-1 to 1)
    Lift = 0,
    /// Forward / throttle input (-1 to 1)
    ForwardInput = 1,
    /// Side / steering input (-1 to 1)
    SideInput = 2,
    /// Plane roll in degrees, wrapped to [-180, 180)
    Roll = 3,
    /// Front wheel steering angle in degrees
    WheelAngle = 4,
}

/// One replicated field change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    /// Field being updated
    pub key: FieldKey,
    /// New value
    pub value: f32,
}

/// The synchronized fields of one vehicle.
///
/// Every archetype declares the subset of keys it replicates when the
/// vehicle is constructed; undeclared keys are never flushed or accepted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncedFields {
    side: Side,
    declared: Vec<FieldKey>,
    lift: SyncedValue<f32>,
    forward_input: SyncedValue<f32>,
    side_input: SyncedValue<f32>,
    roll: SyncedValue<f32>,
    wheel_angle: SyncedValue<f32>,
}

impl SyncedFields {
    /// Create a zeroed field set for `side` replicating `declared`.
    pub fn new(side: Side, declared: &[FieldKey]) -> Self {
        Self {
            side,
            declared: declared.to_vec(),
            lift: SyncedValue::new(0.0),
            forward_input: SyncedValue::new(0.0),
            side_input: SyncedValue::new(0.0),
            roll: SyncedValue::new(0.0),
            wheel_angle: SyncedValue::new(0.0),
        }
    }

    /// Side these fields live on.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Keys this vehicle replicates.
    pub fn declared(&self) -> &[FieldKey] {
        &self.declared
    }

    /// Whether `key` is part of this vehicle's declared set.
    pub fn declares(&self, key: FieldKey) -> bool {
        self.declared.contains(&key)
    }

    fn field(&self, key: FieldKey) -> &SyncedValue<f32> {
        match key {
            FieldKey::Lift => &self.lift,
            FieldKey::ForwardInput => &self.forward_input,
            FieldKey::SideInput => &self.side_input,
            FieldKey::Roll => &self.roll,
            FieldKey::WheelAngle => &self.wheel_angle,
        }
    }

    fn field_mut(&mut self, key: FieldKey) -> &mut SyncedValue<f32> {
        match key {
            FieldKey::Lift => &mut self.lift,
            FieldKey::ForwardInput => &mut self.forward_input,
            FieldKey::SideInput => &mut self.side_input,
            FieldKey::Roll => &mut self.roll,
            FieldKey::WheelAngle => &mut self.wheel_angle,
        }
    }

    /// Most recently known value of `key` on this side.
    #[inline]
    pub fn get(&self, key: FieldKey) -> f32 {
        self.field(key).get(self.side)
    }

    /// Write `key` from this side.
    #[inline]
    pub fn set(&mut self, key: FieldKey, value: f32) {
        let side = self.side;
        self.field_mut(key).set(side, value);
    }

    /// Raw last-written value of `key`.
    #[inline]
    pub fn local_value(&self, key: FieldKey) -> f32 {
        self.field(key).local_value()
    }

    /// Publish every pending authoritative write of a declared key.
    ///
    /// Observers never have anything to publish.
    pub fn drain_updates(&mut self) -> Vec<PropertyUpdate> {
        if self.side != Side::Authority {
            return Vec::new();
        }
        let mut updates = Vec::new();
        for i in 0..self.declared.len() {
            let key = self.declared[i];
            if let Some(value) = self.field_mut(key).take_pending() {
                updates.push(PropertyUpdate { key, value });
            }
        }
        updates
    }

    /// Current value of every declared key, for spawn replication.
    pub fn snapshot(&self) -> Vec<PropertyUpdate> {
        self.declared
            .iter()
            .map(|&key| PropertyUpdate { key, value: self.get(key) })
            .collect()
    }

    /// Apply a replicated update (observer side).
    ///
    /// Returns false if the key is not declared by this vehicle or this
    /// is the authority, in which case nothing changes.
    pub fn apply_update(&mut self, update: PropertyUpdate) -> bool {
        if self.side != Side::Observer || !self.declares(update.key) {
            return false;
        }
        self.field_mut(update.key).receive(update.value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANE_KEYS: [FieldKey; 4] = [
        FieldKey::Lift,
        FieldKey::ForwardInput,
        FieldKey::SideInput,
        FieldKey::Roll,
    ];

    #[test]
    fn test_authority_write_is_pending_until_taken() {
        let mut value = SyncedValue::new(0.0f32);
        value.set(Side::Authority, 2.5);

        assert_eq!(value.get(Side::Authority), 2.5);
        assert!(value.is_pending());
        assert_eq!(value.take_pending(), Some(2.5));
        assert!(!value.is_pending());
        assert_eq!(value.take_pending(), None);
    }

    #[test]
    fn test_observer_reads_replicated_copy() {
        let mut value = SyncedValue::new(0.0f32);
        value.set(Side::Observer, 0.7);

        // Observer's own write stays local
        assert_eq!(value.local_value(), 0.7);
        assert_eq!(value.get(Side::Observer), 0.0);

        value.receive(0.4);
        assert_eq!(value.get(Side::Observer), 0.4);
        assert_eq!(value.local_value(), 0.7);
    }

    #[test]
    fn test_drain_only_declared_and_changed() {
        let mut fields = SyncedFields::new(Side::Authority, &PLANE_KEYS);
        fields.set(FieldKey::Roll, -10.0);
        fields.set(FieldKey::WheelAngle, 12.0);
        fields.set(FieldKey::Lift, 0.0);

        let updates = fields.drain_updates();
        assert_eq!(updates, vec![PropertyUpdate { key: FieldKey::Roll, value: -10.0 }]);
        assert!(fields.drain_updates().is_empty());
    }

    #[test]
    fn test_observer_never_publishes() {
        let mut fields = SyncedFields::new(Side::Observer, &PLANE_KEYS);
        fields.set(FieldKey::Lift, 1.0);
        assert!(fields.drain_updates().is_empty());
        assert_eq!(fields.get(FieldKey::Lift), 0.0);
        assert_eq!(fields.local_value(FieldKey::Lift), 1.0);
    }

    #[test]
    fn test_authority_drain_feeds_observer() {
        let mut authority = SyncedFields::new(Side::Authority, &PLANE_KEYS);
        let mut observer = SyncedFields::new(Side::Observer, &PLANE_KEYS);

        authority.set(FieldKey::Roll, 35.0);
        authority.set(FieldKey::SideInput, -1.0);
        for update in authority.drain_updates() {
            assert!(observer.apply_update(update));
        }

        assert_eq!(observer.get(FieldKey::Roll), 35.0);
        assert_eq!(observer.get(FieldKey::SideInput), -1.0);
    }

    #[test]
    fn test_apply_rejects_undeclared_and_authority() {
        let mut observer = SyncedFields::new(Side::Observer, &PLANE_KEYS);
        assert!(!observer.apply_update(PropertyUpdate { key: FieldKey::WheelAngle, value: 3.0 }));

        let mut authority = SyncedFields::new(Side::Authority, &PLANE_KEYS);
        assert!(!authority.apply_update(PropertyUpdate { key: FieldKey::Roll, value: 3.0 }));
        assert_eq!(authority.get(FieldKey::Roll), 0.0);
    }

    #[test]
    fn test_snapshot_lists_declared_keys() {
        let fields = SyncedFields::new(Side::Authority, &PLANE_KEYS);
        let keys: Vec<_> = fields.snapshot().iter().map(|u| u.key).collect();
        assert_eq!(keys, PLANE_KEYS.to_vec());
    }
}
