//! Authoritative World
//!
//! The per-session set of vehicles. A world tick advances every vehicle
//! once, in id order, on the calling thread; nothing else touches a
//! vehicle while the tick runs. Save and load happen between ticks.
//!
//! Each tick:
//! 1. Read the host environment for the vehicle (occupancy comes from the
//!    world's controller table)
//! 2. Integrate one step with the vehicle's current controls
//! 3. Apply the displacement and emit take-off / landing events
//! 4. Drain pending replicated field writes
//! 5. Digest the replicated physics state of every vehicle

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::hash::{compute_state_hash, StateHash};
use crate::vehicle::events::VehicleEvent;
use crate::vehicle::input::{ControlInput, Environment};
use crate::vehicle::motion::{Archetype, MotionOutput, MotionProfile, PhysicsConstants};
use crate::vehicle::persist::{self, Compound, SpawnSnapshot};
use crate::vehicle::properties::VehicleProperties;
use crate::vehicle::state::{VehicleId, VehicleState};
use crate::vehicle::synced::{PropertyUpdate, Side, SyncedFields};

/// Identifier of a connected client.
pub type ClientId = u64;

/// World errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// No vehicle with this id.
    #[error("unknown vehicle {}", .0.to_uuid_string())]
    UnknownVehicle(VehicleId),
    /// Sender is not the vehicle's controlling occupant.
    #[error("client is not the controller of vehicle {}", .0.to_uuid_string())]
    NotController(VehicleId),
}

/// One vehicle owned by the world.
#[derive(Debug)]
pub struct Vehicle {
    /// Physics state
    pub state: VehicleState,
    profile: Box<dyn MotionProfile>,
    controller: Option<ClientId>,
}

impl Vehicle {
    pub fn archetype(&self) -> Archetype {
        self.profile.archetype()
    }

    pub fn profile(&self) -> &dyn MotionProfile {
        self.profile.as_ref()
    }

    /// Controlling occupant, if any.
    pub fn controller(&self) -> Option<ClientId> {
        self.controller
    }
}

/// Everything a client needs to start observing a vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnInfo {
    pub vehicle_id: VehicleId,
    pub archetype: Archetype,
    pub position: DVec3,
    pub yaw: f32,
    pub snapshot: SpawnSnapshot,
    pub fields: Vec<PropertyUpdate>,
}

/// Result of a world tick.
#[derive(Debug, Default)]
pub struct WorldTick {
    /// Tick number just completed
    pub tick: u64,
    /// Host callbacks per vehicle
    pub outputs: Vec<(VehicleId, MotionOutput)>,
    /// Replicated field changes per vehicle
    pub updates: Vec<(VehicleId, Vec<PropertyUpdate>)>,
    /// Events generated this tick
    pub events: Vec<VehicleEvent>,
    /// Digest of every vehicle's replicated physics state
    pub state_hash: StateHash,
}

/// Authoritative vehicle world.
#[derive(Debug)]
pub struct World {
    tick: u64,
    constants: PhysicsConstants,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    properties: HashMap<Archetype, VehicleProperties>,
    pending_events: Vec<VehicleEvent>,
}

impl World {
    /// Create an empty world.
    pub fn new(constants: PhysicsConstants) -> Self {
        Self {
            tick: 0,
            constants,
            vehicles: BTreeMap::new(),
            properties: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Current tick.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn constants(&self) -> PhysicsConstants {
        self.constants
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Override the tuning used for vehicles spawned from now on.
    pub fn set_properties(&mut self, archetype: Archetype, properties: VehicleProperties) {
        self.properties.insert(archetype, properties);
    }

    /// Tuning for `archetype`.
    pub fn properties_for(&self, archetype: Archetype) -> VehicleProperties {
        self.properties
            .get(&archetype)
            .cloned()
            .unwrap_or_else(|| archetype.default_properties())
    }

    pub fn get(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn get_mut(&mut self, id: &VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    /// Vehicle ids in tick order.
    pub fn ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.keys().copied()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn a vehicle with a fresh random id.
    pub fn spawn(&mut self, archetype: Archetype, position: DVec3, yaw: f32) -> VehicleId {
        let id = VehicleId::random();
        self.spawn_with_id(id, archetype, position, yaw);
        id
    }

    /// Spawn a vehicle with a known id, replacing any vehicle holding it.
    pub fn spawn_with_id(&mut self, id: VehicleId, archetype: Archetype, position: DVec3, yaw: f32) {
        let fields = SyncedFields::new(Side::Authority, archetype.synced_keys());
        let profile = archetype.profile(self.properties_for(archetype), self.constants);
        let vehicle = Vehicle {
            state: VehicleState::new(position, yaw, fields),
            profile,
            controller: None,
        };
        self.vehicles.insert(id, vehicle);
        self.pending_events.push(VehicleEvent::spawned(self.tick, id, archetype));
        debug!("Vehicle {} spawned as {}", id.short(), archetype.name());
    }

    /// Remove a vehicle. Returns its final state.
    pub fn remove(&mut self, id: &VehicleId) -> Result<VehicleState, WorldError> {
        let vehicle = self.vehicles.remove(id).ok_or(WorldError::UnknownVehicle(*id))?;
        self.pending_events.push(VehicleEvent::removed(self.tick, *id));
        debug!("Vehicle {} removed", id.short());
        Ok(vehicle.state)
    }

    /// Spawn replication payload for `id`.
    pub fn spawn_info(&self, id: &VehicleId) -> Option<SpawnInfo> {
        let vehicle = self.vehicles.get(id)?;
        Some(SpawnInfo {
            vehicle_id: *id,
            archetype: vehicle.archetype(),
            position: vehicle.state.position,
            yaw: vehicle.state.yaw,
            snapshot: SpawnSnapshot::of(&vehicle.state),
            fields: vehicle.state.fields.snapshot(),
        })
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Seat `client` as the controlling occupant, or clear the seat.
    pub fn set_controller(&mut self, id: &VehicleId, client: Option<ClientId>) -> Result<(), WorldError> {
        let vehicle = self.vehicles.get_mut(id).ok_or(WorldError::UnknownVehicle(*id))?;
        vehicle.controller = client;
        if client.is_none() {
            vehicle.state.set_controls(ControlInput::IDLE);
        }
        Ok(())
    }

    /// Apply a control message from `client`.
    ///
    /// The input is normalized and written to the authoritative fields, so
    /// it replicates to observers with the next tick's updates.
    pub fn handle_control_input(
        &mut self,
        client: ClientId,
        id: &VehicleId,
        input: ControlInput,
    ) -> Result<(), WorldError> {
        let vehicle = self.vehicles.get_mut(id).ok_or(WorldError::UnknownVehicle(*id))?;
        if vehicle.controller != Some(client) {
            debug!("Rejected input for vehicle {} from client {}", id.short(), client);
            return Err(WorldError::NotController(*id));
        }
        vehicle.state.set_controls(input.normalized());
        Ok(())
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance every vehicle by one tick.
    ///
    /// `environments` supplies the host state per vehicle; a vehicle with
    /// no entry is treated as parked on a road.
    pub fn tick(&mut self, environments: &BTreeMap<VehicleId, Environment>) -> WorldTick {
        self.tick += 1;
        let tick = self.tick;

        let mut result = WorldTick {
            tick,
            events: std::mem::take(&mut self.pending_events),
            ..WorldTick::default()
        };

        for (id, vehicle) in self.vehicles.iter_mut() {
            let mut env = environments.get(id).copied().unwrap_or_default();
            env.occupied = vehicle.controller.is_some();

            let before = vehicle.state.mode;
            let input = vehicle.state.controls();
            let output = vehicle.profile.integrate(&mut vehicle.state, &input, &env);
            vehicle.state.position += output.displacement;

            #[cfg(feature = "debug-tracing")]
            tracing::trace!(
                "Vehicle {} tick {}: v={:?} roll={} prop={}",
                id.short(),
                tick,
                vehicle.state.velocity,
                vehicle.state.roll(),
                vehicle.state.propeller_speed,
            );

            if let Some(event) = VehicleEvent::transition(tick, *id, before, output.mode, vehicle.state.velocity) {
                debug!("Vehicle {} {}", id.short(), event.kind());
                result.events.push(event);
            }

            let updates = vehicle.state.fields.drain_updates();
            if !updates.is_empty() {
                result.updates.push((*id, updates));
            }
            result.outputs.push((*id, output));
        }

        result.state_hash = self.state_hash();
        result
    }

    /// Digest of the replicated physics state at the current tick.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            for (id, vehicle) in &self.vehicles {
                hasher.update_uuid(&id.0);
                vehicle.state.hash_into(hasher);
            }
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save the durable record of every vehicle.
    pub fn save_all(&self) -> BTreeMap<VehicleId, Compound> {
        self.vehicles
            .iter()
            .map(|(id, vehicle)| (*id, persist::save_record(&vehicle.state)))
            .collect()
    }

    /// Load records into matching vehicles, returning how many loaded.
    ///
    /// A malformed record only affects its own vehicle: it is logged and
    /// skipped, and the vehicle keeps its current state.
    pub fn load_all(&mut self, records: &BTreeMap<VehicleId, Compound>) -> usize {
        let mut loaded = 0;
        for (id, record) in records {
            let Some(vehicle) = self.vehicles.get_mut(id) else {
                warn!("No vehicle {} for saved record", id.short());
                continue;
            };
            match persist::load_record(&mut vehicle.state, record) {
                Ok(()) => loaded += 1,
                Err(e) => warn!("Vehicle {} record not loaded: {}", id.short(), e),
            }
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::events::VehicleEventData;
    use crate::vehicle::persist::Tag;
    use crate::vehicle::synced::FieldKey;

    fn world_with_plane() -> (World, VehicleId) {
        let mut world = World::new(PhysicsConstants::default());
        let id = world.spawn(Archetype::Plane, DVec3::new(0.0, 64.0, 0.0), 0.0);
        (world, id)
    }

    #[test]
    fn test_spawn_and_remove_events() {
        let (mut world, id) = world_with_plane();
        let first = world.tick(&BTreeMap::new());
        assert_eq!(first.events[0].data, VehicleEventData::Spawned { archetype: Archetype::Plane });

        world.remove(&id).unwrap();
        assert!(world.is_empty());
        let second = world.tick(&BTreeMap::new());
        assert_eq!(second.events[0].data, VehicleEventData::Removed);
        assert!(matches!(world.remove(&id), Err(WorldError::UnknownVehicle(v)) if v == id));
    }

    #[test]
    fn test_only_controller_may_steer() {
        let (mut world, id) = world_with_plane();
        assert_eq!(
            world.handle_control_input(1, &id, ControlInput::new(0.0, 1.0, 0.0)),
            Err(WorldError::NotController(id))
        );

        world.set_controller(&id, Some(1)).unwrap();
        world.handle_control_input(1, &id, ControlInput::new(5.0, 1.0, 0.0)).unwrap();
        assert_eq!(world.get(&id).unwrap().state.controls(), ControlInput::new(1.0, 1.0, 0.0));
        assert_eq!(
            world.handle_control_input(2, &id, ControlInput::IDLE),
            Err(WorldError::NotController(id))
        );
    }

    #[test]
    fn test_input_replicates_next_tick() {
        let (mut world, id) = world_with_plane();
        world.set_controller(&id, Some(9)).unwrap();
        world.handle_control_input(9, &id, ControlInput::new(0.0, 1.0, 0.0)).unwrap();

        let result = world.tick(&BTreeMap::new());
        let (_, updates) = result.updates.iter().find(|(v, _)| *v == id).unwrap();
        assert!(updates.contains(&PropertyUpdate { key: FieldKey::ForwardInput, value: 1.0 }));
    }

    #[test]
    fn test_takeoff_and_landing_events() {
        let (mut world, id) = world_with_plane();
        world.tick(&BTreeMap::new());

        let mut envs = BTreeMap::new();
        envs.insert(id, Environment { on_ground: false, ..Environment::PARKED });
        let airborne = world.tick(&envs);
        assert!(matches!(airborne.events[0].data, VehicleEventData::TookOff { .. }));

        let landed = world.tick(&BTreeMap::new());
        assert!(matches!(landed.events[0].data, VehicleEventData::Landed { .. }));
    }

    #[test]
    fn test_tick_moves_vehicle() {
        let (mut world, id) = world_with_plane();
        let result = world.tick(&BTreeMap::new());
        let (_, output) = result.outputs[0];
        let position = world.get(&id).unwrap().state.position;
        assert_eq!(position, DVec3::new(0.0, 64.0, 0.0) + output.displacement);
    }

    #[test]
    fn test_state_hash_tracks_state() {
        let (mut a, id) = world_with_plane();
        let mut b = World::new(PhysicsConstants::default());
        b.spawn_with_id(id, Archetype::Plane, DVec3::new(0.0, 64.0, 0.0), 0.0);

        assert_eq!(a.tick(&BTreeMap::new()).state_hash, b.tick(&BTreeMap::new()).state_hash);

        b.get_mut(&id).unwrap().state.velocity.x += 0.5;
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_bad_record_only_affects_its_vehicle() {
        let mut world = World::new(PhysicsConstants::default());
        let good = world.spawn(Archetype::Plane, DVec3::ZERO, 0.0);
        let bad = world.spawn(Archetype::Plane, DVec3::ZERO, 0.0);

        world.get_mut(&good).unwrap().state.velocity = DVec3::new(0.0, 0.0, 1.0);
        let mut records = world.save_all();
        world.get_mut(&good).unwrap().state.velocity = DVec3::ZERO;

        let mut broken = Compound::new();
        broken.insert("PlaneRoll", Tag::Double(1.0));
        records.insert(bad, broken);

        assert_eq!(world.load_all(&records), 1);
        assert_eq!(world.get(&good).unwrap().state.velocity, DVec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_properties_override() {
        let mut world = World::new(PhysicsConstants::default());
        let props = VehicleProperties { engine_power: 40.0, ..VehicleProperties::plane() };
        world.set_properties(Archetype::Plane, props.clone());
        let id = world.spawn(Archetype::Plane, DVec3::ZERO, 0.0);
        assert_eq!(world.get(&id).unwrap().profile().properties(), &props);
        assert_eq!(world.properties_for(Archetype::Moped), VehicleProperties::moped());
    }

    #[test]
    fn test_spawn_info_carries_velocity() {
        let (mut world, id) = world_with_plane();
        world.get_mut(&id).unwrap().state.velocity = DVec3::new(0.2, 0.0, 0.0);
        let info = world.spawn_info(&id).unwrap();
        assert_eq!(info.snapshot.velocity, DVec3::new(0.2, 0.0, 0.0));
        assert_eq!(info.fields.len(), Archetype::Plane.synced_keys().len());
    }
}
