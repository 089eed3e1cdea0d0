//! Observer View
//!
//! Client-side mirror of one vehicle. Replicated fields arrive from the
//! authority and are read back through the observer side of each
//! synchronized value. The local copies hold the prediction: the
//! controlling client's input plus whatever the motion profile writes
//! each tick (roll, wheel angle). Input is published as a control message
//! and never reaches authoritative state directly.

use glam::DVec3;
use tracing::debug;

use crate::vehicle::input::{ControlInput, Environment};
use crate::vehicle::motion::{Archetype, MotionOutput, MotionProfile, PhysicsConstants};
use crate::vehicle::persist::SpawnSnapshot;
use crate::vehicle::properties::VehicleProperties;
use crate::vehicle::state::{VehicleId, VehicleState};
use crate::vehicle::synced::{PropertyUpdate, Side, SyncedFields};

/// Result of one observer tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObserverTick {
    /// Predicted motion for rendering
    pub output: MotionOutput,
    /// Control message to send to the authority, if the input changed
    pub input: Option<ControlInput>,
}

/// Non-authoritative view of a vehicle.
#[derive(Debug)]
pub struct ObservedVehicle {
    id: VehicleId,
    state: VehicleState,
    profile: Box<dyn MotionProfile>,
    /// This client is the controlling occupant
    controlling: bool,
    /// Latest input from the controlling client
    held: Option<ControlInput>,
    /// `held` changed since the last tick
    fresh: bool,
    /// Last input sent to the authority
    last_sent: ControlInput,
    blade_rotation: f32,
    prev_blade_rotation: f32,
}

impl ObservedVehicle {
    /// Create a view for a vehicle the authority just spawned.
    pub fn new(
        id: VehicleId,
        archetype: Archetype,
        position: DVec3,
        yaw: f32,
        properties: VehicleProperties,
        constants: PhysicsConstants,
    ) -> Self {
        let fields = SyncedFields::new(Side::Observer, archetype.synced_keys());
        Self {
            id,
            state: VehicleState::new(position, yaw, fields),
            profile: archetype.profile(properties, constants),
            controlling: false,
            held: None,
            fresh: false,
            last_sent: ControlInput::IDLE,
            blade_rotation: 0.0,
            prev_blade_rotation: 0.0,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn archetype(&self) -> Archetype {
        self.profile.archetype()
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Mark whether this client controls the vehicle.
    pub fn set_controlling(&mut self, controlling: bool) {
        self.controlling = controlling;
        if !controlling {
            // The authority idles the controls on unseat
            self.held = None;
            self.fresh = false;
            self.last_sent = ControlInput::IDLE;
        }
    }

    pub fn is_controlling(&self) -> bool {
        self.controlling
    }

    /// Apply the spawn snapshot and initial field values.
    pub fn apply_spawn(&mut self, snapshot: SpawnSnapshot, fields: &[PropertyUpdate]) {
        self.state.velocity = snapshot.velocity;
        self.apply_updates(fields);
    }

    /// Apply replicated field changes, returning how many were accepted.
    pub fn apply_updates(&mut self, updates: &[PropertyUpdate]) -> usize {
        let mut accepted = 0;
        for update in updates {
            if self.state.fields.apply_update(*update) {
                accepted += 1;
            } else {
                debug!("Vehicle {} ignored update for {:?}", self.id.short(), update.key);
            }
        }
        accepted
    }

    /// Record the controlling client's input for this tick.
    ///
    /// Writes the local copies only. Ignored when this client is not the
    /// controller.
    pub fn capture_input(&mut self, input: ControlInput) {
        if !self.controlling {
            return;
        }
        let input = input.normalized();
        self.state.set_controls(input);
        self.held = Some(input);
        self.fresh = true;
    }

    /// Advance the prediction by one tick and collect the outgoing input.
    pub fn tick(&mut self, env: &Environment) -> ObserverTick {
        self.prev_blade_rotation = self.blade_rotation;

        let input = match self.held {
            Some(input) if self.controlling => input,
            _ => self.state.controls(),
        };

        let output = self.profile.integrate(&mut self.state, &input, env);
        self.state.position += output.displacement;
        self.blade_rotation += self.state.propeller_speed;

        ObserverTick {
            output,
            input: self.take_input_message(),
        }
    }

    /// At most one message per tick, and only when the input changed.
    fn take_input_message(&mut self) -> Option<ControlInput> {
        if !std::mem::take(&mut self.fresh) {
            return None;
        }
        let input = self.held?;
        if input == self.last_sent {
            return None;
        }
        self.last_sent = input;
        Some(input)
    }

    /// Blade angle interpolated between the last two ticks.
    pub fn blade_rotation(&self, partial_ticks: f32) -> f32 {
        self.prev_blade_rotation + (self.blade_rotation - self.prev_blade_rotation) * partial_ticks
    }
}
