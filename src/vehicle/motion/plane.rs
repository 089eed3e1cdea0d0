//! Plane Flight Model
//!
//! Per-tick order:
//!
//! 1. roll from side input (airborne) or decay toward level
//! 2. propeller speed toward a state-dependent ceiling
//! 3. thrust, ground friction, quadratic drag and lift
//! 4. flap deflection rotated by roll nudges pitch/yaw
//! 5. gravity scaled by (1 - lift), then velocity blended toward heading
//! 6. nose re-aligned with the travel direction while flying
//!
//! The blend in step 5 is a stabilizer, not Newtonian integration. The
//! handling depends on it, so the factor stays at exactly 0.5.

use glam::{DVec3, Quat};

use crate::core::angles::{
    direction_from_rotation, horizontal_length, lerp_vec, pitch_of, wrap_degrees, yaw_of,
};
use crate::vehicle::input::{ControlInput, Environment};
use crate::vehicle::motion::{
    Archetype, EngineAudio, MotionOutput, MotionProfile, PhysicsConstants, SILENT_VOLUME, TICK_SCALE,
};
use crate::vehicle::properties::VehicleProperties;
use crate::vehicle::state::{FlightMode, VehicleState};

/// Roll change per tick at full side input, in degrees.
pub const ROLL_RATE: f32 = 5.0;
/// Roll multiplier per tick when not steering in the air.
pub const ROLL_DECAY: f32 = 0.9;
/// Flap angle low-pass blend factor.
pub const FLAP_BLEND: f32 = 0.15;
/// Quadratic drag coefficient.
pub const DRAG: f64 = 0.001;
/// Velocity blend toward the heading direction.
pub const VELOCITY_BLEND: f64 = 0.5;
/// Horizontal speed below which the nose is not re-aligned.
pub const HEADING_EPSILON: f64 = 0.01;
/// Propeller multiplier per tick while above the ceiling.
pub const PROPELLER_OVERSPEED_DECAY: f32 = 0.99;
/// Propeller multiplier per tick with nobody driving.
pub const PROPELLER_IDLE_DECAY: f32 = 0.95;
/// Propeller increment per tick when not throttling.
pub const PROPELLER_IDLE_RISE: f32 = 0.4;
/// Body pitch/roll multiplier per tick on the ground.
pub const BODY_SETTLE: f32 = 0.75;

/// How strongly lift counters gravity, in [0, 1].
///
/// A non-positive minimum flight speed means full lift.
#[inline]
pub fn lift_force(velocity: DVec3, min_flight_speed: f32) -> f32 {
    if min_flight_speed <= 0.0 {
        return 1.0;
    }
    let force = (velocity.length() * 20.0) as f32 / min_flight_speed;
    force.clamp(0.0, 1.0)
}

/// Forward thrust factor for a propeller speed.
#[inline]
pub fn thrust_force(propeller_speed: f32) -> f32 {
    (propeller_speed / 200.0 - 0.4).max(0.0)
}

/// Propeller plane motion profile.
#[derive(Clone, Debug)]
pub struct PlaneProfile {
    properties: VehicleProperties,
    constants: PhysicsConstants,
}

impl PlaneProfile {
    /// Create a profile with the given tuning.
    pub fn new(properties: VehicleProperties, constants: PhysicsConstants) -> Self {
        Self { properties, constants }
    }

    /// Propeller speed ceiling for the current input and mode.
    pub fn max_propeller_speed(&self, input: &ControlInput, mode: FlightMode) -> f32 {
        if input.is_throttling() {
            200.0 + self.properties.engine_power
        } else if mode.is_airborne() {
            if input.lift < 0.0 {
                150.0
            } else {
                180.0
            }
        } else {
            80.0
        }
    }

    fn update_roll(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment, mode: FlightMode) {
        let roll = if env.occupied && mode.is_airborne() {
            wrap_degrees(state.roll() - input.side * ROLL_RATE)
        } else {
            state.roll() * ROLL_DECAY
        };
        state.set_roll(roll);
    }

    fn update_propeller(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment, mode: FlightMode) {
        if !env.can_drive() {
            state.propeller_speed *= PROPELLER_IDLE_DECAY;
            return;
        }

        let ceiling = self.max_propeller_speed(input, mode);
        if state.propeller_speed <= ceiling {
            state.propeller_speed += if input.is_throttling() {
                self.properties.engine_power.max(0.0).sqrt() / 5.0
            } else {
                PROPELLER_IDLE_RISE
            };
            if state.propeller_speed > ceiling {
                state.propeller_speed = ceiling;
            }
        } else {
            state.propeller_speed *= PROPELLER_OVERSPEED_DECAY;
        }
    }

    fn ground_friction(&self, env: &Environment) -> f32 {
        self.constants.ground_friction * self.properties.wheel_type.friction_factor(env.terrain)
    }

    fn update_body_rotation(state: &mut VehicleState, mode: FlightMode) {
        if mode.is_airborne() {
            state.body.pitch = state.pitch;
            state.body.roll = state.roll();
        } else {
            state.body.pitch *= BODY_SETTLE;
            state.body.roll *= BODY_SETTLE;
        }
        state.body.yaw = state.yaw;
    }
}

impl MotionProfile for PlaneProfile {
    fn archetype(&self) -> Archetype {
        Archetype::Plane
    }

    fn properties(&self) -> &VehicleProperties {
        &self.properties
    }

    fn integrate(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment) -> MotionOutput {
        let mode = FlightMode::from_ground_contact(env.on_ground);
        let flying = mode.is_airborne();
        let props = &self.properties;

        self.update_roll(state, input, env, mode);
        self.update_propeller(state, input, env, mode);

        let friction = if flying { 0.0 } else { self.ground_friction(env) };
        let forward_force = thrust_force(state.propeller_speed);
        let lift = lift_force(state.velocity, props.min_flight_speed);
        // On the ground flaps only bite at full lift
        let flap_force = if flying { lift } else { lift.floor() };
        state.flap_angle += (props.max_flap_angle * input.lift - state.flap_angle) * FLAP_BLEND;

        // Flap deflection, banked by roll, turns into pitch/yaw deltas
        let deflection = direction_from_rotation(state.flap_angle * flap_force * 0.05, 0.0).as_vec3();
        let banked = (Quat::from_rotation_z(state.roll().to_radians()) * deflection).as_dvec3();
        state.pitch += pitch_of(banked);
        state.yaw -= yaw_of(banked);

        let forward = direction_from_rotation(state.pitch, state.yaw);
        let mut acceleration = forward * (forward_force * props.engine_power) as f64 * TICK_SCALE;
        if friction > 0.0 {
            acceleration += state.velocity * -(friction as f64) * TICK_SCALE;
        }
        acceleration += state.velocity * state.velocity.length() * -DRAG * TICK_SCALE;

        state.velocity.y -= self.constants.gravity * (1.0 - lift as f64);
        state.velocity = lerp_vec(state.velocity, forward * acceleration.length(), VELOCITY_BLEND);

        if flying && horizontal_length(state.velocity) > HEADING_EPSILON {
            state.pitch = -pitch_of(state.velocity);
            state.yaw = yaw_of(state.velocity);
        } else {
            state.pitch = 0.0;
        }

        Self::update_body_rotation(state, mode);
        state.mode = mode;

        let audio = self.engine_audio(state, env);
        MotionOutput::from_state(state, audio, mode)
    }

    fn engine_audio(&self, state: &VehicleState, env: &Environment) -> EngineAudio {
        let props = &self.properties;
        let normal = (state.propeller_speed / 200.0).clamp(0.0, 1.25) * 0.6;
        let pitch = props.min_engine_pitch
            + (props.max_engine_pitch - props.min_engine_pitch) * normal.clamp(0.0, 1.0);
        let volume = if env.can_drive() {
            0.2 + 0.8 * (state.propeller_speed / 80.0)
        } else {
            SILENT_VOLUME
        };
        EngineAudio { pitch, volume }
    }

    fn takes_fall_damage(&self) -> bool {
        false
    }

    fn can_change_wheels(&self) -> bool {
        false
    }
}

// =============================================================================
// TESTS
// =============================================================================
