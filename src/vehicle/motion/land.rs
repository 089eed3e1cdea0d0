//! Wheeled Land Model
//!
//! Mopeds, cars and other ground vehicles. Steering turns the heading in
//! proportion to forward speed; the traction table decides how much of
//! the sideways velocity survives each tick.

use glam::DVec3;

use crate::core::angles::{direction_from_rotation, horizontal_length};
use crate::vehicle::input::{ControlInput, Environment};
use crate::vehicle::motion::{
    Archetype, EngineAudio, MotionOutput, MotionProfile, PhysicsConstants, SILENT_VOLUME, TICK_SCALE,
};
use crate::vehicle::properties::VehicleProperties;
use crate::vehicle::state::{FlightMode, VehicleState};

/// Wheel angle low-pass blend factor.
pub const WHEEL_BLEND: f32 = 0.5;
/// Engine force per unit of engine power, in blocks per tick squared.
pub const THRUST_SCALE: f64 = 0.004;
/// Sideways speed above which the tyres are sliding.
pub const SLIDE_THRESHOLD: f64 = 0.1;
/// Horizontal velocity multiplier per tick while airborne.
pub const AIR_DRAG: f64 = 0.98;
/// Reverse top speed as a share of forward top speed.
pub const REVERSE_SHARE: f64 = 0.5;

/// Ground vehicle motion profile.
#[derive(Clone, Debug)]
pub struct LandProfile {
    properties: VehicleProperties,
    constants: PhysicsConstants,
}

impl LandProfile {
    /// Create a profile with the given tuning.
    pub fn new(properties: VehicleProperties, constants: PhysicsConstants) -> Self {
        Self { properties, constants }
    }

    fn update_wheel_angle(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment) {
        let target = if env.occupied {
            input.side * self.properties.max_steering_angle
        } else {
            0.0
        };
        let angle = state.wheel_angle() + (target - state.wheel_angle()) * WHEEL_BLEND;
        state.set_wheel_angle(angle);
    }

    /// Sideways grip for the current lateral speed.
    fn traction(&self, lateral_speed: f64) -> f64 {
        let wheel = self.properties.wheel_type;
        let grip = if lateral_speed.abs() > SLIDE_THRESHOLD {
            wheel.slide_traction()
        } else {
            wheel.base_traction()
        };
        grip.clamp(0.0, 1.0) as f64
    }

    fn drive(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment) {
        let props = &self.properties;
        let max_steer = props.max_steering_angle.max(f32::EPSILON);

        let heading = direction_from_rotation(0.0, state.yaw);
        let forward_speed = state.velocity.dot(heading);

        // Steering bites harder the faster the wheels roll
        let speed_share = (forward_speed / props.max_speed.max(f32::EPSILON) as f64).clamp(-1.0, 1.0) as f32;
        state.yaw -= state.wheel_angle() / max_steer * props.steering_speed * speed_share;

        let heading = direction_from_rotation(0.0, state.yaw);
        let right = DVec3::new(-heading.z, 0.0, heading.x);
        let mut forward_speed = state.velocity.dot(heading);
        let mut lateral_speed = state.velocity.dot(right);

        if env.can_drive() {
            forward_speed += input.forward as f64 * props.engine_power as f64 * THRUST_SCALE;
        }

        let friction = (self.constants.ground_friction * props.wheel_type.friction_factor(env.terrain)) as f64;
        forward_speed -= forward_speed * friction * TICK_SCALE;
        lateral_speed *= 1.0 - self.traction(lateral_speed);

        let top = props.max_speed as f64;
        forward_speed = forward_speed.clamp(-top * REVERSE_SHARE, top);

        state.velocity = heading * forward_speed + right * lateral_speed;
    }

    fn update_body_rotation(state: &mut VehicleState) {
        state.body.pitch = 0.0;
        state.body.roll = 0.0;
        state.body.yaw = state.yaw;
    }
}

impl MotionProfile for LandProfile {
    fn archetype(&self) -> Archetype {
        Archetype::Moped
    }

    fn properties(&self) -> &VehicleProperties {
        &self.properties
    }

    fn integrate(&self, state: &mut VehicleState, input: &ControlInput, env: &Environment) -> MotionOutput {
        let mode = FlightMode::from_ground_contact(env.on_ground);

        self.update_wheel_angle(state, input, env);

        match mode {
            FlightMode::Grounded => self.drive(state, input, env),
            FlightMode::Airborne => {
                state.velocity.x *= AIR_DRAG;
                state.velocity.z *= AIR_DRAG;
                state.velocity.y -= self.constants.gravity;
            }
        }

        state.pitch = 0.0;
        Self::update_body_rotation(state);
        state.mode = mode;

        let audio = self.engine_audio(state, env);
        MotionOutput::from_state(state, audio, mode)
    }

    fn engine_audio(&self, state: &VehicleState, env: &Environment) -> EngineAudio {
        let props = &self.properties;
        let top = props.max_speed.max(f32::EPSILON) as f64;
        let normal = (horizontal_length(state.velocity) / top).clamp(0.0, 1.0) as f32;
        let pitch = props.min_engine_pitch + (props.max_engine_pitch - props.min_engine_pitch) * normal;
        let volume = if env.can_drive() { 0.2 + 0.8 * normal } else { SILENT_VOLUME };
        EngineAudio { pitch, volume }
    }
}
