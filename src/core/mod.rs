//! Core primitives shared by the vehicle simulation.

pub mod angles;
pub mod hash;

// Re-export core types
pub use angles::{wrap_degrees, direction_from_rotation, pitch_of, yaw_of, lerp_vec};
pub use hash::{compute_state_hash, StateHash, StateHasher};
