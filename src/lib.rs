//! # Vehicle Motion Server
//!
//! Authoritative vehicle physics with replicated state and persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  VEHICLE MOTION SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Math and hashing primitives               │
//! │  ├── angles.rs   - Degree helpers in the host's convention   │
//! │  └── hash.rs     - State digest for replication frames       │
//! │                                                              │
//! │  vehicle/        - Simulation                                │
//! │  ├── synced.rs   - Authority/observer synchronized fields    │
//! │  ├── surface.rs  - Wheel traction table                      │
//! │  ├── state.rs    - Per-vehicle physics state                 │
//! │  ├── motion/     - Plane and land motion profiles            │
//! │  ├── persist.rs  - Saved records and spawn snapshots         │
//! │  ├── observer.rs - Client-side mirror                        │
//! │  └── world.rs    - Authoritative per-session world           │
//! │                                                              │
//! │  network/        - Messages and the fixed-rate runner        │
//! │  config.rs       - Environment settings, properties files    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! Only the world tick writes authoritative state. Observers read the
//! last replicated values and send their occupant's input as control
//! messages; the authority normalizes that input and replicates it back
//! with the next tick's property updates.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod network;
pub mod vehicle;

// Re-export commonly used types
pub use config::{ConfigError, WorldConfig};
pub use vehicle::input::{ControlInput, Environment};
pub use vehicle::motion::{Archetype, MotionOutput, MotionProfile, PhysicsConstants};
pub use vehicle::state::{VehicleId, VehicleState};
pub use vehicle::world::{World, WorldError, WorldTick};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz), matching the host engine
pub const TICK_RATE: u32 = 20;
