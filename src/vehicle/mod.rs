//! Vehicle simulation: state, synchronized fields, motion profiles,
//! persistence and the authoritative world.

pub mod events;
pub mod input;
pub mod motion;
pub mod observer;
pub mod persist;
pub mod properties;
pub mod state;
pub mod surface;
pub mod synced;
pub mod world;

pub use events::{VehicleEvent, VehicleEventData};
pub use input::{ControlInput, Environment};
pub use motion::{Archetype, EngineAudio, MotionOutput, MotionProfile, PhysicsConstants};
pub use observer::{ObservedVehicle, ObserverTick};
pub use persist::{Compound, PersistError, SpawnSnapshot, Tag};
pub use properties::VehicleProperties;
pub use state::{BodyRotation, FlightMode, VehicleId, VehicleState};
pub use surface::{TerrainClass, TractionEntry, WheelType};
pub use synced::{FieldKey, PropertyUpdate, Side, SyncedFields, SyncedValue};
pub use world::{ClientId, SpawnInfo, World, WorldError, WorldTick};
