//! Network Layer
//!
//! Message types and the fixed-rate runner that feeds a `World` from
//! client and host commands and fans replication out to observers.
//! Transport is left to the embedding server.

pub mod protocol;
pub mod runner;

pub use protocol::{
    ClientMessage, ControlInputPacket, ErrorCode, PropertyBatch, ServerError, ServerMessage, VehicleSpawn,
};
pub use runner::{RunnerCommand, RunnerHandle, WorldRunner};
