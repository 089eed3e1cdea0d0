//! Protocol Messages
//!
//! Wire format for client-server communication.
//! Tagged messages are serialized as JSON; the per-tick control input has
//! a flat binary (bincode) form since it is the highest-rate message.

use glam::DVec3;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::vehicle::events::VehicleEvent;
use crate::vehicle::input::ControlInput;
use crate::vehicle::motion::Archetype;
use crate::vehicle::persist::{PersistError, SpawnSnapshot};
use crate::vehicle::state::VehicleId;
use crate::vehicle::synced::PropertyUpdate;
use crate::vehicle::world::{SpawnInfo, WorldError};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Controlling occupant's input, sent when it changes.
    ControlInput(ControlInputPacket),

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Control input for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInputPacket {
    /// Vehicle being driven.
    pub vehicle_id: VehicleId,
    /// Lift, forward, side.
    pub input: ControlInput,
}

impl ControlInputPacket {
    /// Size in bytes of the binary form.
    pub const SIZE: usize = 16 + ControlInput::SIZE;

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A vehicle entered the world (or the client started observing it).
    Spawn(VehicleSpawn),

    /// Replicated field changes for one vehicle.
    Properties(PropertyBatch),

    /// Vehicle event notification.
    Event(VehicleEvent),

    /// A vehicle left the world.
    Removed { vehicle_id: VehicleId },

    /// End of a tick's replication, with the state digest.
    Frame { tick: u64, state_hash: StateHash },

    /// Pong response.
    Pong { timestamp: u64, server_tick: u64 },

    /// Error message.
    Error(ServerError),
}

/// Spawn replication payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpawn {
    /// Vehicle identifier.
    pub vehicle_id: VehicleId,
    /// Archetype, selecting the observer's motion profile.
    pub archetype: Archetype,
    /// World position.
    pub position: [f64; 3],
    /// Heading yaw in degrees.
    pub yaw: f32,
    /// Spawn snapshot: big-endian float64 velocity X, Y, Z.
    pub snapshot: Vec<u8>,
    /// Current value of every declared synchronized field.
    pub fields: Vec<PropertyUpdate>,
}

impl VehicleSpawn {
    /// Decode the velocity snapshot.
    pub fn spawn_snapshot(&self) -> Result<SpawnSnapshot, PersistError> {
        SpawnSnapshot::decode(&mut self.snapshot.as_slice())
    }

    /// Position as a vector.
    pub fn position_vec(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }
}

impl From<SpawnInfo> for VehicleSpawn {
    fn from(info: SpawnInfo) -> Self {
        Self {
            vehicle_id: info.vehicle_id,
            archetype: info.archetype,
            position: info.position.to_array(),
            yaw: info.yaw,
            snapshot: info.snapshot.to_bytes().to_vec(),
            fields: info.fields,
        }
    }
}

/// Field changes for one vehicle at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyBatch {
    /// Server tick that produced the changes.
    pub tick: u64,
    /// Vehicle identifier.
    pub vehicle_id: VehicleId,
    /// Changed fields.
    pub updates: Vec<PropertyUpdate>,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Vehicle does not exist.
    UnknownVehicle,
    /// Sender does not control the vehicle.
    NotController,
    /// Message could not be parsed.
    InvalidMessage,
}

impl From<&WorldError> for ServerError {
    fn from(err: &WorldError) -> Self {
        let code = match err {
            WorldError::UnknownVehicle(_) => ErrorCode::UnknownVehicle,
            WorldError::NotController(_) => ErrorCode::NotController,
        };
        Self { code, message: err.to_string() }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::events::VehicleEventData;
    use crate::vehicle::synced::FieldKey;

    #[test]
    fn test_client_message_json_roundtrip() {
        let msg = ClientMessage::ControlInput(ControlInputPacket {
            vehicle_id: VehicleId::new([4; 16]),
            input: ControlInput::new(0.0, 1.0, -0.5),
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"control_input\""));
        let parsed = ClientMessage::from_json(&json).unwrap();

        if let ClientMessage::ControlInput(packet) = parsed {
            assert_eq!(packet.input.forward, 1.0);
            assert_eq!(packet.input.side, -0.5);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_server_message_json_roundtrip() {
        let msg = ServerMessage::Properties(PropertyBatch {
            tick: 40,
            vehicle_id: VehicleId::new([1; 16]),
            updates: vec![PropertyUpdate { key: FieldKey::Roll, value: -12.5 }],
        });

        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_event_message() {
        let msg = ServerMessage::Event(VehicleEvent::new(
            3,
            VehicleId::new([2; 16]),
            VehicleEventData::TookOff { speed: 0.9 },
        ));
        let json = msg.to_json().unwrap();
        assert!(json.contains("TookOff"));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_binary_control_input() {
        // Tagged enums are JSON only; the flat packet goes over bincode
        let packet = ControlInputPacket {
            vehicle_id: VehicleId::new([9; 16]),
            input: ControlInput::new(1.0, 0.5, 0.0),
        };
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(bytes.len(), ControlInputPacket::SIZE);
        assert_eq!(ControlInputPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_spawn_from_info() {
        let info = SpawnInfo {
            vehicle_id: VehicleId::new([5; 16]),
            archetype: Archetype::Plane,
            position: DVec3::new(1.0, 70.0, -3.0),
            yaw: 90.0,
            snapshot: SpawnSnapshot { velocity: DVec3::new(0.0, 0.0, 0.6) },
            fields: vec![PropertyUpdate { key: FieldKey::Lift, value: 1.0 }],
        };
        let spawn = VehicleSpawn::from(info);
        assert_eq!(spawn.snapshot.len(), SpawnSnapshot::SIZE);
        assert_eq!(spawn.spawn_snapshot().unwrap().velocity, DVec3::new(0.0, 0.0, 0.6));
        assert_eq!(spawn.position_vec(), DVec3::new(1.0, 70.0, -3.0));
    }

    #[test]
    fn test_truncated_spawn_snapshot() {
        let spawn = VehicleSpawn {
            vehicle_id: VehicleId::default(),
            archetype: Archetype::Moped,
            position: [0.0; 3],
            yaw: 0.0,
            snapshot: vec![0; 10],
            fields: Vec::new(),
        };
        assert!(matches!(spawn.spawn_snapshot(), Err(PersistError::Truncated { .. })));
    }

    #[test]
    fn test_world_error_codes() {
        let err = WorldError::NotController(VehicleId::default());
        assert_eq!(ServerError::from(&err).code, ErrorCode::NotController);
    }
}
