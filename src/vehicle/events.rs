//! Vehicle Events
//!
//! Events generated by the world for logging and replication.

use serde::{Serialize, Deserialize};

use crate::vehicle::motion::Archetype;
use crate::vehicle::state::{FlightMode, VehicleId};

/// Vehicle event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VehicleEventData {
    /// Vehicle entered the world
    Spawned { archetype: Archetype },

    /// Vehicle left the world
    Removed,

    /// Lost ground contact
    TookOff { speed: f64 },

    /// Regained ground contact
    Landed { speed: f64, vertical_speed: f64 },
}

/// A vehicle event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleEvent {
    /// Tick when the event occurred
    pub tick: u64,

    /// Vehicle involved
    pub vehicle_id: VehicleId,

    /// Event data
    pub data: VehicleEventData,
}

impl VehicleEvent {
    /// Create a new event.
    pub fn new(tick: u64, vehicle_id: VehicleId, data: VehicleEventData) -> Self {
        Self { tick, vehicle_id, data }
    }

    /// Create spawned event.
    pub fn spawned(tick: u64, vehicle_id: VehicleId, archetype: Archetype) -> Self {
        Self::new(tick, vehicle_id, VehicleEventData::Spawned { archetype })
    }

    /// Create removed event.
    pub fn removed(tick: u64, vehicle_id: VehicleId) -> Self {
        Self::new(tick, vehicle_id, VehicleEventData::Removed)
    }

    /// Event for a Grounded/Airborne transition, if `before` and `after` differ.
    pub fn transition(
        tick: u64,
        vehicle_id: VehicleId,
        before: FlightMode,
        after: FlightMode,
        velocity: glam::DVec3,
    ) -> Option<Self> {
        let data = match (before, after) {
            (FlightMode::Grounded, FlightMode::Airborne) => VehicleEventData::TookOff {
                speed: velocity.length(),
            },
            (FlightMode::Airborne, FlightMode::Grounded) => VehicleEventData::Landed {
                speed: velocity.length(),
                vertical_speed: velocity.y,
            },
            _ => return None,
        };
        Some(Self::new(tick, vehicle_id, data))
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self.data {
            VehicleEventData::Spawned { .. } => "spawned",
            VehicleEventData::Removed => "removed",
            VehicleEventData::TookOff { .. } => "took_off",
            VehicleEventData::Landed { .. } => "landed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_transition_events() {
        let id = VehicleId::new([7; 16]);
        let v = DVec3::new(0.0, -0.3, 0.4);

        let took_off = VehicleEvent::transition(5, id, FlightMode::Grounded, FlightMode::Airborne, v).unwrap();
        assert_eq!(took_off.kind(), "took_off");

        let landed = VehicleEvent::transition(9, id, FlightMode::Airborne, FlightMode::Grounded, v).unwrap();
        match landed.data {
            VehicleEventData::Landed { speed, vertical_speed } => {
                assert!((speed - 0.5).abs() < 1e-12);
                assert_eq!(vertical_speed, -0.3);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert!(VehicleEvent::transition(1, id, FlightMode::Airborne, FlightMode::Airborne, v).is_none());
    }
}
