//! World Runner
//!
//! Drives a `World` at a fixed tick rate. Commands (client messages and
//! host callbacks) arrive on an mpsc channel and are applied between
//! ticks; replication messages for each tick are broadcast to every
//! subscriber once the tick completes.

use std::collections::BTreeMap;

use glam::DVec3;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::config::WorldConfig;
use crate::network::protocol::{
    ClientMessage, PropertyBatch, ServerError, ServerMessage, VehicleSpawn,
};
use crate::vehicle::events::VehicleEventData;
use crate::vehicle::input::Environment;
use crate::vehicle::motion::Archetype;
use crate::vehicle::persist::Compound;
use crate::vehicle::state::VehicleId;
use crate::vehicle::world::{ClientId, World, WorldTick};

/// Capacity of the command channel.
pub const COMMAND_BUFFER: usize = 256;
/// Capacity of the replication broadcast channel.
pub const BROADCAST_BUFFER: usize = 1024;

/// Work for the runner, applied before the next tick.
#[derive(Debug)]
pub enum RunnerCommand {
    /// Message from a connected client.
    Client { client: ClientId, message: ClientMessage },
    /// Host state for a vehicle, used until replaced.
    SetEnvironment { vehicle_id: VehicleId, env: Environment },
    /// Seat or unseat the controlling occupant.
    SetController { vehicle_id: VehicleId, client: Option<ClientId> },
    /// Spawn a vehicle.
    Spawn { vehicle_id: VehicleId, archetype: Archetype, position: DVec3, yaw: f32 },
    /// Remove a vehicle.
    Remove { vehicle_id: VehicleId },
    /// Save every vehicle's record.
    Save { reply: oneshot::Sender<BTreeMap<VehicleId, Compound>> },
    /// Load saved records into matching vehicles.
    Load { records: BTreeMap<VehicleId, Compound> },
}

/// Sending side of a running world.
#[derive(Clone, Debug)]
pub struct RunnerHandle {
    commands: mpsc::Sender<RunnerCommand>,
    replication: broadcast::Sender<ServerMessage>,
}

impl RunnerHandle {
    /// Queue a command. Fails only if the runner has stopped.
    pub async fn send(&self, command: RunnerCommand) -> Result<(), mpsc::error::SendError<RunnerCommand>> {
        self.commands.send(command).await
    }

    /// Subscribe to replication messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.replication.subscribe()
    }
}

/// Owns the world and runs its tick loop.
pub struct WorldRunner {
    world: World,
    config: WorldConfig,
    environments: BTreeMap<VehicleId, Environment>,
    commands: mpsc::Receiver<RunnerCommand>,
    replication: broadcast::Sender<ServerMessage>,
}

impl WorldRunner {
    /// Create a runner and the handle used to feed it.
    pub fn new(world: World, config: WorldConfig) -> (Self, RunnerHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (replication_tx, _) = broadcast::channel(BROADCAST_BUFFER);

        let runner = Self {
            world,
            config,
            environments: BTreeMap::new(),
            commands: command_rx,
            replication: replication_tx.clone(),
        };
        let handle = RunnerHandle {
            commands: command_tx,
            replication: replication_tx,
        };
        (runner, handle)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Run until `shutdown` fires or every command sender is dropped.
    ///
    /// Returns the world so the caller can persist it.
    #[instrument(skip_all, fields(tick_rate = self.config.tick_rate))]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> World {
        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("World runner started with {} vehicles", self.world.len());

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if !self.drain_commands() {
                        info!("Command channel closed");
                        break;
                    }
                    self.step();
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("World runner stopped at tick {}", self.world.tick_count());
        self.world
    }

    /// Apply queued commands. Returns false once no sender remains.
    pub fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, command: RunnerCommand) {
        match command {
            RunnerCommand::Client { client, message } => self.handle_client(client, message),
            RunnerCommand::SetEnvironment { vehicle_id, env } => {
                self.environments.insert(vehicle_id, env);
            }
            RunnerCommand::SetController { vehicle_id, client } => {
                if let Err(e) = self.world.set_controller(&vehicle_id, client) {
                    debug!("Seat change ignored: {}", e);
                }
            }
            RunnerCommand::Spawn { vehicle_id, archetype, position, yaw } => {
                self.world.spawn_with_id(vehicle_id, archetype, position, yaw);
            }
            RunnerCommand::Remove { vehicle_id } => {
                self.environments.remove(&vehicle_id);
                if let Err(e) = self.world.remove(&vehicle_id) {
                    debug!("Remove ignored: {}", e);
                }
            }
            RunnerCommand::Save { reply } => {
                if reply.send(self.world.save_all()).is_err() {
                    warn!("Save requested but nobody waited for the records");
                }
            }
            RunnerCommand::Load { records } => {
                let loaded = self.world.load_all(&records);
                info!("Loaded {}/{} vehicle records", loaded, records.len());
            }
        }
    }

    fn handle_client(&mut self, client: ClientId, message: ClientMessage) {
        match message {
            ClientMessage::ControlInput(packet) => {
                if let Err(e) = self.world.handle_control_input(client, &packet.vehicle_id, packet.input) {
                    self.publish(ServerMessage::Error(ServerError::from(&e)));
                }
            }
            ClientMessage::Ping { timestamp } => {
                self.publish(ServerMessage::Pong {
                    timestamp,
                    server_tick: self.world.tick_count(),
                });
            }
        }
    }

    /// Run one tick and broadcast its replication messages.
    pub fn step(&mut self) -> WorldTick {
        let result = self.world.tick(&self.environments);

        for event in &result.events {
            match event.data {
                VehicleEventData::Spawned { .. } => {
                    if let Some(info) = self.world.spawn_info(&event.vehicle_id) {
                        self.publish(ServerMessage::Spawn(VehicleSpawn::from(info)));
                    }
                }
                VehicleEventData::Removed => {
                    self.publish(ServerMessage::Removed { vehicle_id: event.vehicle_id });
                }
                _ => {}
            }
            self.publish(ServerMessage::Event(event.clone()));
        }

        for (vehicle_id, updates) in &result.updates {
            self.publish(ServerMessage::Properties(PropertyBatch {
                tick: result.tick,
                vehicle_id: *vehicle_id,
                updates: updates.clone(),
            }));
        }

        self.publish(ServerMessage::Frame {
            tick: result.tick,
            state_hash: result.state_hash,
        });

        let interval = self.config.status_interval_ticks;
        if interval > 0 && result.tick % interval == 0 {
            info!(
                "Tick {}: {} vehicles, state {}",
                result.tick,
                self.world.len(),
                hex::encode(&result.state_hash[..8])
            );
        }

        result
    }

    fn publish(&self, message: ServerMessage) {
        // No subscribers is fine; nothing is observing yet
        let _ = self.replication.send(message);
    }
}
