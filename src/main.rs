//! Vehicle Motion Server
//!
//! Runs a scripted session: a plane takes off from a runway while a moped
//! drives alongside, then the world is saved and reloaded.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use glam::DVec3;
use tokio::sync::{broadcast, oneshot};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vehicle_motion::{
    config::load_properties,
    network::{ClientMessage, ControlInputPacket, RunnerCommand, ServerMessage, WorldRunner},
    vehicle::{Archetype, ControlInput, Environment, VehicleEventData, VehicleId, World},
    WorldConfig, TICK_RATE, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    let config = WorldConfig::from_env().context("invalid world configuration")?;
    info!("Vehicle Motion Server v{}", VERSION);
    info!("Tick Rate: {} Hz (host default {})", config.tick_rate, TICK_RATE);

    let mut world = World::new(config.physics());
    if let Ok(path) = std::env::var("VEHICLE_PLANE_PROPERTIES") {
        let props = load_properties(&path, &Archetype::Plane.default_properties())
            .with_context(|| format!("loading {}", path))?;
        world.set_properties(Archetype::Plane, props);
    }

    demo_session(world, config).await
}

/// Fly a plane and ride a moped for a few seconds of game time.
async fn demo_session(world: World, config: WorldConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Session ===");

    let (runner, handle) = WorldRunner::new(world, config.clone());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut replication = handle.subscribe();
    let runner_task = tokio::spawn(runner.run(shutdown_rx));

    let pilot = 1;
    let rider = 2;
    let plane = VehicleId::random();
    let moped = VehicleId::random();

    handle
        .send(RunnerCommand::Spawn { vehicle_id: plane, archetype: Archetype::Plane, position: DVec3::new(0.0, 64.0, 0.0), yaw: 0.0 })
        .await?;
    handle
        .send(RunnerCommand::Spawn { vehicle_id: moped, archetype: Archetype::Moped, position: DVec3::new(8.0, 64.0, 0.0), yaw: 0.0 })
        .await?;
    handle.send(RunnerCommand::SetController { vehicle_id: plane, client: Some(pilot) }).await?;
    handle.send(RunnerCommand::SetController { vehicle_id: moped, client: Some(rider) }).await?;

    let riding = Environment { occupied: true, ..Environment::PARKED };
    for vehicle_id in [plane, moped] {
        handle.send(RunnerCommand::SetEnvironment { vehicle_id, env: riding }).await?;
    }

    let script = [
        (plane, pilot, ControlInput::new(0.0, 1.0, 0.0)),
        (moped, rider, ControlInput::new(0.0, 1.0, 0.3)),
    ];
    for (vehicle_id, client, input) in script {
        let message = ClientMessage::ControlInput(ControlInputPacket { vehicle_id, input });
        handle.send(RunnerCommand::Client { client, message }).await?;
    }

    let tick = config.tick_duration();

    // Roll down the runway, then pull up and leave the ground
    tokio::time::sleep(tick * 60).await;
    let climb = ClientMessage::ControlInput(ControlInputPacket { vehicle_id: plane, input: ControlInput::new(1.0, 1.0, 0.0) });
    handle.send(RunnerCommand::Client { client: pilot, message: climb }).await?;
    handle
        .send(RunnerCommand::SetEnvironment { vehicle_id: plane, env: Environment::PILOTED_AIRBORNE })
        .await?;
    tokio::time::sleep(tick * 60).await;

    // Save and reload every vehicle
    let (reply, records) = oneshot::channel();
    handle.send(RunnerCommand::Save { reply }).await?;
    let records = records.await.context("runner dropped the save request")?;
    for (id, record) in &records {
        info!("Saved vehicle {}: {}", id.short(), record.to_json()?);
    }
    handle.send(RunnerCommand::Load { records }).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown_tx.send(()).ok();
    let world = runner_task.await.context("runner task failed")?;

    let mut events = BTreeMap::<&'static str, usize>::new();
    let mut last_hash = None;
    loop {
        let message = match replication.try_recv() {
            Ok(message) => message,
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                info!("Replication log skipped {} messages", skipped);
                continue;
            }
            Err(_) => break,
        };
        match message {
            ServerMessage::Event(event) => {
                if let VehicleEventData::TookOff { speed } = event.data {
                    info!("Vehicle {} took off at {:.3} blocks/tick", event.vehicle_id.short(), speed);
                }
                *events.entry(event.kind()).or_default() += 1;
            }
            ServerMessage::Frame { state_hash, .. } => last_hash = Some(state_hash),
            _ => {}
        }
    }

    info!("=== Session Results ===");
    for id in world.ids() {
        if let Some(vehicle) = world.get(&id) {
            let state = &vehicle.state;
            info!(
                "{} {}: pos=({:.2}, {:.2}, {:.2}) speed={:.3} roll={:.1}",
                vehicle.archetype().name(),
                id.short(),
                state.position.x,
                state.position.y,
                state.position.z,
                state.speed(),
                state.roll(),
            );
        }
    }
    info!("Events: {:?}", events);
    if let Some(hash) = last_hash {
        info!("Final State Hash: {}", hex::encode(hash));
    }
    info!("Ticks run: {}", world.tick_count());
    Ok(())
}
