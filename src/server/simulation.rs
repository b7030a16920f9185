use bevy::prelude::*;

use crate::movement::components::{
    MovementSettings, Orientation, Role, RunState, Velocity,
};
use crate::movement::modes::handle_character_hit;
use crate::movement::physics::apply_movement;
use crate::net::broadcast;
use crate::networking::{ServerMessage, WireSnapshot};
use crate::prediction::reconciliation::Snapshot;
use crate::types::{
    ConnectedClients, MoveQueue, PlayerEntities, PlayerId, Position, ServerCommand,
    ServerCommandReceiver, CLIENT_TIMEOUT_SECS,
};
use crate::world::Arena;

/// Drain the networking thread's commands into the ECS.
pub fn process_server_commands(
    mut commands: Commands,
    receiver: Res<ServerCommandReceiver>,
    mut players: ResMut<PlayerEntities>,
    mut queues: Query<&mut MoveQueue>,
) {
    let rx = receiver.receiver.lock().unwrap();

    while let Ok(command) = rx.try_recv() {
        match command {
            ServerCommand::PlayerJoined { player_id } => {
                if players.map.contains_key(&player_id) {
                    continue;
                }

                println!("Spawning character for player {}", player_id);
                let entity = commands
                    .spawn((
                        PlayerId(player_id),
                        Position(Vec3::new(0.0, 400.0, 800.0)),
                        Velocity::new(),
                        Orientation::new(-std::f32::consts::FRAC_PI_2),
                        RunState::default(),
                        MovementSettings::default(),
                        Role::Authority,
                        MoveQueue::default(),
                    ))
                    .id();
                players.map.insert(player_id, entity);
            }

            ServerCommand::PlayerMove { player_id, saved } => {
                let Some(&entity) = players.map.get(&player_id) else {
                    continue;
                };
                if let Ok(mut queue) = queues.get_mut(entity) {
                    queue.submit(saved);
                }
            }
        }
    }
}

/// Authoritative simulation: replay every queued saved move through the
/// same deterministic step the clients predict with.
///
/// Each move restores its recorded intent flags first, then integrates at
/// its recorded delta time, so the server reproduces the client's
/// trajectory exactly when the prediction was honest.
pub fn simulate_players(
    arena: Res<Arena>,
    mut query: Query<(
        &mut Position,
        &mut Velocity,
        &mut Orientation,
        &mut RunState,
        &MovementSettings,
        &mut MoveQueue,
    )>,
) {
    for (mut position, mut velocity, mut orientation, mut state, settings, mut queue) in query.iter_mut() {
        for saved in queue.drain_ready() {
            saved.apply_to(&mut state);
            orientation.yaw = saved.yaw;
            let facing = *orientation;

            let outcome = apply_movement(
                &*arena,
                &mut position.0,
                &mut velocity,
                &facing,
                &mut state,
                settings,
                &saved.input(),
                saved.delta_time,
                Role::Authority,
            );

            // The authority runs its own collision handling; wall runs can
            // begin here even if the client missed the hit
            if let Some(hit) = outcome.hit {
                handle_character_hit(
                    &*arena,
                    &mut state,
                    &mut velocity,
                    settings,
                    position.0,
                    facing.right(),
                    hit.normal,
                );
            }

            queue.mark_processed(saved.sequence);
        }
    }
}

/// Broadcast every character's authoritative state to all clients.
pub fn broadcast_state(
    time: Res<Time>,
    connected_clients: Res<ConnectedClients>,
    query: Query<(&PlayerId, &Position, &Velocity, &Orientation, &RunState, &MoveQueue)>,
) {
    for (player_id, position, velocity, orientation, state, queue) in query.iter() {
        let snapshot = Snapshot::capture(
            position.0,
            velocity,
            orientation,
            state,
            queue.last_processed(),
            time.elapsed_secs_f64(),
        );

        let wire = WireSnapshot::from_snapshot(player_id.0, &snapshot);
        broadcast(&connected_clients, &ServerMessage::Snapshot(wire));
    }
}

/// Drop clients that have gone silent and tell everyone else.
pub fn timeout_cleanup(
    mut commands: Commands,
    connected_clients: Res<ConnectedClients>,
    mut players: ResMut<PlayerEntities>,
) {
    let timed_out: Vec<u32> = match connected_clients.last_seen.lock() {
        Ok(last_seen) => last_seen
            .iter()
            .filter(|(_, seen)| seen.elapsed().as_secs() >= CLIENT_TIMEOUT_SECS)
            .map(|(id, _)| *id)
            .collect(),
        Err(_) => return,
    };

    for player_id in timed_out {
        println!("Player {} timed out", player_id);
        connected_clients.remove(player_id);

        if let Some(entity) = players.map.remove(&player_id) {
            commands.entity(entity).despawn();
        }

        broadcast(&connected_clients, &ServerMessage::PlayerLeft { player_id });
    }
}
