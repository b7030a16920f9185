use std::collections::HashMap;

use bevy::prelude::*;

use crate::movement::components::{
    MovementSettings, Orientation, Role, RunState, Velocity,
};
use crate::movement::flags::CompressedFlags;
use crate::movement::intent::{capture_intent, InputSource};
use crate::movement::modes::handle_character_hit;
use crate::movement::physics::{apply_movement, MoveInput};
use crate::networking::{ClientMessage, NetworkClient, ServerMessage, WireSnapshot};
use crate::prediction::prediction_data::NetworkPrediction;
use crate::prediction::reconciliation::{ReconciliationEngine, Snapshot};
use crate::world::{Arena, CHARACTER_HALF_HEIGHT, CHARACTER_RADIUS};

/// Turn rate while holding the steer keys, radians per second
pub const TURN_RATE: f32 = 3.0;

pub const ACTION_CROUCH: &str = "Crouch";

#[derive(Component)]
pub struct Player;

/// A character mirrored from another connection; never simulated locally.
#[derive(Component)]
pub struct RemotePlayer {
    pub player_id: u32,
}

/// Raised when the locally simulated character strikes a blocking surface.
#[derive(Event)]
pub struct CharacterHit {
    pub entity: Entity,
    pub normal: Vec3,
}

/// Keyboard bindings for named actions.
#[derive(Resource)]
pub struct ActionBindings {
    bindings: HashMap<&'static str, Vec<KeyCode>>,
}

impl Default for ActionBindings {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(crate::movement::intent::ACTION_SPRINT, vec![KeyCode::ShiftLeft]);
        bindings.insert(crate::movement::intent::ACTION_WALL_RUN, vec![KeyCode::ShiftLeft]);
        bindings.insert(ACTION_CROUCH, vec![KeyCode::ControlLeft]);
        Self { bindings }
    }
}

impl ActionBindings {
    pub fn keys_for(&self, action: &str) -> &[KeyCode] {
        self.bindings.get(action).map_or(&[], Vec::as_slice)
    }
}

/// Live keyboard state seen through the named-action bindings.
pub struct KeyboardActions<'a> {
    pub keys: &'a ButtonInput<KeyCode>,
    pub bindings: &'a ActionBindings,
}

impl InputSource for KeyboardActions<'_> {
    fn action_down(&self, action: &str) -> bool {
        self.bindings
            .keys_for(action)
            .iter()
            .any(|key| self.keys.pressed(*key))
    }

    fn all_action_keys_down(&self, action: &str) -> bool {
        let keys = self.bindings.keys_for(action);
        !keys.is_empty() && keys.iter().all(|key| self.keys.pressed(*key))
    }
}

/// Entities spawned for other connections, by player id
#[derive(Resource, Default)]
pub struct RemotePlayers {
    pub entities: HashMap<u32, Entity>,
}

/// Sample the per-tick intent flags from local input.
///
/// Runs before anything else in the tick; the flags feed the mode
/// transitions, the physics step, and finally the saved move.
pub fn capture_local_intent(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<ActionBindings>,
    mut query: Query<(&mut RunState, &Velocity, &Orientation, &Role), With<Player>>,
) {
    let input = KeyboardActions { keys: &keys, bindings: &bindings };

    for (mut state, velocity, orientation, role) in query.iter_mut() {
        if !role.is_locally_controlled() {
            continue;
        }

        capture_intent(&mut state, velocity, orientation.forward(), Some(&input));
    }
}

/// Predict the local character and queue the tick's saved move.
///
/// This is the client half of the prediction loop: simulate with the same
/// deterministic step the server uses, snapshot the result for later
/// comparison, and ship the move. The newest buffer record is re-sent every
/// tick so combined moves reach the server with their final delta time.
pub fn predict_local_movement(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<ActionBindings>,
    arena: Res<Arena>,
    time: Res<Time>,
    mut network: ResMut<NetworkClient>,
    mut hits: EventWriter<CharacterHit>,
    mut query: Query<
        (
            Entity,
            &mut Transform,
            &mut Velocity,
            &mut Orientation,
            &mut RunState,
            &MovementSettings,
            &Role,
            &mut NetworkPrediction,
        ),
        With<Player>,
    >,
) {
    let delta = time.delta_secs();
    let input = KeyboardActions { keys: &keys, bindings: &bindings };

    for (entity, mut transform, mut velocity, mut orientation, mut state, settings, role, mut prediction) in
        query.iter_mut()
    {
        if !role.is_locally_controlled() {
            continue;
        }

        // Steering rotates the facing; forward/back request acceleration
        if keys.pressed(KeyCode::KeyA) {
            orientation.yaw -= TURN_RATE * delta;
        }
        if keys.pressed(KeyCode::KeyD) {
            orientation.yaw += TURN_RATE * delta;
        }

        let mut acceleration = Vec3::ZERO;
        if keys.pressed(KeyCode::KeyW) {
            acceleration += orientation.forward();
        }
        if keys.pressed(KeyCode::KeyS) {
            acceleration -= orientation.forward();
        }

        let mut base_flags = 0;
        if input.action_down(ACTION_CROUCH) {
            base_flags |= CompressedFlags::CROUCH;
        }

        let move_input = MoveInput {
            acceleration,
            crouching: base_flags & CompressedFlags::CROUCH != 0,
        };

        let outcome = apply_movement(
            &*arena,
            &mut transform.translation,
            &mut velocity,
            &orientation,
            &mut state,
            settings,
            &move_input,
            delta,
            *role,
        );

        if let Some(hit) = outcome.hit {
            hits.write(CharacterHit { entity, normal: hit.normal });
        }

        transform.rotation = Quat::from_rotation_y(-orientation.yaw);

        // Ledger snapshot: fill a fresh record from the live state and file it
        let data = prediction.get_or_init();
        data.update_time(delta);

        let mut saved = data.allocate_move();
        saved.delta_time = delta;
        saved.acceleration = acceleration;
        saved.yaw = orientation.yaw;
        saved.base_flags = base_flags;
        saved.capture_from(&state);

        let sequence = data.buffer.record(saved);

        let timestamp = data.game_time;
        let predicted = Snapshot::capture(
            transform.translation,
            &velocity,
            &orientation,
            &state,
            sequence,
            timestamp,
        );
        data.store_predicted_state(predicted);

        if let Some(client) = network.client.as_mut() {
            // The freshest record carries any combined delta time
            if let Some(latest) = data.buffer.latest() {
                if let Err(err) = client.send(&ClientMessage::from_move(latest)) {
                    warn!("failed to send move {sequence}: {err}");
                }
            }
        }
    }
}

/// React to collision hits raised during integration.
///
/// Only roles above `SimulatedProxy` handle their own collisions; remote
/// mirrors get the resulting mode change from replication.
pub fn handle_wall_collisions(
    arena: Res<Arena>,
    mut hits: EventReader<CharacterHit>,
    mut query: Query<(&mut RunState, &mut Velocity, &Transform, &Orientation, &MovementSettings, &Role)>,
) {
    for hit in hits.read() {
        let Ok((mut state, mut velocity, transform, orientation, settings, role)) = query.get_mut(hit.entity)
        else {
            continue;
        };

        if *role <= Role::SimulatedProxy {
            continue;
        }

        handle_character_hit(
            &*arena,
            &mut state,
            &mut velocity,
            settings,
            transform.translation,
            orientation.right(),
            hit.normal,
        );
    }
}

/// Drain the server link: corrections for the local character, replicated
/// state for everyone else's.
pub fn receive_server_messages(
    mut commands: Commands,
    arena: Res<Arena>,
    mut network: ResMut<NetworkClient>,
    mut remotes: ResMut<RemotePlayers>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut local: Query<
        (
            &mut Transform,
            &mut Velocity,
            &mut Orientation,
            &mut RunState,
            &MovementSettings,
            &mut NetworkPrediction,
        ),
        (With<Player>, Without<RemotePlayer>),
    >,
    mut remote_query: Query<
        (&mut Transform, &mut Velocity, &mut Orientation, &mut RunState),
        With<RemotePlayer>,
    >,
) {
    let Some(client) = network.client.as_ref() else {
        return;
    };

    let messages = client.drain();
    for message in messages {
        match message {
            ServerMessage::Welcome { player_id } => {
                info!("connected as player {player_id}");
                network.player_id = Some(player_id);
            }

            ServerMessage::Snapshot(wire) => {
                // Until the welcome arrives we cannot tell our own state
                // from everyone else's; drop snapshots rather than guess
                let Some(local_id) = network.player_id else {
                    continue;
                };

                if wire.player_id == local_id {
                    if let Ok((transform, velocity, orientation, state, settings, prediction)) =
                        local.single_mut()
                    {
                        reconcile_local(
                            &arena, &wire, transform, velocity, orientation, state, settings,
                            prediction,
                        );
                    }
                } else {
                    apply_remote_snapshot(
                        &mut commands,
                        &mut remotes,
                        &mut meshes,
                        &mut materials,
                        &mut remote_query,
                        &wire,
                    );
                }
            }

            ServerMessage::PlayerLeft { player_id } => {
                if let Some(entity) = remotes.entities.remove(&player_id) {
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

/// Reconcile the local prediction against an authoritative snapshot.
fn reconcile_local(
    arena: &Arena,
    wire: &WireSnapshot,
    mut transform: Mut<Transform>,
    mut velocity: Mut<Velocity>,
    mut orientation: Mut<Orientation>,
    mut state: Mut<RunState>,
    settings: &MovementSettings,
    mut prediction: Mut<NetworkPrediction>,
) {
    let server_state = wire.to_snapshot();
    let data = prediction.get_or_init();

    // Everything the server has processed is no longer needed for replay
    data.buffer.acknowledge(server_state.sequence);

    if let Some(predicted) = data.predicted_state(server_state.sequence) {
        let (needs_correction, error) = ReconciliationEngine::needs_correction(predicted, &server_state);
        if !needs_correction {
            return;
        }
        debug!("correcting prediction error of {error:.1} units at sequence {}", server_state.sequence);
    }

    // Replay every unacknowledged move on top of the authoritative state
    let pending = data.buffer.pending_after(server_state.sequence);
    let corrected = ReconciliationEngine::re_simulate(arena, &server_state, &pending, settings);

    transform.translation = corrected.position;
    transform.rotation = Quat::from_rotation_y(-corrected.yaw);
    velocity.linear = corrected.velocity;
    orientation.yaw = corrected.yaw;

    // The live intent flags are per-tick local data; carry them across
    let wants_to_sprint = state.wants_to_sprint;
    let wall_run_keys_down = state.wall_run_keys_down;
    *state = corrected.run_state();
    state.wants_to_sprint = wants_to_sprint;
    state.wall_run_keys_down = wall_run_keys_down;
}

/// Mirror another connection's authoritative state onto its local entity,
/// spawning one on first sight.
fn apply_remote_snapshot(
    commands: &mut Commands,
    remotes: &mut RemotePlayers,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    remote_query: &mut Query<
        (&mut Transform, &mut Velocity, &mut Orientation, &mut RunState),
        With<RemotePlayer>,
    >,
    wire: &WireSnapshot,
) {
    let snapshot = wire.to_snapshot();

    if let Some(&entity) = remotes.entities.get(&wire.player_id) {
        if let Ok((mut transform, mut velocity, mut orientation, mut state)) = remote_query.get_mut(entity) {
            transform.translation = snapshot.position;
            transform.rotation = Quat::from_rotation_y(-snapshot.yaw);
            velocity.linear = snapshot.velocity;
            orientation.yaw = snapshot.yaw;
            *state = snapshot.run_state();
        }
        return;
    }

    info!("player {} entered view", wire.player_id);
    let entity = commands
        .spawn((
            RemotePlayer { player_id: wire.player_id },
            Role::SimulatedProxy,
            Velocity::from(snapshot.velocity),
            Orientation::new(snapshot.yaw),
            snapshot.run_state(),
            MovementSettings::default(),
            Mesh3d(meshes.add(Capsule3d::new(CHARACTER_RADIUS, CHARACTER_HALF_HEIGHT * 2.0 - CHARACTER_RADIUS * 2.0))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.8, 0.3, 0.3),
                ..default()
            })),
            Transform::from_translation(snapshot.position),
        ))
        .id();
    remotes.entities.insert(wire.player_id, entity);
}
