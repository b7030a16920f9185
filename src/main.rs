mod movement;
mod networking;
mod player;
mod prediction;
mod world;

use bevy::prelude::*;

use movement::{MovementSettings, Orientation, Role, RunState, Velocity, CLIENT_TIMESTEP};
use networking::{Client, NetworkClient, SERVER_PORT};
use player::{
    capture_local_intent, handle_wall_collisions, predict_local_movement, receive_server_messages,
    ActionBindings, CharacterHit, Player, RemotePlayers,
};
use prediction::NetworkPrediction;
use world::{Arena, CHARACTER_HALF_HEIGHT, CHARACTER_RADIUS};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Wall Runners".into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(Time::<Fixed>::from_seconds(CLIENT_TIMESTEP as f64))
        .insert_resource(Arena::courtyard())
        .init_resource::<ActionBindings>()
        .init_resource::<NetworkClient>()
        .init_resource::<RemotePlayers>()
        .add_event::<CharacterHit>()
        .add_systems(Startup, (setup_scene, connect_to_server))
        .add_systems(
            FixedUpdate,
            (
                receive_server_messages,
                capture_local_intent,
                predict_local_movement,
                handle_wall_collisions,
            )
                .chain(),
        )
        .run();
}

fn connect_to_server(mut network: ResMut<NetworkClient>) {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("127.0.0.1:{SERVER_PORT}"));

    match Client::connect(&address) {
        Ok(client) => {
            info!("connecting to {address}");
            network.client = Some(client);
        }
        Err(err) => {
            // Offline play still predicts locally, it just never corrects
            warn!("no server at {address} ({err}); running offline");
        }
    }
}

fn setup_scene(
    mut commands: Commands,
    arena: Res<Arena>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // The local player, predicted every tick
    commands.spawn((
        Player,
        Role::AutonomousProxy,
        RunState::default(),
        Velocity::new(),
        Orientation::new(-std::f32::consts::FRAC_PI_2),
        MovementSettings::default(),
        NetworkPrediction::default(),
        Mesh3d(meshes.add(Capsule3d::new(
            CHARACTER_RADIUS,
            CHARACTER_HALF_HEIGHT * 2.0 - CHARACTER_RADIUS * 2.0,
        ))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.5, 0.9),
            ..default()
        })),
        Transform::from_xyz(0.0, 400.0, 800.0),
    ));

    // Solid level geometry, rendered straight from the arena blocks
    let block_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.6, 0.65),
        ..default()
    });
    for block in &arena.blocks {
        let size = block.size();
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
            MeshMaterial3d(block_material.clone()),
            Transform::from_translation(block.center()),
        ));
    }

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(500.0, 1200.0, 500.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 900.0, 1800.0).looking_at(Vec3::new(0.0, 200.0, 0.0), Vec3::Y),
    ));
}
