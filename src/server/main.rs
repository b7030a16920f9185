// Module declarations for shared code
#[path = "../movement/mod.rs"]
mod movement;
#[path = "../networking.rs"]
mod networking;
#[path = "../prediction/mod.rs"]
mod prediction;
#[path = "../world.rs"]
mod world;

// Server modules
mod net;
mod simulation;
mod types;

use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;

use movement::SERVER_TIMESTEP;
use net::server_listener;
use networking::SERVER_PORT;
use simulation::{broadcast_state, process_server_commands, simulate_players, timeout_cleanup};
use types::{
    ConnectedClients, PlayerEntities, ServerCommand, ServerCommandReceiver, ServerCommandSender,
};
use world::Arena;

fn main() {
    // Bind the UDP socket before anything else; a dead port is fatal
    let socket = UdpSocket::bind(("0.0.0.0", SERVER_PORT))
        .unwrap_or_else(|e| panic!("Failed to bind UDP socket on port {}: {}", SERVER_PORT, e));
    println!("UDP server listening on 0.0.0.0:{}", SERVER_PORT);
    let socket = Arc::new(socket);

    let connected_clients = ConnectedClients::new(Arc::clone(&socket));

    // Command channel from the networking task into the simulation
    let (cmd_sender, cmd_receiver) = std::sync::mpsc::channel::<ServerCommand>();
    let cmd_sender = Arc::new(Mutex::new(cmd_sender));
    let cmd_receiver = Arc::new(Mutex::new(cmd_receiver));

    // Initialize Bevy's task pools for the listener
    bevy::tasks::IoTaskPool::get_or_init(bevy::tasks::TaskPool::new);

    server_listener(connected_clients.clone_handles(), Arc::clone(&cmd_sender));

    // Headless app ticking at the authoritative broadcast rate
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f32(
                SERVER_TIMESTEP,
            ))),
        )
        .insert_resource(connected_clients)
        .insert_resource(Arena::courtyard())
        .insert_resource(PlayerEntities::default())
        .insert_resource(ServerCommandReceiver { receiver: cmd_receiver })
        .insert_resource(ServerCommandSender { sender: cmd_sender })
        .add_systems(
            Update,
            (
                process_server_commands,
                simulate_players,
                broadcast_state,
                timeout_cleanup,
            )
                .chain(),
        )
        .run();
}
