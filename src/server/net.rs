use std::io;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bevy::prelude::*;
use bevy::tasks::IoTaskPool;

use crate::movement::flags::CompressedFlags;
use crate::networking::{ClientMessage, ServerMessage};
use crate::prediction::saved_move::SavedMove;
use crate::types::{ConnectedClients, ServerCommand};

/// Spawn the UDP listener task that handles incoming client datagrams.
///
/// Any datagram from an unknown address registers a new client and gets a
/// welcome with its id; recognized moves are decoded and handed to the
/// simulation through the command channel.
pub fn server_listener(
    connected_clients: ConnectedClients,
    cmd_sender: Arc<Mutex<Sender<ServerCommand>>>,
) {
    let task_pool = IoTaskPool::get();
    task_pool
        .spawn(async move {
            let mut next_id: u32 = 1;
            let mut buf = [0u8; 65536];

            loop {
                match connected_clients.socket.recv_from(&mut buf) {
                    Ok((len, addr)) => {
                        let Ok(message_str) = std::str::from_utf8(&buf[..len]) else {
                            continue;
                        };
                        let trimmed = message_str.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        // Get or assign the client id
                        let client_id = {
                            let mut addr_to_id = connected_clients.addr_to_id.lock().unwrap();

                            if let Some(&id) = addr_to_id.get(&addr) {
                                if let Ok(mut last_seen) = connected_clients.last_seen.lock() {
                                    last_seen.insert(id, Instant::now());
                                }
                                id
                            } else {
                                let id = next_id;
                                next_id += 1;

                                addr_to_id.insert(addr, id);
                                if let Ok(mut addrs) = connected_clients.addrs.lock() {
                                    addrs.insert(id, addr);
                                }
                                if let Ok(mut last_seen) = connected_clients.last_seen.lock() {
                                    last_seen.insert(id, Instant::now());
                                }

                                println!("New client {} from {}", id, addr);

                                let _ = send_to_addr(
                                    &connected_clients,
                                    addr,
                                    &ServerMessage::Welcome { player_id: id },
                                );
                                if let Ok(sender) = cmd_sender.lock() {
                                    let _ = sender.send(ServerCommand::PlayerJoined { player_id: id });
                                }

                                id
                            }
                        };

                        match serde_json::from_str::<ClientMessage>(trimmed) {
                            Ok(ClientMessage::Hello) => {}
                            Ok(ClientMessage::Move {
                                sequence,
                                delta_time,
                                accel_x,
                                accel_y,
                                accel_z,
                                yaw,
                                flags,
                            }) => {
                                let saved = saved_move_from_wire(
                                    sequence, delta_time, accel_x, accel_y, accel_z, yaw, flags,
                                );
                                if let Ok(sender) = cmd_sender.lock() {
                                    let _ = sender.send(ServerCommand::PlayerMove {
                                        player_id: client_id,
                                        saved,
                                    });
                                }
                            }
                            Err(e) => {
                                eprintln!("JSON parse error from {}: {}; raw={}", client_id, e, trimmed);
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("UDP receive error: {}", e);
                    }
                }
            }
        })
        .detach();
}

/// Rebuild a saved move from its wire form, decompressing the flag byte
/// back into the intent booleans.
fn saved_move_from_wire(
    sequence: u64,
    delta_time: f32,
    accel_x: f32,
    accel_y: f32,
    accel_z: f32,
    yaw: f32,
    flags: u8,
) -> SavedMove {
    let flags = CompressedFlags::from_bits(flags);
    let (wants_to_sprint, wall_run_keys_down) = flags.decode();

    SavedMove {
        sequence,
        delta_time,
        acceleration: Vec3::new(accel_x, accel_y, accel_z),
        yaw,
        base_flags: flags.base_bits(),
        saved_wants_to_sprint: wants_to_sprint,
        saved_wall_run_keys_down: wall_run_keys_down,
    }
}

pub fn send_to_addr(
    connected_clients: &ConnectedClients,
    addr: std::net::SocketAddr,
    message: &ServerMessage,
) -> io::Result<()> {
    let mut encoded = serde_json::to_string(message)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    encoded.push('\n');
    connected_clients.socket.send_to(encoded.as_bytes(), addr)?;
    Ok(())
}

/// Send a message to every connected client.
pub fn broadcast(connected_clients: &ConnectedClients, message: &ServerMessage) {
    let addrs: Vec<std::net::SocketAddr> = match connected_clients.addrs.lock() {
        Ok(addrs) => addrs.values().copied().collect(),
        Err(_) => return,
    };

    for addr in addrs {
        if let Err(e) = send_to_addr(connected_clients, addr, message) {
            eprintln!("send to {} failed: {}", addr, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_move_restores_intent() {
        let flags = CompressedFlags::encode(true, true).with_base(CompressedFlags::CROUCH);
        let saved = saved_move_from_wire(9, 0.05, 1.0, 0.0, -1.0, 0.8, flags.bits());

        assert_eq!(saved.sequence, 9);
        assert!(saved.saved_wants_to_sprint);
        assert!(saved.saved_wall_run_keys_down);
        assert_eq!(saved.base_flags, CompressedFlags::CROUCH);
        assert_eq!(saved.acceleration, Vec3::new(1.0, 0.0, -1.0));
        // The round trip through the record reproduces the wire byte
        assert_eq!(saved.compressed_flags().bits(), flags.bits());
    }
}
