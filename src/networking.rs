use std::io::{self, ErrorKind};
use std::net::UdpSocket;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::movement::components::{CustomMode, MovementMode, WallRunSide};
use crate::prediction::reconciliation::Snapshot;
use crate::prediction::saved_move::SavedMove;

pub const SERVER_PORT: u16 = 4000;

/// Messages from clients, one JSON object per datagram
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Hello,
    /// One transmitted saved move (possibly several combined ticks)
    Move {
        sequence: u64,
        delta_time: f32,
        accel_x: f32,
        accel_y: f32,
        accel_z: f32,
        yaw: f32,
        /// The compressed flag byte: base nibble plus custom intent bits
        flags: u8,
    },
}

impl ClientMessage {
    pub fn from_move(saved: &SavedMove) -> Self {
        ClientMessage::Move {
            sequence: saved.sequence,
            delta_time: saved.delta_time,
            accel_x: saved.acceleration.x,
            accel_y: saved.acceleration.y,
            accel_z: saved.acceleration.z,
            yaw: saved.yaw,
            flags: saved.compressed_flags().bits(),
        }
    }
}

/// Authoritative state for one character, flattened for the wire
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireSnapshot {
    pub player_id: u32,
    /// Last move sequence the server processed for this character
    pub sequence: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub yaw: f32,
    pub mode: MovementMode,
    /// Custom mode id; meaningful only when `mode` is `Custom`
    pub custom_mode: u8,
    pub wall_x: f32,
    pub wall_y: f32,
    pub wall_z: f32,
    pub side: WallRunSide,
    pub timestamp: f64,
}

impl WireSnapshot {
    pub fn from_snapshot(player_id: u32, snapshot: &Snapshot) -> Self {
        Self {
            player_id,
            sequence: snapshot.sequence,
            x: snapshot.position.x,
            y: snapshot.position.y,
            z: snapshot.position.z,
            vx: snapshot.velocity.x,
            vy: snapshot.velocity.y,
            vz: snapshot.velocity.z,
            yaw: snapshot.yaw,
            mode: snapshot.mode,
            custom_mode: snapshot.custom_mode.id(),
            wall_x: snapshot.wall_run_direction.x,
            wall_y: snapshot.wall_run_direction.y,
            wall_z: snapshot.wall_run_direction.z,
            side: snapshot.wall_run_side,
            timestamp: snapshot.timestamp,
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            position: Vec3::new(self.x, self.y, self.z),
            velocity: Vec3::new(self.vx, self.vy, self.vz),
            yaw: self.yaw,
            mode: self.mode,
            // Unknown ids from newer peers fall back to the default mode
            custom_mode: CustomMode::from_id(self.custom_mode).unwrap_or_default(),
            wall_run_direction: Vec3::new(self.wall_x, self.wall_y, self.wall_z),
            wall_run_side: self.side,
            sequence: self.sequence,
            timestamp: self.timestamp,
        }
    }
}

/// Messages from the server
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Welcome { player_id: u32 },
    Snapshot(WireSnapshot),
    PlayerLeft { player_id: u32 },
}

/// Client end of the UDP link. Non-blocking; systems drain it every tick.
pub struct Client {
    socket: UdpSocket,
}

impl Client {
    pub fn connect(server_addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(server_addr)?;
        socket.set_nonblocking(true)?;

        let client = Self { socket };
        client.send(&ClientMessage::Hello)?;
        Ok(client)
    }

    pub fn send(&self, message: &ClientMessage) -> io::Result<()> {
        let mut encoded = serde_json::to_string(message)
            .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
        encoded.push('\n');
        self.socket.send(encoded.as_bytes())?;
        Ok(())
    }

    /// Drain every pending datagram. Unparseable packets are dropped with a
    /// warning rather than stalling the simulation.
    pub fn drain(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        let mut buf = [0u8; 65536];

        loop {
            match self.socket.recv(&mut buf) {
                Ok(len) => {
                    let Ok(text) = std::str::from_utf8(&buf[..len]) else {
                        continue;
                    };
                    match serde_json::from_str::<ServerMessage>(text.trim()) {
                        Ok(message) => messages.push(message),
                        Err(err) => warn!("dropping malformed server message: {err}"),
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }

        messages
    }
}

/// Resource holding the client connection, if one was established
#[derive(Resource, Default)]
pub struct NetworkClient {
    pub client: Option<Client>,
    pub player_id: Option<u32>,
}
