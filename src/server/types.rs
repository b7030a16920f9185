use std::collections::{HashMap, VecDeque};
use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bevy::prelude::*;

use crate::prediction::saved_move::SavedMove;

/// Clients silent for this long are dropped
pub const CLIENT_TIMEOUT_SECS: u64 = 10;

#[derive(Component)]
pub struct PlayerId(pub u32);

/// Server-side character position; the server renders nothing, so there is
/// no transform to piggyback on.
#[derive(Component)]
pub struct Position(pub Vec3);

/// Saved moves received from one client, awaiting authoritative simulation.
///
/// Moves are kept in sequence order. A re-send of a still-queued sequence
/// replaces it, so combined moves arrive with their final delta time;
/// anything at or before the last processed sequence is stale and dropped.
#[derive(Component, Default)]
pub struct MoveQueue {
    pending: VecDeque<SavedMove>,
    last_processed: u64,
}

impl MoveQueue {
    pub fn submit(&mut self, saved: SavedMove) {
        if saved.sequence <= self.last_processed {
            return;
        }

        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|queued| queued.sequence == saved.sequence)
        {
            *existing = saved;
            return;
        }

        let insert_at = self
            .pending
            .iter()
            .position(|queued| queued.sequence > saved.sequence)
            .unwrap_or(self.pending.len());
        self.pending.insert(insert_at, saved);
    }

    /// Take every queued move, oldest first.
    pub fn drain_ready(&mut self) -> Vec<SavedMove> {
        self.pending.drain(..).collect()
    }

    pub fn mark_processed(&mut self, sequence: u64) {
        self.last_processed = self.last_processed.max(sequence);
    }

    /// Last sequence simulated for this client; 0 before the first move.
    pub fn last_processed(&self) -> u64 {
        self.last_processed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Shared connection bookkeeping between the listener thread and the
/// simulation systems.
#[derive(Resource)]
pub struct ConnectedClients {
    pub addr_to_id: Arc<Mutex<HashMap<SocketAddr, u32>>>,
    pub addrs: Arc<Mutex<HashMap<u32, SocketAddr>>>,
    pub last_seen: Arc<Mutex<HashMap<u32, Instant>>>,
    pub socket: Arc<UdpSocket>,
}

impl ConnectedClients {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self {
            addr_to_id: Arc::new(Mutex::new(HashMap::new())),
            addrs: Arc::new(Mutex::new(HashMap::new())),
            last_seen: Arc::new(Mutex::new(HashMap::new())),
            socket,
        }
    }

    pub fn clone_handles(&self) -> Self {
        Self {
            addr_to_id: Arc::clone(&self.addr_to_id),
            addrs: Arc::clone(&self.addrs),
            last_seen: Arc::clone(&self.last_seen),
            socket: Arc::clone(&self.socket),
        }
    }

    pub fn remove(&self, player_id: u32) {
        if let Ok(mut addrs) = self.addrs.lock() {
            if let Some(addr) = addrs.remove(&player_id) {
                if let Ok(mut addr_to_id) = self.addr_to_id.lock() {
                    addr_to_id.remove(&addr);
                }
            }
        }
        if let Ok(mut last_seen) = self.last_seen.lock() {
            last_seen.remove(&player_id);
        }
    }
}

/// Commands from the networking thread into the simulation
pub enum ServerCommand {
    PlayerJoined { player_id: u32 },
    PlayerMove { player_id: u32, saved: SavedMove },
}

#[derive(Resource)]
pub struct ServerCommandReceiver {
    pub receiver: Arc<Mutex<Receiver<ServerCommand>>>,
}

#[derive(Resource)]
pub struct ServerCommandSender {
    pub sender: Arc<Mutex<Sender<ServerCommand>>>,
}

#[derive(Resource, Default)]
pub struct PlayerEntities {
    pub map: HashMap<u32, Entity>,
}
