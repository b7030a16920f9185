use std::collections::HashMap;

use bevy::prelude::*;

use crate::movement::constants::MOVE_BUFFER_CAP;
use crate::prediction::move_buffer::PredictionBuffer;
use crate::prediction::reconciliation::Snapshot;
use crate::prediction::saved_move::SavedMove;

/// Per-connection prediction bookkeeping
///
/// Owns the unacknowledged move buffer and the recent predicted states that
/// corrections are compared against. One instance exists per predicted
/// character for the lifetime of its connection.
pub struct PredictionData {
    pub buffer: PredictionBuffer,

    /// Predicted states indexed by sequence number
    predicted_states: HashMap<u64, Snapshot>,

    /// Game time accumulator for timestamping
    pub game_time: f64,
}

impl PredictionData {
    pub fn new() -> Self {
        Self {
            buffer: PredictionBuffer::new(MOVE_BUFFER_CAP),
            predicted_states: HashMap::new(),
            game_time: 0.0,
        }
    }

    /// Hand out a fresh ledger record. Every record in the system comes from
    /// here; callers never build one by hand.
    pub fn allocate_move(&self) -> SavedMove {
        SavedMove::default()
    }

    /// Store a predicted state for later comparison with the server
    pub fn store_predicted_state(&mut self, state: Snapshot) {
        // Keep only the last 60 predicted states (~1 second)
        if self.predicted_states.len() > 60 {
            let min_sequence = state.sequence.saturating_sub(60);
            self.predicted_states.retain(|seq, _| *seq >= min_sequence);
        }

        self.predicted_states.insert(state.sequence, state);
    }

    /// Get a predicted state at a specific sequence number
    pub fn predicted_state(&self, sequence: u64) -> Option<&Snapshot> {
        self.predicted_states.get(&sequence)
    }

    pub fn update_time(&mut self, delta: f32) {
        self.game_time += delta as f64;
    }
}

impl Default for PredictionData {
    fn default() -> Self {
        Self::new()
    }
}

/// Component holding a character's lazily allocated prediction data.
///
/// The data is created on first request and the same instance is returned
/// for the rest of the character's lifetime; it is dropped with the entity.
#[derive(Component, Default)]
pub struct NetworkPrediction {
    data: Option<Box<PredictionData>>,
}

impl NetworkPrediction {
    /// The factory entry point: allocate on first use, then reuse.
    pub fn get_or_init(&mut self) -> &mut PredictionData {
        self.data.get_or_insert_with(|| Box::new(PredictionData::new()))
    }

    /// Borrow without allocating; `None` until the first `get_or_init`.
    pub fn get(&self) -> Option<&PredictionData> {
        self.data.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut PredictionData> {
        self.data.as_deref_mut()
    }
}
