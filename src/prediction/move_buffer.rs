use std::collections::VecDeque;

use crate::prediction::saved_move::SavedMove;

/// Ring buffer of saved moves awaiting server acknowledgment
///
/// This buffer allows us to:
/// - Re-simulate movement from a past authoritative state
/// - Merge redundant adjacent moves before transmission
/// - Drop everything the server has already processed
pub struct PredictionBuffer {
    buffer: VecDeque<SavedMove>,
    max_size: usize,
    next_sequence: u64,
}

impl PredictionBuffer {
    /// Create a new buffer with a maximum capacity
    ///
    /// Suggested size: 120 ticks (~2 seconds at 60 Hz), which rides out
    /// round trips of up to a second comfortably.
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_size),
            max_size,
            // Sequence 0 is reserved to mean "nothing processed yet" in
            // server acknowledgments
            next_sequence: 1,
        }
    }

    /// Record a move and return the sequence number it was filed under.
    ///
    /// When the newest unacknowledged record can combine with the incoming
    /// one, the two merge into a single transmitted unit: the merged record
    /// keeps its sequence and flags and absorbs the new delta time. The
    /// flags are guaranteed identical by the combine rule, so the server
    /// still reconstructs exact per-tick intent.
    pub fn record(&mut self, mut new_move: SavedMove) -> u64 {
        if let Some(last) = self.buffer.back_mut() {
            if last.can_combine_with(&new_move) {
                last.delta_time += new_move.delta_time;
                return last.sequence;
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        new_move.sequence = sequence;
        self.buffer.push_back(new_move);

        // Maintain maximum buffer size
        if self.buffer.len() > self.max_size {
            self.buffer.pop_front();
        }

        sequence
    }

    /// Drop every move the server has acknowledged
    ///
    /// `sequence` is the last move the server reports having processed;
    /// everything at or before it is no longer needed for replay.
    pub fn acknowledge(&mut self, sequence: u64) {
        self.buffer.retain(|saved| saved.sequence > sequence);
    }

    /// All moves after a given sequence number, in recorded order
    ///
    /// Used for re-simulation after a correction: the server says which
    /// move it last processed and the client replays everything newer.
    pub fn pending_after(&self, sequence: u64) -> Vec<SavedMove> {
        self.buffer
            .iter()
            .filter(|saved| saved.sequence > sequence)
            .cloned()
            .collect()
    }

    /// Get the most recent sequence number handed out
    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.saturating_sub(1)
    }

    /// The newest unacknowledged record, if any
    pub fn latest(&self) -> Option<&SavedMove> {
        self.buffer.back()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
