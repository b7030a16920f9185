use bevy::prelude::*;

use crate::movement::constants::MAX_COMBINED_MOVE_DELTA;
use crate::movement::flags::CompressedFlags;
use crate::movement::physics::MoveInput;
use crate::movement::components::RunState;

/// One simulated tick's worth of player input and intent, kept until the
/// server acknowledges it.
///
/// Records are created by the prediction data's factory, filled from the
/// live movement state just before transmission, and replayed against it
/// when a server correction forces a re-simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavedMove {
    pub sequence: u64,
    pub delta_time: f32,
    /// Base move input: requested acceleration direction.
    pub acceleration: Vec3,
    /// Base move input: facing at the time of the move.
    pub yaw: f32,
    /// Base move flag nibble (jump, crouch).
    pub base_flags: u8,
    pub saved_wants_to_sprint: bool,
    pub saved_wall_run_keys_down: bool,
}

impl SavedMove {
    /// Reset every saved value so the record can be reused.
    pub fn clear(&mut self) {
        self.sequence = 0;
        self.delta_time = 0.0;
        self.acceleration = Vec3::ZERO;
        self.yaw = 0.0;
        self.base_flags = 0;
        self.saved_wants_to_sprint = false;
        self.saved_wall_run_keys_down = false;
    }

    /// The wire byte for this move: base flag bits plus the two custom
    /// intent bits.
    pub fn compressed_flags(&self) -> CompressedFlags {
        CompressedFlags::encode(self.saved_wants_to_sprint, self.saved_wall_run_keys_down)
            .with_base(self.base_flags)
    }

    /// Whether this record and the next may be merged into one transmitted
    /// unit.
    ///
    /// Intent flags must match bit for bit; a merged move carries a single
    /// flag byte, so differing flags would lose a tick of intent on the
    /// server. Only then does the base rule apply: identical steering and a
    /// bounded combined duration.
    pub fn can_combine_with(&self, new_move: &SavedMove) -> bool {
        if self.saved_wants_to_sprint != new_move.saved_wants_to_sprint
            || self.saved_wall_run_keys_down != new_move.saved_wall_run_keys_down
        {
            return false;
        }

        self.acceleration == new_move.acceleration
            && self.yaw == new_move.yaw
            && self.base_flags == new_move.base_flags
            && self.delta_time + new_move.delta_time <= MAX_COMBINED_MOVE_DELTA
    }

    /// Snapshot the live intent flags into this record before it is queued
    /// for transmission.
    pub fn capture_from(&mut self, state: &RunState) {
        self.saved_wants_to_sprint = state.wants_to_sprint;
        self.saved_wall_run_keys_down = state.wall_run_keys_down;
    }

    /// Write the saved intent flags back into the movement state. Runs
    /// during replay, before the tick is re-simulated.
    pub fn apply_to(&self, state: &mut RunState) {
        state.wants_to_sprint = self.saved_wants_to_sprint;
        state.wall_run_keys_down = self.saved_wall_run_keys_down;
    }

    /// The base move input this record replays with.
    pub fn input(&self) -> MoveInput {
        MoveInput {
            acceleration: self.acceleration,
            crouching: self.compressed_flags().crouching(),
        }
    }
}
