use bevy::prelude::*;

use crate::movement::components::{
    CustomMode, MovementMode, MovementSettings, Orientation, Role, RunState, Velocity, WallRunSide,
};
use crate::movement::physics::{apply_movement, SafeMove};
use crate::movement::wall_probe::GeometryProbe;
use crate::prediction::saved_move::SavedMove;

/// Threshold for position error before triggering a correction (world units)
pub const POSITION_CORRECTION_THRESHOLD: f32 = 5.0;

/// Threshold for velocity error before triggering a correction (units/second)
pub const VELOCITY_CORRECTION_THRESHOLD: f32 = 50.0;

/// Complete snapshot of a character's movement state at a specific moment
///
/// Used for:
/// - Storing predicted states for comparison with the server
/// - The starting point of a replay after a correction
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub mode: MovementMode,
    pub custom_mode: CustomMode,
    pub wall_run_direction: Vec3,
    pub wall_run_side: WallRunSide,
    /// Move sequence number that produced this state
    pub sequence: u64,
    /// Game time when this state was captured
    pub timestamp: f64,
}

impl Snapshot {
    pub fn capture(
        position: Vec3,
        velocity: &Velocity,
        orientation: &Orientation,
        state: &RunState,
        sequence: u64,
        timestamp: f64,
    ) -> Self {
        Self {
            position,
            velocity: velocity.linear,
            yaw: orientation.yaw,
            mode: state.mode,
            custom_mode: state.custom_mode,
            wall_run_direction: state.wall_run_direction,
            wall_run_side: state.wall_run_side,
            sequence,
            timestamp,
        }
    }

    /// Rebuild a movement state from this snapshot. The intent flags are
    /// left cleared; replay overwrites them from each saved move before
    /// re-simulating it.
    pub fn run_state(&self) -> RunState {
        let mut state = RunState {
            mode: self.mode,
            custom_mode: self.custom_mode,
            wall_run_direction: self.wall_run_direction,
            wall_run_side: self.wall_run_side,
            ..RunState::default()
        };
        state.plane_constrained = state.is_custom_mode(CustomMode::WallRunning);
        state
    }

    /// Distance between two states, for error detection
    pub fn distance_to(&self, other: &Snapshot) -> f32 {
        self.position.distance(other.position)
    }

    /// Velocity difference between two states
    pub fn velocity_difference(&self, other: &Snapshot) -> f32 {
        (self.velocity - other.velocity).length()
    }
}

/// Replays unacknowledged moves on top of authoritative server state
///
/// When the server sends a correction, this engine:
/// 1. Compares the authoritative state with what was predicted for it
/// 2. If the error is past threshold, re-simulates every pending move
/// 3. Produces the corrected state the character snaps to
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Check if the prediction error calls for a correction
    pub fn needs_correction(predicted: &Snapshot, server: &Snapshot) -> (bool, f32) {
        let position_error = predicted.distance_to(server);
        let velocity_error = predicted.velocity_difference(server);

        let needs_correction = position_error > POSITION_CORRECTION_THRESHOLD
            || velocity_error > VELOCITY_CORRECTION_THRESHOLD;

        (needs_correction, position_error)
    }

    /// Re-simulate from an authoritative state using the pending moves
    ///
    /// Each move is re-applied in its original recorded order: first its
    /// saved intent flags go back into the movement state, then the same
    /// deterministic physics step runs at the move's recorded delta time.
    pub fn re_simulate<W>(
        world: &W,
        server_state: &Snapshot,
        pending_moves: &[SavedMove],
        settings: &MovementSettings,
    ) -> Snapshot
    where
        W: GeometryProbe + SafeMove,
    {
        let mut position = server_state.position;
        let mut velocity = Velocity::from(server_state.velocity);
        let mut state = server_state.run_state();

        let mut yaw = server_state.yaw;
        for saved in pending_moves {
            saved.apply_to(&mut state);
            yaw = saved.yaw;
            let orientation = Orientation::new(yaw);

            apply_movement(
                world,
                &mut position,
                &mut velocity,
                &orientation,
                &mut state,
                settings,
                &saved.input(),
                saved.delta_time,
                Role::AutonomousProxy,
            );
        }

        let final_sequence = pending_moves
            .last()
            .map(|saved| saved.sequence)
            .unwrap_or(server_state.sequence);

        Snapshot {
            position,
            velocity: velocity.linear,
            yaw,
            mode: state.mode,
            custom_mode: state.custom_mode,
            wall_run_direction: state.wall_run_direction,
            wall_run_side: state.wall_run_side,
            sequence: final_sequence,
            timestamp: server_state.timestamp,
        }
    }
}
