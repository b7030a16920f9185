use bevy::prelude::*;

use crate::movement::components::{RunState, Velocity};
use crate::movement::constants::SPRINT_FACING_THRESHOLD;

pub const ACTION_SPRINT: &str = "Sprint";
pub const ACTION_WALL_RUN: &str = "WallRun";

/// Named-action key state for the locally controlling player.
///
/// Sampled once per tick before physics; every other role receives the
/// resulting intent through the compressed move flags instead.
pub trait InputSource {
    /// True if any key bound to the action is currently held.
    fn action_down(&self, action: &str) -> bool;

    /// True if every key bound to the action is currently held.
    /// An unbound action reports false.
    fn all_action_keys_down(&self, action: &str) -> bool;
}

/// True when the keys required to start or keep a wall run are held.
/// A missing controller means no keys; this never assumes true.
pub fn required_wall_run_keys_down(input: Option<&dyn InputSource>) -> bool {
    let Some(input) = input else {
        return false;
    };

    input.action_down(ACTION_SPRINT) && input.all_action_keys_down(ACTION_WALL_RUN)
}

/// Recompute the per-tick intent flags from live input.
///
/// Sprinting is only wanted while actually moving forward: the horizontal
/// velocity must point within 60 degrees of the horizontal facing, which
/// stops sprinting backward or sideways.
pub fn capture_intent(
    state: &mut RunState,
    velocity: &Velocity,
    forward: Vec3,
    input: Option<&dyn InputSource>,
) {
    let sprint_key_down = input.is_some_and(|input| input.action_down(ACTION_SPRINT));

    if sprint_key_down {
        let mut velocity_flat = velocity.linear;
        let mut forward_flat = forward;
        velocity_flat.y = 0.0;
        forward_flat.y = 0.0;

        let velocity_flat = velocity_flat.normalize_or_zero();
        let forward_flat = forward_flat.normalize_or_zero();

        state.wants_to_sprint = velocity_flat.dot(forward_flat) > SPRINT_FACING_THRESHOLD;
    } else {
        state.wants_to_sprint = false;
    }

    state.wall_run_keys_down = required_wall_run_keys_down(input);
}
