use bevy::prelude::*;

use crate::movement::components::{CustomMode, MovementMode, MovementSettings, RunState, Velocity};
use crate::movement::surface::{surface_is_wall_runnable, wall_run_direction_and_side};
use crate::movement::wall_probe::{is_next_to_wall, GeometryProbe};

/// Switch to a non-custom movement mode, running the change hooks.
pub fn set_movement_mode(state: &mut RunState, velocity: &mut Velocity, mode: MovementMode) {
    debug_assert!(mode != MovementMode::Custom, "custom modes go through set_custom_movement_mode");
    transition(state, velocity, mode, state.custom_mode);
}

/// Switch to a custom movement mode, running the change hooks.
pub fn set_custom_movement_mode(state: &mut RunState, velocity: &mut Velocity, custom_mode: CustomMode) {
    transition(state, velocity, MovementMode::Custom, custom_mode);
}

fn transition(state: &mut RunState, velocity: &mut Velocity, mode: MovementMode, custom_mode: CustomMode) {
    let previous = state.mode;
    let previous_custom = state.custom_mode;

    if previous == mode && previous_custom == custom_mode {
        return;
    }

    state.mode = mode;
    state.custom_mode = custom_mode;
    on_movement_mode_changed(state, velocity, previous, previous_custom);
}

/// Entry and exit hooks for mode changes.
///
/// Starting a wall run stops all current movement and constrains the
/// character to the wall's vertical plane; ending one, whatever the cause,
/// releases the constraint.
fn on_movement_mode_changed(
    state: &mut RunState,
    velocity: &mut Velocity,
    previous: MovementMode,
    previous_custom: CustomMode,
) {
    if state.is_custom_mode(CustomMode::WallRunning) {
        velocity.linear = Vec3::ZERO;
        state.plane_constrained = true;
    }

    let was_wall_running = previous == MovementMode::Custom && previous_custom == CustomMode::WallRunning;
    if was_wall_running && !state.is_custom_mode(CustomMode::WallRunning) {
        state.plane_constrained = false;
    }
}

/// Request a wall run. Refused unless the required keys are held.
pub fn begin_wall_run(state: &mut RunState, velocity: &mut Velocity) -> bool {
    if !state.wall_run_keys_down {
        return false;
    }

    set_custom_movement_mode(state, velocity, CustomMode::WallRunning);
    true
}

/// Drop back to falling, ending the wall run.
pub fn end_wall_run(state: &mut RunState, velocity: &mut Velocity) {
    set_movement_mode(state, velocity, MovementMode::Falling);
}

/// Collision-hit handler: a falling character that strikes a runnable wall
/// with the required keys held starts wall running.
///
/// Only roles above `SimulatedProxy` run this; simulated proxies receive the
/// resulting mode change through replication instead.
pub fn handle_character_hit(
    geometry: &impl GeometryProbe,
    state: &mut RunState,
    velocity: &mut Velocity,
    settings: &MovementSettings,
    position: Vec3,
    right: Vec3,
    hit_normal: Vec3,
) {
    if state.is_custom_mode(CustomMode::WallRunning) {
        return;
    }

    // Wall running can only begin from the air
    if state.mode != MovementMode::Falling {
        return;
    }

    if !surface_is_wall_runnable(hit_normal, settings.walkable_floor_angle) {
        return;
    }

    let (direction, side) = wall_run_direction_and_side(hit_normal, right);
    state.wall_run_direction = direction;
    state.wall_run_side = side;

    // The initial trigger gets no vertical slack
    if !is_next_to_wall(geometry, position, right, direction, side, 0.0) {
        return;
    }

    begin_wall_run(state, velocity);
}

/// Landing on the ground always ends an active wall run.
pub fn process_landed(state: &mut RunState, velocity: &mut Velocity) {
    if state.is_custom_mode(CustomMode::WallRunning) {
        end_wall_run(state, velocity);
    }

    set_movement_mode(state, velocity, MovementMode::Walking);
}

/// Max speed for the current mode, queried by the integrator every tick.
pub fn max_speed(state: &RunState, settings: &MovementSettings, crouching: bool) -> f32 {
    match state.mode {
        MovementMode::Walking | MovementMode::NavWalking => {
            if crouching {
                settings.crouch_speed
            } else if state.wants_to_sprint {
                settings.sprint_speed
            } else {
                settings.run_speed
            }
        }
        MovementMode::Falling => settings.run_speed,
        MovementMode::Swimming => settings.max_swim_speed,
        MovementMode::Flying => settings.max_fly_speed,
        MovementMode::Custom => settings.max_custom_speed,
        MovementMode::None => 0.0,
    }
}

/// Max acceleration, boosted while sprinting on the ground.
pub fn max_acceleration(state: &RunState, settings: &MovementSettings) -> f32 {
    if state.is_moving_on_ground() {
        if state.wants_to_sprint {
            return settings.sprint_acceleration;
        }
        return settings.run_acceleration;
    }

    settings.base_acceleration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::components::WallRunSide;
    use crate::movement::wall_probe::RayHit;

    struct AlwaysHit {
        normal: Vec3,
    }

    impl GeometryProbe for AlwaysHit {
        fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
            Some(RayHit { point: Vec3::ZERO, normal: self.normal })
        }
    }

    struct NeverHit;

    impl GeometryProbe for NeverHit {
        fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
            None
        }
    }

    fn falling_with_keys() -> (RunState, Velocity) {
        let mut state = RunState::default();
        state.mode = MovementMode::Falling;
        state.wall_run_keys_down = true;
        (state, Velocity::from(Vec3::new(0.0, -400.0, -200.0)))
    }

    #[test]
    fn test_begin_wall_run_requires_keys() {
        let mut state = RunState::default();
        let mut velocity = Velocity::new();

        state.wall_run_keys_down = false;
        assert!(!begin_wall_run(&mut state, &mut velocity));
        assert_eq!(state.mode, MovementMode::Falling);

        state.wall_run_keys_down = true;
        assert!(begin_wall_run(&mut state, &mut velocity));
        assert!(state.is_custom_mode(CustomMode::WallRunning));
    }

    #[test]
    fn test_entering_wall_run_zeroes_velocity_and_constrains() {
        let (mut state, mut velocity) = falling_with_keys();

        assert!(begin_wall_run(&mut state, &mut velocity));
        assert_eq!(velocity.linear, Vec3::ZERO);
        assert!(state.plane_constrained);
    }

    #[test]
    fn test_leaving_wall_run_releases_constraint() {
        let (mut state, mut velocity) = falling_with_keys();
        begin_wall_run(&mut state, &mut velocity);

        end_wall_run(&mut state, &mut velocity);
        assert_eq!(state.mode, MovementMode::Falling);
        assert!(!state.plane_constrained);
    }

    #[test]
    fn test_hit_on_runnable_wall_triggers_run() {
        // Surface normal leaning about 6 degrees from vertical
        let normal = Vec3::new(0.9, 0.1, 0.0).normalize();
        let geometry = AlwaysHit { normal };
        let settings = MovementSettings::default();
        let (mut state, mut velocity) = falling_with_keys();

        handle_character_hit(
            &geometry,
            &mut state,
            &mut velocity,
            &settings,
            Vec3::ZERO,
            Vec3::X,
            normal,
        );

        assert!(state.is_custom_mode(CustomMode::WallRunning));
        assert_eq!(state.wall_run_side, WallRunSide::Right);
        assert_eq!(velocity.linear, Vec3::ZERO);
        assert!(state.plane_constrained);
    }

    #[test]
    fn test_hit_while_not_falling_is_ignored() {
        let normal = Vec3::X;
        let geometry = AlwaysHit { normal };
        let settings = MovementSettings::default();
        let (mut state, mut velocity) = falling_with_keys();
        state.mode = MovementMode::Walking;

        handle_character_hit(&geometry, &mut state, &mut velocity, &settings, Vec3::ZERO, Vec3::X, normal);
        assert_eq!(state.mode, MovementMode::Walking);
    }

    #[test]
    fn test_hit_on_floor_surface_is_ignored() {
        let geometry = AlwaysHit { normal: Vec3::Y };
        let settings = MovementSettings::default();
        let (mut state, mut velocity) = falling_with_keys();

        handle_character_hit(&geometry, &mut state, &mut velocity, &settings, Vec3::ZERO, Vec3::X, Vec3::Y);
        assert_eq!(state.mode, MovementMode::Falling);
    }

    #[test]
    fn test_hit_without_proximity_confirmation_is_ignored() {
        let normal = Vec3::X;
        let geometry = NeverHit;
        let settings = MovementSettings::default();
        let (mut state, mut velocity) = falling_with_keys();

        handle_character_hit(&geometry, &mut state, &mut velocity, &settings, Vec3::ZERO, Vec3::X, normal);
        assert_eq!(state.mode, MovementMode::Falling);
    }

    #[test]
    fn test_landing_ends_wall_run() {
        let (mut state, mut velocity) = falling_with_keys();
        begin_wall_run(&mut state, &mut velocity);

        process_landed(&mut state, &mut velocity);
        assert_eq!(state.mode, MovementMode::Walking);
        assert!(!state.plane_constrained);
    }

    #[test]
    fn test_speed_table() {
        let settings = MovementSettings::default();
        let mut state = RunState::default();

        state.mode = MovementMode::Walking;
        assert_eq!(max_speed(&state, &settings, true), settings.crouch_speed);
        assert_eq!(max_speed(&state, &settings, false), settings.run_speed);
        state.wants_to_sprint = true;
        assert_eq!(max_speed(&state, &settings, false), settings.sprint_speed);
        // Crouching wins over sprint intent
        assert_eq!(max_speed(&state, &settings, true), settings.crouch_speed);

        state.mode = MovementMode::Falling;
        assert_eq!(max_speed(&state, &settings, false), settings.run_speed);

        state.mode = MovementMode::Swimming;
        assert_eq!(max_speed(&state, &settings, false), settings.max_swim_speed);

        state.mode = MovementMode::Flying;
        assert_eq!(max_speed(&state, &settings, false), settings.max_fly_speed);

        state.mode = MovementMode::Custom;
        assert_eq!(max_speed(&state, &settings, false), settings.max_custom_speed);

        state.mode = MovementMode::None;
        assert_eq!(max_speed(&state, &settings, false), 0.0);
    }

    #[test]
    fn test_acceleration_boosts_only_on_ground() {
        let settings = MovementSettings::default();
        let mut state = RunState::default();
        state.wants_to_sprint = true;

        state.mode = MovementMode::Walking;
        assert_eq!(max_acceleration(&state, &settings), settings.sprint_acceleration);

        state.wants_to_sprint = false;
        assert_eq!(max_acceleration(&state, &settings), settings.run_acceleration);

        state.mode = MovementMode::Falling;
        state.wants_to_sprint = true;
        assert_eq!(max_acceleration(&state, &settings), settings.base_acceleration);
    }

    #[test]
    fn test_mode_invariant_across_transitions() {
        let (mut state, mut velocity) = falling_with_keys();

        begin_wall_run(&mut state, &mut velocity);
        assert!(state.plane_constrained);

        end_wall_run(&mut state, &mut velocity);
        assert!(!state.plane_constrained);

        // Re-entering restores the constraint
        begin_wall_run(&mut state, &mut velocity);
        assert!(state.plane_constrained);

        process_landed(&mut state, &mut velocity);
        assert!(!state.plane_constrained);
    }
}
