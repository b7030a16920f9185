use bevy::prelude::*;

use crate::movement::components::{
    CustomMode, MovementMode, MovementSettings, Orientation, Role, RunState, Velocity,
};
use crate::movement::constants::BRAKING_DECELERATION;
use crate::movement::modes::{end_wall_run, max_acceleration, max_speed, process_landed, set_movement_mode};
use crate::movement::wall_probe::{is_next_to_wall, GeometryProbe, RayHit};

/// Base move input for one simulated tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveInput {
    /// Requested acceleration direction, unit length or shorter.
    pub acceleration: Vec3,
    pub crouching: bool,
}

/// Result of resolving a displacement against world collision.
#[derive(Clone, Copy, Debug)]
pub struct MoveOutcome {
    pub position: Vec3,
    /// First blocking surface struck along the way, if any.
    pub hit: Option<RayHit>,
    /// True when the character ended the move standing on walkable ground.
    pub grounded: bool,
}

/// Collision-resolved movement. Implemented by the arena; the simulation
/// never moves a character without going through this.
pub trait SafeMove {
    fn move_and_slide(&self, position: Vec3, displacement: Vec3) -> MoveOutcome;
}

/// What one tick of movement produced, for the surrounding systems.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickOutcome {
    /// Blocking hit raised during integration; feeds collision-hit handling.
    pub hit: Option<RayHit>,
    pub landed: bool,
}

/// Advance one character by one tick.
///
/// This function is the shared deterministic step: the client predicts with
/// it, the reconciliation replay re-runs it, and the server simulates with
/// it. Intent capture must already have happened; the tick's ledger snapshot
/// happens after it returns.
pub fn apply_movement<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    orientation: &Orientation,
    state: &mut RunState,
    settings: &MovementSettings,
    input: &MoveInput,
    delta: f32,
    role: Role,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    // Simulated proxies never run their own physics; they are driven by
    // replicated state.
    if role == Role::SimulatedProxy {
        return TickOutcome::default();
    }

    let outcome = match state.mode {
        MovementMode::Walking | MovementMode::NavWalking => {
            phys_walking(world, position, velocity, state, settings, input, delta)
        }
        MovementMode::Falling => {
            phys_falling(world, position, velocity, state, settings, input, delta)
        }
        MovementMode::Swimming | MovementMode::Flying => {
            phys_free_move(world, position, velocity, state, settings, input, delta)
        }
        MovementMode::Custom => {
            phys_custom(world, position, velocity, orientation, state, settings, delta)
        }
        MovementMode::None => TickOutcome::default(),
    };

    // While constrained to the wall plane the character never gains
    // vertical velocity, whatever the mode physics did.
    if state.plane_constrained {
        velocity.linear.y = 0.0;
    }

    outcome
}

fn phys_walking<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    state: &mut RunState,
    settings: &MovementSettings,
    input: &MoveInput,
    delta: f32,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    let mut wish = input.acceleration;
    wish.y = 0.0;
    let wish = wish.clamp_length_max(1.0);

    if wish != Vec3::ZERO {
        velocity.linear += wish * max_acceleration(state, settings) * delta;
    } else {
        // Brake toward rest when no input is held
        let speed = velocity.linear.length();
        let new_speed = (speed - BRAKING_DECELERATION * delta).max(0.0);
        velocity.linear = if new_speed > 0.0 {
            velocity.linear.normalize() * new_speed
        } else {
            Vec3::ZERO
        };
    }

    velocity.linear.y = 0.0;
    velocity.linear = velocity
        .linear
        .clamp_length_max(max_speed(state, settings, input.crouching));

    let outcome = world.move_and_slide(*position, velocity.linear * delta);
    *position = outcome.position;

    if let Some(hit) = outcome.hit {
        cancel_into_surface(velocity, hit.normal);
    }

    if !outcome.grounded {
        set_movement_mode(state, velocity, MovementMode::Falling);
    }

    TickOutcome { hit: outcome.hit, landed: false }
}

fn phys_falling<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    state: &mut RunState,
    settings: &MovementSettings,
    input: &MoveInput,
    delta: f32,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    // Air control only steers the horizontal component
    let mut wish = input.acceleration;
    wish.y = 0.0;
    let wish = wish.clamp_length_max(1.0);

    let mut lateral = Vec3::new(velocity.linear.x, 0.0, velocity.linear.z);
    lateral += wish * max_acceleration(state, settings) * delta;
    lateral = lateral.clamp_length_max(max_speed(state, settings, input.crouching));

    velocity.linear.x = lateral.x;
    velocity.linear.z = lateral.z;
    velocity.linear.y -= settings.gravity * delta;

    let outcome = world.move_and_slide(*position, velocity.linear * delta);
    *position = outcome.position;

    if let Some(hit) = outcome.hit {
        cancel_into_surface(velocity, hit.normal);
    }

    let mut landed = false;
    if outcome.grounded {
        velocity.linear.y = 0.0;
        process_landed(state, velocity);
        landed = true;
    }

    TickOutcome { hit: outcome.hit, landed }
}

/// Swimming and flying share one propulsion model with mode-specific caps.
fn phys_free_move<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    state: &mut RunState,
    settings: &MovementSettings,
    input: &MoveInput,
    delta: f32,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    let wish = input.acceleration.clamp_length_max(1.0);
    velocity.linear += wish * max_acceleration(state, settings) * delta;
    velocity.linear = velocity
        .linear
        .clamp_length_max(max_speed(state, settings, input.crouching));

    let outcome = world.move_and_slide(*position, velocity.linear * delta);
    *position = outcome.position;

    if let Some(hit) = outcome.hit {
        cancel_into_surface(velocity, hit.normal);
    }

    TickOutcome { hit: outcome.hit, landed: false }
}

fn phys_custom<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    orientation: &Orientation,
    state: &mut RunState,
    settings: &MovementSettings,
    delta: f32,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    match state.custom_mode {
        CustomMode::WallRunning => {
            phys_wall_running(world, position, velocity, orientation, state, settings, delta)
        }
    }
}

/// One tick of wall running.
///
/// The run is re-validated before any movement: released keys or a failed
/// proximity probe drop the character back to falling without integrating
/// this tick. The sustain probe gets vertical slack because the server may
/// have nudged the character up or down since the run began.
fn phys_wall_running<W>(
    world: &W,
    position: &mut Vec3,
    velocity: &mut Velocity,
    orientation: &Orientation,
    state: &mut RunState,
    settings: &MovementSettings,
    delta: f32,
) -> TickOutcome
where
    W: GeometryProbe + SafeMove,
{
    if !state.wall_run_keys_down {
        end_wall_run(state, velocity);
        return TickOutcome::default();
    }

    if !is_next_to_wall(
        world,
        *position,
        orientation.right(),
        state.wall_run_direction,
        state.wall_run_side,
        settings.wall_probe_vertical_tolerance,
    ) {
        end_wall_run(state, velocity);
        return TickOutcome::default();
    }

    // Run along the wall at fixed speed, never vertically
    let mut new_velocity = state.wall_run_direction * settings.wall_run_speed;
    new_velocity.y = 0.0;
    velocity.linear = new_velocity;

    let outcome = world.move_and_slide(*position, velocity.linear * delta);
    *position = outcome.position;

    let mut landed = false;
    if outcome.grounded {
        process_landed(state, velocity);
        landed = true;
    }

    TickOutcome { hit: outcome.hit, landed }
}

fn cancel_into_surface(velocity: &mut Velocity, normal: Vec3) {
    let into = velocity.linear.dot(normal);
    if into < 0.0 {
        velocity.linear -= normal * into;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::components::WallRunSide;
    use crate::movement::modes::begin_wall_run;

    /// Flat test world: an optional wall to probe, ground at y = 0.
    struct TestWorld {
        wall_normal: Option<Vec3>,
        ground: bool,
    }

    impl GeometryProbe for TestWorld {
        fn cast_ray(&self, _start: Vec3, _end: Vec3) -> Option<RayHit> {
            self.wall_normal.map(|normal| RayHit { point: Vec3::ZERO, normal })
        }
    }

    impl SafeMove for TestWorld {
        fn move_and_slide(&self, position: Vec3, displacement: Vec3) -> MoveOutcome {
            let target = position + displacement;
            MoveOutcome {
                position: target,
                hit: None,
                grounded: self.ground && target.y <= 0.0,
            }
        }
    }

    fn wall_running_character() -> (RunState, Velocity, Orientation) {
        // Facing -Z with the wall on the +X flank
        let mut state = RunState::default();
        let mut velocity = Velocity::from(Vec3::new(0.0, -300.0, -200.0));
        state.wall_run_keys_down = true;
        state.wall_run_direction = Vec3::NEG_Z;
        state.wall_run_side = WallRunSide::Left;
        begin_wall_run(&mut state, &mut velocity);
        // yaw of -pi/2 faces -Z, putting the right vector on +X
        (state, velocity, Orientation::new(-std::f32::consts::FRAC_PI_2))
    }

    #[test]
    fn test_wall_run_sustain_sets_velocity_along_wall() {
        let world = TestWorld { wall_normal: Some(Vec3::NEG_X), ground: false };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        let mut position = Vec3::new(0.0, 120.0, 0.0);

        apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::AutonomousProxy,
        );

        assert!(state.is_custom_mode(CustomMode::WallRunning));
        assert_eq!(velocity.linear, Vec3::NEG_Z * settings.wall_run_speed);
        assert!(position.z < 0.0);
        assert_eq!(position.y, 120.0);
    }

    #[test]
    fn test_wall_run_ends_when_keys_release() {
        let world = TestWorld { wall_normal: Some(Vec3::NEG_X), ground: false };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        let mut position = Vec3::new(0.0, 120.0, 0.0);

        state.wall_run_keys_down = false;
        apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::AutonomousProxy,
        );

        // Transition happens before any integration that tick
        assert_eq!(state.mode, MovementMode::Falling);
        assert!(!state.plane_constrained);
        assert_eq!(position, Vec3::new(0.0, 120.0, 0.0));
    }

    #[test]
    fn test_wall_run_ends_when_probe_misses() {
        let world = TestWorld { wall_normal: None, ground: false };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        let mut position = Vec3::new(0.0, 120.0, 0.0);

        apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::AutonomousProxy,
        );

        assert_eq!(state.mode, MovementMode::Falling);
        assert!(!state.plane_constrained);
    }

    #[test]
    fn test_wall_run_ends_when_side_flips() {
        // The probe hits a wall facing the other way: a rounded corner
        let world = TestWorld { wall_normal: Some(Vec3::X), ground: false };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        let mut position = Vec3::new(0.0, 120.0, 0.0);

        apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::AutonomousProxy,
        );

        assert_eq!(state.mode, MovementMode::Falling);
    }

    #[test]
    fn test_simulated_proxy_never_integrates() {
        let world = TestWorld { wall_normal: Some(Vec3::NEG_X), ground: false };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        let mut position = Vec3::new(0.0, 120.0, 0.0);
        let velocity_before = velocity.linear;

        apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::SimulatedProxy,
        );

        assert_eq!(position, Vec3::new(0.0, 120.0, 0.0));
        assert_eq!(velocity.linear, velocity_before);
    }

    #[test]
    fn test_falling_applies_gravity_and_lands() {
        let world = TestWorld { wall_normal: None, ground: true };
        let mut state = RunState::default();
        let mut velocity = Velocity::new();
        let settings = MovementSettings::default();
        let orientation = Orientation::new(0.0);
        let mut position = Vec3::new(0.0, 1.0, 0.0);

        let mut landed = false;
        for _ in 0..120 {
            let outcome = apply_movement(
                &world,
                &mut position,
                &mut velocity,
                &orientation,
                &mut state,
                &settings,
                &MoveInput::default(),
                1.0 / 60.0,
                Role::Authority,
            );
            if outcome.landed {
                landed = true;
                break;
            }
        }

        assert!(landed);
        assert_eq!(state.mode, MovementMode::Walking);
        assert_eq!(velocity.linear.y, 0.0);
    }

    #[test]
    fn test_landing_while_wall_running_ends_the_run() {
        let world = TestWorld { wall_normal: Some(Vec3::NEG_X), ground: true };
        let (mut state, mut velocity, orientation) = wall_running_character();
        let settings = MovementSettings::default();
        // Already at ground level, so the slide ends grounded
        let mut position = Vec3::new(0.0, 0.0, 0.0);

        let outcome = apply_movement(
            &world,
            &mut position,
            &mut velocity,
            &orientation,
            &mut state,
            &settings,
            &MoveInput::default(),
            1.0 / 60.0,
            Role::AutonomousProxy,
        );

        assert!(outcome.landed);
        assert_eq!(state.mode, MovementMode::Walking);
        assert!(!state.plane_constrained);
    }

    #[test]
    fn test_walking_clamps_to_sprint_speed() {
        let world = TestWorld { wall_normal: None, ground: true };
        let mut state = RunState::default();
        state.mode = MovementMode::Walking;
        state.wants_to_sprint = true;
        let mut velocity = Velocity::new();
        let settings = MovementSettings::default();
        let orientation = Orientation::new(0.0);
        let mut position = Vec3::ZERO;
        let input = MoveInput { acceleration: Vec3::X, crouching: false };

        for _ in 0..600 {
            apply_movement(
                &world,
                &mut position,
                &mut velocity,
                &orientation,
                &mut state,
                &settings,
                &input,
                1.0 / 60.0,
                Role::AutonomousProxy,
            );
        }

        assert!((velocity.linear.length() - settings.sprint_speed).abs() < 1.0);
    }

    #[test]
    fn test_determinism_same_inputs_same_trajectory() {
        let run = || {
            let world = TestWorld { wall_normal: Some(Vec3::NEG_X), ground: false };
            let (mut state, mut velocity, orientation) = wall_running_character();
            let settings = MovementSettings::default();
            let mut position = Vec3::new(0.0, 120.0, 0.0);
            for _ in 0..30 {
                apply_movement(
                    &world,
                    &mut position,
                    &mut velocity,
                    &orientation,
                    &mut state,
                    &settings,
                    &MoveInput::default(),
                    1.0 / 60.0,
                    Role::AutonomousProxy,
                );
            }
            (position, velocity.linear, state.mode)
        };

        assert_eq!(run(), run());
    }
}
