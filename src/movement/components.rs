use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::movement::constants::*;

/// The character's active locomotion mode. Exactly one is active at a time;
/// `Custom` carries a secondary [`CustomMode`] id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    Walking,
    NavWalking,
    #[default]
    Falling,
    Swimming,
    Flying,
    Custom,
    None,
}

/// Custom movement mode ids carried while [`MovementMode::Custom`] is active.
/// Ids at or past `CUSTOM_MODE_MAX` are reserved for future modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomMode {
    #[default]
    WallRunning,
}

pub const CUSTOM_MODE_MAX: u8 = 1;

impl CustomMode {
    pub fn id(self) -> u8 {
        match self {
            CustomMode::WallRunning => 0,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CustomMode::WallRunning),
            _ => None,
        }
    }
}

/// Which side of the wall the character is running along.
/// Only meaningful while wall running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallRunSide {
    #[default]
    Left,
    Right,
}

/// Simulation authority level of a character instance. Ordering matters:
/// `role > Role::SimulatedProxy` gates local collision handling and input.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    SimulatedProxy,
    AutonomousProxy,
    Authority,
}

impl Role {
    /// True when this machine samples input for the character.
    pub fn is_locally_controlled(self) -> bool {
        self == Role::AutonomousProxy
    }
}

/// Per-character movement state owned by the mode state machine.
///
/// `wall_run_direction` and `wall_run_side` are meaningful only while
/// `mode == Custom` with `custom_mode == WallRunning`. Stale values are left
/// in place outside the mode and must be ignored by readers.
#[derive(Component, Clone, Debug)]
pub struct RunState {
    pub mode: MovementMode,
    pub custom_mode: CustomMode,
    pub wall_run_direction: Vec3,
    pub wall_run_side: WallRunSide,
    pub wants_to_sprint: bool,
    pub wall_run_keys_down: bool,
    /// True exactly while wall running; forces vertical velocity to zero so
    /// the character tracks the wall instead of falling off it.
    pub plane_constrained: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            mode: MovementMode::Falling,
            custom_mode: CustomMode::WallRunning,
            wall_run_direction: Vec3::ZERO,
            wall_run_side: WallRunSide::Left,
            wants_to_sprint: false,
            wall_run_keys_down: false,
            plane_constrained: false,
        }
    }
}

impl RunState {
    pub fn is_custom_mode(&self, custom_mode: CustomMode) -> bool {
        self.mode == MovementMode::Custom && self.custom_mode == custom_mode
    }

    pub fn is_moving_on_ground(&self) -> bool {
        matches!(self.mode, MovementMode::Walking | MovementMode::NavWalking)
    }
}

#[derive(Component, Clone, Deref, DerefMut)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Velocity {
    pub fn new() -> Self {
        Self { linear: Vec3::ZERO }
    }
}

impl From<Vec3> for Velocity {
    fn from(linear: Vec3) -> Self {
        Self { linear }
    }
}

/// Yaw-only facing, kept separate from the render transform so the
/// simulation stays deterministic across client and server.
#[derive(Component, Clone, Copy)]
pub struct Orientation {
    pub yaw: f32,
}

impl Orientation {
    pub fn new(yaw: f32) -> Self {
        Self { yaw }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y)
    }
}

/// Tunable speeds and accelerations for one character.
#[derive(Component, Clone)]
pub struct MovementSettings {
    pub run_speed: f32,
    pub sprint_speed: f32,
    pub crouch_speed: f32,
    pub run_acceleration: f32,
    pub sprint_acceleration: f32,
    pub base_acceleration: f32,
    pub max_swim_speed: f32,
    pub max_fly_speed: f32,
    pub max_custom_speed: f32,
    pub wall_run_speed: f32,
    pub wall_probe_vertical_tolerance: f32,
    /// Radians from vertical. Surfaces leaning at or past this are floors,
    /// not walls.
    pub walkable_floor_angle: f32,
    pub gravity: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            run_speed: RUN_SPEED,
            sprint_speed: SPRINT_SPEED,
            crouch_speed: CROUCH_SPEED,
            run_acceleration: RUN_ACCELERATION,
            sprint_acceleration: SPRINT_ACCELERATION,
            base_acceleration: BASE_ACCELERATION,
            max_swim_speed: MAX_SWIM_SPEED,
            max_fly_speed: MAX_FLY_SPEED,
            max_custom_speed: MAX_CUSTOM_SPEED,
            wall_run_speed: WALL_RUN_SPEED,
            wall_probe_vertical_tolerance: WALL_PROBE_VERTICAL_TOLERANCE,
            walkable_floor_angle: WALKABLE_FLOOR_ANGLE,
            gravity: GRAVITY,
        }
    }
}
