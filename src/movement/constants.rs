// Network and physics timing
pub const CLIENT_TIMESTEP: f32 = 1.0 / 60.0; // 60 Hz fixed simulation tick
pub const SERVER_TIMESTEP: f32 = 1.0 / 20.0; // 20 Hz authoritative broadcast

// Grounded movement
pub const RUN_SPEED: f32 = 300.0;
pub const SPRINT_SPEED: f32 = 800.0;
pub const CROUCH_SPEED: f32 = 300.0;
pub const RUN_ACCELERATION: f32 = 2000.0;
pub const SPRINT_ACCELERATION: f32 = 2000.0;

// Fallback acceleration for modes without their own entry
pub const BASE_ACCELERATION: f32 = 2048.0;

// Mode speed caps
pub const MAX_SWIM_SPEED: f32 = 300.0;
pub const MAX_FLY_SPEED: f32 = 600.0;
pub const MAX_CUSTOM_SPEED: f32 = 600.0;

pub const GRAVITY: f32 = 980.0;
pub const BRAKING_DECELERATION: f32 = 2048.0;

// Wall running
pub const WALL_RUN_SPEED: f32 = 625.0;
// Vertical room between the two probes when re-checking wall contact
pub const WALL_PROBE_VERTICAL_TOLERANCE: f32 = 50.0;
// How far ahead of the character the probe segment starts
pub const WALL_PROBE_INSET: f32 = 20.0;
// Lateral reach of the probe segment into the wall
pub const WALL_PROBE_REACH: f32 = 100.0;
// Normals pointing further down than this can never be wall ran
pub const WALL_NORMAL_DOWN_LIMIT: f32 = -0.05;
// 44.765 degrees, in radians. Walls at or past this lean are floors.
pub const WALKABLE_FLOOR_ANGLE: f32 = 0.781_29;

// Sprinting requires moving mostly toward facing
pub const SPRINT_FACING_THRESHOLD: f32 = 0.5;

// Saved-move bookkeeping
pub const MOVE_BUFFER_CAP: usize = 120; // ~2 seconds at 60 Hz
pub const MAX_COMBINED_MOVE_DELTA: f32 = 0.1;
