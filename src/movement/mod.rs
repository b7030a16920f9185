// Shared movement simulation: the mode state machine, wall-run detection
// and physics, and the intent flags that replicate to the server.
//
// Everything in here is deterministic and runs identically on the
// predicting client, the reconciliation replay, and the authoritative
// server.

pub mod components;
pub mod constants;
pub mod flags;
pub mod intent;
pub mod modes;
pub mod physics;
pub mod surface;
pub mod wall_probe;

pub use components::*;
pub use constants::*;
pub use flags::CompressedFlags;
pub use intent::{capture_intent, required_wall_run_keys_down, InputSource, ACTION_SPRINT, ACTION_WALL_RUN};
pub use modes::*;
pub use physics::{apply_movement, MoveInput, MoveOutcome, SafeMove, TickOutcome};
pub use surface::{surface_is_wall_runnable, wall_run_direction_and_side};
pub use wall_probe::{is_next_to_wall, GeometryProbe, RayHit};
