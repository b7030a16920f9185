use bevy::prelude::*;

use crate::movement::components::WallRunSide;
use crate::movement::constants::{WALL_PROBE_INSET, WALL_PROBE_REACH};
use crate::movement::surface::wall_run_direction_and_side;

/// Result of a first-hit ray query against world collision.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Read-only ray access to world geometry. Implemented by the arena and by
/// canned probes in tests; queries never mutate world state.
pub trait GeometryProbe {
    /// First hit along the segment from `start` to `end`, or `None`.
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit>;
}

/// Check that the character is still alongside the wall it is running on.
///
/// The probe segment starts slightly ahead along the run direction and
/// reaches laterally into the wall. With a vertical tolerance the segment is
/// probed twice, offset up and down by half the tolerance, and either hit
/// counts; the character may have drifted vertically since the run began.
/// With zero tolerance a single probe must hit.
///
/// Any hit is reclassified from its impact normal. A side that no longer
/// matches means the character rounded a corner onto a different wall, which
/// counts as losing this one.
pub fn is_next_to_wall(
    geometry: &impl GeometryProbe,
    position: Vec3,
    right: Vec3,
    direction: Vec3,
    side: WallRunSide,
    vertical_tolerance: f32,
) -> bool {
    let helper = match side {
        WallRunSide::Left => Vec3::Y,
        WallRunSide::Right => Vec3::NEG_Y,
    };

    let start = position + direction * WALL_PROBE_INSET;
    let end = start + direction.cross(helper) * WALL_PROBE_REACH;

    let hit = if vertical_tolerance > f32::EPSILON {
        let lift = Vec3::Y * (vertical_tolerance / 2.0);
        geometry
            .cast_ray(start + lift, end + lift)
            .or_else(|| geometry.cast_ray(start - lift, end - lift))
    } else {
        geometry.cast_ray(start, end)
    };

    let Some(hit) = hit else {
        return false;
    };

    // Still on the expected side of the wall?
    let (_, new_side) = wall_run_direction_and_side(hit.normal, right);
    new_side == side
}
