use bevy::prelude::*;

use crate::movement::components::WallRunSide;
use crate::movement::constants::WALL_NORMAL_DOWN_LIMIT;

/// Classify a wall contact: which side of the character the wall is on and
/// the direction to run along it.
///
/// The side comes from the horizontal part of the surface normal against the
/// character's right vector. The run direction is the cross product of the
/// normal with a vertical helper whose sign depends on the side; the flip
/// keeps the direction pointing with the character's travel instead of
/// against it.
pub fn wall_run_direction_and_side(surface_normal: Vec3, right: Vec3) -> (Vec3, WallRunSide) {
    let normal_flat = Vec2::new(surface_normal.x, surface_normal.z);
    let right_flat = Vec2::new(right.x, right.z);

    let (side, helper) = if normal_flat.dot(right_flat) > 0.0 {
        (WallRunSide::Right, Vec3::NEG_Y)
    } else {
        (WallRunSide::Left, Vec3::Y)
    };

    (surface_normal.cross(helper), side)
}

/// True when a surface with this normal can be wall ran.
///
/// Downward-facing normals are rejected outright. Otherwise the wall's angle
/// from vertical is the angle between the full normal and its renormalized
/// horizontal projection; anything at or past the walkable floor angle is a
/// floor, not a wall.
pub fn surface_is_wall_runnable(surface_normal: Vec3, walkable_floor_angle: f32) -> bool {
    if surface_normal.y < WALL_NORMAL_DOWN_LIMIT {
        return false;
    }

    let normal_flat = Vec3::new(surface_normal.x, 0.0, surface_normal.z).normalize_or_zero();
    let wall_angle = normal_flat.dot(surface_normal).clamp(-1.0, 1.0).acos();

    wall_angle < walkable_floor_angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::constants::WALKABLE_FLOOR_ANGLE;

    #[test]
    fn test_classification_is_deterministic() {
        let normal = Vec3::new(0.9, 0.1, 0.0).normalize();
        let right = Vec3::Z;

        let first = wall_run_direction_and_side(normal, right);
        let second = wall_run_direction_and_side(normal, right);

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_side_follows_right_vector() {
        // Wall normal pointing +X; the character's right vector decides the side
        let normal = Vec3::X;

        let (_, side) = wall_run_direction_and_side(normal, Vec3::X);
        assert_eq!(side, WallRunSide::Right);

        let (_, side) = wall_run_direction_and_side(normal, Vec3::NEG_X);
        assert_eq!(side, WallRunSide::Left);
    }

    #[test]
    fn test_direction_is_parallel_to_wall() {
        for (normal, right) in [
            (Vec3::X, Vec3::Z),
            (Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Z, Vec3::X),
            (Vec3::new(0.9, 0.1, 0.0).normalize(), Vec3::Z),
        ] {
            let (direction, _) = wall_run_direction_and_side(normal, right);
            assert!(direction.dot(normal).abs() < 1e-6, "direction must hug the wall");
            assert!(direction.length() > 0.9);
        }
    }

    #[test]
    fn test_direction_points_with_travel_on_both_sides() {
        // Character facing and traveling -Z, so its right vector is +X.
        // Walls on either flank must both yield a forward-pointing direction.
        let travel = Vec3::NEG_Z;
        let right = Vec3::X;

        for normal in [
            Vec3::NEG_X,
            Vec3::X,
            Vec3::new(-0.8, 0.0, 0.3).normalize(),
            Vec3::new(0.8, 0.0, 0.3).normalize(),
            Vec3::new(-0.9, 0.1, -0.2).normalize(),
            Vec3::new(0.9, 0.1, -0.2).normalize(),
        ] {
            let (direction, side) = wall_run_direction_and_side(normal, right);
            let expected_side = if normal.x > 0.0 { WallRunSide::Right } else { WallRunSide::Left };
            assert_eq!(side, expected_side);
            assert!(
                direction.dot(travel) > 0.0,
                "direction {direction} should point with travel for normal {normal}"
            );
        }
    }

    #[test]
    fn test_vertical_wall_is_runnable() {
        assert!(surface_is_wall_runnable(Vec3::X, WALKABLE_FLOOR_ANGLE));
        assert!(surface_is_wall_runnable(Vec3::NEG_Z, WALKABLE_FLOOR_ANGLE));
    }

    #[test]
    fn test_shallow_lean_is_runnable() {
        // Angle from vertical is about 6.3 degrees, well below the limit
        let normal = Vec3::new(0.9, 0.1, 0.0).normalize();
        assert!(surface_is_wall_runnable(normal, WALKABLE_FLOOR_ANGLE));
    }

    #[test]
    fn test_angle_boundary_is_exclusive() {
        // Recompute the 45-degree wall's angle exactly as the check does,
        // then use it as the limit: equal angles must be rejected
        let normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let flat = Vec3::new(normal.x, 0.0, normal.z).normalize_or_zero();
        let wall_angle = flat.dot(normal).clamp(-1.0, 1.0).acos();

        assert!(!surface_is_wall_runnable(normal, wall_angle));
        assert!(surface_is_wall_runnable(normal, wall_angle + 1e-4));
    }

    #[test]
    fn test_angle_monotonicity() {
        let mut previous = true;
        for step in 0..90 {
            let angle = (step as f32).to_radians();
            let normal = Vec3::new(angle.cos(), angle.sin(), 0.0);
            let runnable = surface_is_wall_runnable(normal, WALKABLE_FLOOR_ANGLE);
            // Once a lean stops being runnable it never becomes runnable again
            assert!(previous || !runnable);
            previous = runnable;
        }
    }

    #[test]
    fn test_ceilings_are_rejected() {
        assert!(!surface_is_wall_runnable(Vec3::NEG_Y, WALKABLE_FLOOR_ANGLE));
        assert!(!surface_is_wall_runnable(Vec3::new(0.5, -0.5, 0.0).normalize(), WALKABLE_FLOOR_ANGLE));
    }

    #[test]
    fn test_floors_are_rejected() {
        assert!(!surface_is_wall_runnable(Vec3::Y, WALKABLE_FLOOR_ANGLE));
    }
}
