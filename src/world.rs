use bevy::prelude::*;

use crate::movement::physics::{MoveOutcome, SafeMove};
use crate::movement::wall_probe::{GeometryProbe, RayHit};

// Capsule-ish bounds used when sweeping movement against blocks
pub const CHARACTER_RADIUS: f32 = 20.0;
pub const CHARACTER_HALF_HEIGHT: f32 = 90.0;

// How far below the character's center counts as standing on ground
const GROUND_PROBE_DISTANCE: f32 = CHARACTER_HALF_HEIGHT + 4.0;
const WALKABLE_NORMAL_Y: f32 = 0.7;

// Gap left between the character and any surface it slides along
const CONTACT_SKIN: f32 = 0.1;

/// Axis-aligned block of solid world geometry.
#[derive(Clone, Copy, Debug)]
pub struct Block {
    pub min: Vec3,
    pub max: Vec3,
}

impl Block {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The block grown by the character's bounds, for swept movement.
    fn expanded(&self) -> Block {
        let pad = Vec3::new(CHARACTER_RADIUS, CHARACTER_HALF_HEIGHT, CHARACTER_RADIUS);
        Block::new(self.min - pad, self.max + pad)
    }

    /// First intersection of the segment with this block, as a fraction of
    /// the segment plus the struck face's outward normal. Segments starting
    /// inside the block report nothing.
    fn raycast(&self, start: Vec3, end: Vec3) -> Option<(f32, Vec3)> {
        let direction = end - start;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let d = direction[axis];
            let s = start[axis];

            if d.abs() < 1e-8 {
                if s < self.min[axis] || s > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - s) * inv;
            let mut t1 = (self.max[axis] - s) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            if t0 > t_enter {
                t_enter = t0;
                // Entering against the direction of travel on this axis
                normal = -axis_unit(axis) * d.signum();
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        if normal == Vec3::ZERO {
            // The segment began inside the block
            return None;
        }

        Some((t_enter, normal))
    }

    /// Push an overlapping character center out through the nearest face.
    fn depenetrate(&self, center: Vec3) -> Option<Vec3> {
        let grown = self.expanded();
        if center.x <= grown.min.x
            || center.x >= grown.max.x
            || center.y <= grown.min.y
            || center.y >= grown.max.y
            || center.z <= grown.min.z
            || center.z >= grown.max.z
        {
            return None;
        }

        let mut best_push = f32::INFINITY;
        let mut push = Vec3::ZERO;
        for axis in 0..3 {
            let to_min = center[axis] - grown.min[axis];
            let to_max = grown.max[axis] - center[axis];
            if to_min < best_push {
                best_push = to_min;
                push = -axis_unit(axis) * (to_min + CONTACT_SKIN);
            }
            if to_max < best_push {
                best_push = to_max;
                push = axis_unit(axis) * (to_max + CONTACT_SKIN);
            }
        }

        Some(push)
    }
}

fn axis_unit(axis: usize) -> Vec3 {
    match axis {
        0 => Vec3::X,
        1 => Vec3::Y,
        _ => Vec3::Z,
    }
}

/// The static level: a floor slab and a handful of free-standing walls.
///
/// Both binaries build the same arena, so ray probes and slide resolution
/// agree between prediction and the authoritative simulation.
#[derive(Resource, Clone)]
pub struct Arena {
    pub blocks: Vec<Block>,
}

impl Arena {
    /// The demo courtyard: a floor, two long run walls, and a far wall.
    pub fn courtyard() -> Self {
        Self {
            blocks: vec![
                // Floor
                Block::new(Vec3::new(-2000.0, -100.0, -2000.0), Vec3::new(2000.0, 0.0, 2000.0)),
                // Run wall on the +X side of the lane
                Block::new(Vec3::new(300.0, 0.0, -1500.0), Vec3::new(400.0, 600.0, 1500.0)),
                // Run wall on the -X side of the lane
                Block::new(Vec3::new(-400.0, 0.0, -1500.0), Vec3::new(-300.0, 600.0, 1500.0)),
                // Far wall closing the lane
                Block::new(Vec3::new(-400.0, 0.0, -1600.0), Vec3::new(400.0, 600.0, -1500.0)),
            ],
        }
    }

    /// Earliest swept contact for the character moving from `start` to
    /// `end`, against block bounds grown by the character size.
    fn sweep(&self, start: Vec3, end: Vec3) -> Option<(f32, Vec3)> {
        let mut best: Option<(f32, Vec3)> = None;

        for block in &self.blocks {
            if let Some((t, normal)) = block.expanded().raycast(start, end) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, normal));
                }
            }
        }

        best
    }
}

impl GeometryProbe for Arena {
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        let mut best: Option<(f32, Vec3)> = None;

        for block in &self.blocks {
            if let Some((t, normal)) = block.raycast(start, end) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, normal));
                }
            }
        }

        best.map(|(t, normal)| RayHit {
            point: start + (end - start) * t,
            normal,
        })
    }
}

impl SafeMove for Arena {
    fn move_and_slide(&self, position: Vec3, displacement: Vec3) -> MoveOutcome {
        let mut current = position;
        let mut remaining = displacement;
        let mut hit = None;

        // Advance to the first contact, then slide what is left along the
        // surface. Two slide iterations settle lane corners.
        for _ in 0..3 {
            if remaining.length_squared() < 1e-8 {
                break;
            }

            let end = current + remaining;
            let Some((t, normal)) = self.sweep(current, end) else {
                current = end;
                break;
            };

            current += remaining * t + normal * CONTACT_SKIN;
            let leftover = remaining * (1.0 - t);
            remaining = leftover - normal * leftover.dot(normal);

            // Floor contacts are landings, not wall hits
            if normal.y < WALKABLE_NORMAL_Y {
                hit = Some(RayHit { point: current, normal });
            }
        }

        // In case the move started overlapped (spawn, correction snap)
        for block in &self.blocks {
            if let Some(push) = block.depenetrate(current) {
                current += push;
            }
        }

        let grounded = self
            .cast_ray(current, current - Vec3::Y * GROUND_PROBE_DISTANCE)
            .is_some_and(|ground| ground.normal.y > WALKABLE_NORMAL_Y);

        MoveOutcome { position: current, hit, grounded }
    }
}
