//! Ray queries against the registered world OBBs.

use glam::Vec3;
use hecs::{Entity, World};

use crate::ecs::components::physics::WorldObb;
use crate::geometry::Obb;

/// A resolved ray intersection.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
    /// World-space entry point.
    pub point: Vec3,
    /// Normal of the struck box face.
    pub normal: Vec3,
    /// The entity that was hit.
    pub entity: Entity,
}

/// Slab test of a ray against one OBB, carried out in the box's own axis
/// frame. Returns the entry distance when the ray enters within
/// `max_distance`, starting strictly in front of the origin.
fn ray_obb(origin: Vec3, direction: Vec3, obb: &Obb, max_distance: f32) -> Option<f32> {
    let p = obb.center - origin;

    let mut tmin = 0.0f32;
    let mut tmax = max_distance;

    for i in 0..3 {
        let f = obb.axes[i].dot(direction);
        let e = obb.axes[i].dot(p);
        let r = obb.half_extents[i];

        if f.abs() > 1e-6 {
            let mut t1 = (e + r) / f;
            let mut t2 = (e - r) / f;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax || tmax < 0.0 {
                return None;
            }
        } else if -e - r > 0.0 || -e + r < 0.0 {
            // Ray parallel to this slab and outside it.
            return None;
        }
    }

    (tmin > 0.0).then_some(tmin)
}

/// Face normal at a point on the box surface: the local axis the point is
/// deepest along, signed toward the point's side.
fn face_normal(obb: &Obb, point: Vec3) -> Vec3 {
    let local = point - obb.center;
    let mut normal = obb.axes[0];
    let mut min_depth = f32::MAX;

    for i in 0..3 {
        let dist = local.dot(obb.axes[i]);
        let depth = obb.half_extents[i] - dist.abs();
        if depth < min_depth {
            min_depth = depth;
            normal = obb.axes[i] * dist.signum();
        }
    }
    normal
}

/// Cast a ray against every registered world OBB, returning the nearest hit
/// within `max_distance`. A zero-length direction yields no hit.
pub fn raycast(world: &World, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut best: Option<RayHit> = None;

    for (entity, world_obb) in world.query::<&WorldObb>().iter() {
        let limit = best.map_or(max_distance, |hit| hit.distance);
        if let Some(t) = ray_obb(origin, direction, &world_obb.0, limit) {
            let point = origin + direction * t;
            best = Some(RayHit {
                distance: t,
                point,
                normal: face_normal(&world_obb.0, point),
                entity,
            });
        }
    }

    best
}
