//! Rigid body integration and derived-state passes.

use glam::Vec3;
use hecs::World;

use crate::ecs::components::physics::{BoxCollider, RigidBody, WorldObb};
use crate::ecs::components::transform::Transform;
use crate::geometry::Obb;

/// Semi-implicit Euler step for every non-static body: gravity into the
/// force accumulator, `a = accel + F/m`, `v += a·dt`, linear drag
/// `v *= (1 - dt·0.5)`, `x += v·dt`, then clear forces.
pub fn integrate(world: &mut World, gravity: Vec3, dt: f32) {
    for (_, (rb, transform)) in world.query_mut::<(&mut RigidBody, &mut Transform)>() {
        if rb.is_static {
            continue;
        }

        if rb.use_gravity {
            rb.add_force(gravity * rb.mass);
        }

        let acc = rb.acceleration + rb.force / rb.effective_mass();
        rb.velocity += acc * dt;
        rb.velocity *= 1.0 - dt * 0.5;
        transform.position += rb.velocity * dt;

        rb.clear_forces();
    }
}

/// Recompute the cached world OBB of every registered collider from its
/// current transform.
pub fn refresh_world_obbs(world: &mut World) {
    for (_, (transform, collider, world_obb)) in
        world.query_mut::<(&Transform, &BoxCollider, &mut WorldObb)>()
    {
        world_obb.0 = world_obb_for(transform, collider);
    }
}

/// Derive a world OBB from a transform and its local collider bounds.
pub fn world_obb_for(transform: &Transform, collider: &BoxCollider) -> Obb {
    let rot = transform.rotation_matrix();
    let axes = [
        rot.x_axis.truncate(),
        rot.y_axis.truncate(),
        rot.z_axis.truncate(),
    ];

    let scaled_extent = collider.0.half_extents() * transform.scale;
    let rotated_offset = rot.transform_point3(collider.0.center() * transform.scale);

    Obb::new(transform.position + rotated_offset, axes, scaled_extent)
}
