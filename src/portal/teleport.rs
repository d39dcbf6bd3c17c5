//! Object remapping between linked portal spaces.

use glam::{Mat4, Vec3};
use hecs::{Entity, World};

use crate::ecs::components::gameplay::ObjectFlags;
use crate::ecs::components::physics::{CollisionMask, RigidBody};
use crate::ecs::components::transform::Transform;
use crate::player::camera::Camera;
use crate::player::Player;

/// Push along the destination forward after transit, far enough to clear the
/// destination's own teleport trigger so the object does not bounce back.
pub const EXIT_PUSH: f32 = 0.5;

/// Base roll-recovery duration for a full 180-degree roll.
const ROLL_RECOVERY_FULL: f32 = 0.8;
/// Shortest roll-recovery duration.
const ROLL_RECOVERY_MIN: f32 = 0.2;

/// Rotation carrying source-portal directions into destination-portal
/// directions, including the 180-degree yaw flip: linked portals face each
/// other, not the same way.
pub fn portal_rotation(src: &Transform, dst: &Transform) -> Mat4 {
    dst.rotation_matrix()
        * Mat4::from_rotation_y(std::f32::consts::PI)
        * src.rotation_matrix().inverse()
}

/// Full point transform from the source portal's frame into the destination
/// portal's world frame.
pub fn portal_transform(src: &Transform, dst: &Transform) -> Mat4 {
    dst.isometry_matrix()
        * Mat4::from_rotation_y(std::f32::consts::PI)
        * src.isometry_matrix().inverse()
}

/// Destination-space position, pushed slightly out of the destination
/// surface.
pub fn remap_position(src: &Transform, dst: &Transform, position: Vec3) -> Vec3 {
    let through = portal_transform(src, dst).transform_point3(position);
    through + dst.forward() * EXIT_PUSH
}

/// Velocities remap as directions: rotation only, no translation.
pub fn remap_direction(src: &Transform, dst: &Transform, direction: Vec3) -> Vec3 {
    portal_rotation(src, dst).transform_vector3(direction)
}

/// Carry the camera basis through the portal rotation, re-derive yaw and
/// pitch from the new front vector, and return the residual roll in degrees
/// (the angle from the re-derived right vector to the transformed one, about
/// the front axis). The caller animates that roll back to zero.
pub fn remap_camera(src: &Transform, dst: &Transform, camera: &mut Camera) -> f32 {
    let rotation = portal_rotation(src, dst);
    let front = rotation.transform_vector3(camera.front).normalize();
    let right = rotation.transform_vector3(camera.right).normalize();

    camera.pitch = front.y.asin().to_degrees();
    camera.yaw = front.z.atan2(front.x).to_degrees();
    camera.roll = 0.0;
    camera.update_vectors();

    let naive_right = camera.right;
    let cos = naive_right.dot(right).clamp(-1.0, 1.0);
    let sin = naive_right.cross(right).dot(front);
    let roll = sin.atan2(cos).to_degrees();

    camera.roll = roll;
    camera.update_vectors();
    roll
}

/// Teleport one entity from the source portal's space into the
/// destination's. Position, velocity, and (for the player) the camera basis
/// are remapped; non-teleportable entities are ignored.
pub fn teleport_entity(world: &mut World, src: Entity, dst: Entity, entity: Entity) {
    let (Some(src_t), Some(dst_t)) = (transform_of(world, src), transform_of(world, dst)) else {
        return;
    };

    let is_player = world.get::<&Player>(entity).is_ok();
    let teleportable = is_player
        || world
            .get::<&ObjectFlags>(entity)
            .map(|flags| flags.teleportable)
            .unwrap_or(false);
    if !teleportable {
        return;
    }

    let Some(position) = transform_of(world, entity).map(|t| t.position) else {
        return;
    };
    let new_position = remap_position(&src_t, &dst_t, position);
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position = new_position;
    }

    if let Ok(mut rb) = world.get::<&mut RigidBody>(entity) {
        rb.velocity = remap_direction(&src_t, &dst_t, rb.velocity);
    }

    if is_player {
        let velocity = world.get::<&Player>(entity).map(|p| p.velocity).unwrap_or(Vec3::ZERO);
        let remapped = remap_direction(&src_t, &dst_t, velocity);

        let roll = match world.get::<&mut Camera>(entity) {
            Ok(mut camera) => remap_camera(&src_t, &dst_t, &mut camera),
            Err(_) => 0.0,
        };

        if let Ok(mut player) = world.get::<&mut Player>(entity) {
            player.velocity = remapped;
            // Landing inside the destination's near zone by construction;
            // keep the transit mask until the near trigger hands it back.
            player.collision_mask = CollisionMask::NEAR_PORTAL;
            player.initial_roll = roll;
            player.roll_recovery_duration =
                (ROLL_RECOVERY_FULL * roll.abs() / 180.0).max(ROLL_RECOVERY_MIN);
            player.roll_recovery_timer = player.roll_recovery_duration;
        }
    }

    tracing::debug!(?entity, ?new_position, "teleported");
}

fn transform_of(world: &World, entity: Entity) -> Option<Transform> {
    world.get::<&Transform>(entity).map(|t| *t).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facing_pair() -> (Transform, Transform) {
        // A on the back wall facing +Z, B on the left wall facing +X.
        let a = Transform::new(Vec3::new(0.0, 1.0, -9.8), Vec3::ZERO, Vec3::ONE);
        let b = Transform::new(
            Vec3::new(-9.8, 1.0, 0.0),
            Vec3::new(0.0, 90.0, 0.0),
            Vec3::ONE,
        );
        (a, b)
    }

    #[test]
    fn test_velocity_flips_through_facing_portals() {
        // Same-facing portals: an object flying into A (along -Z) leaves B
        // along +Z, out of B's face.
        let a = Transform::from_position(Vec3::ZERO);
        let b = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));

        let v = remap_direction(&a, &b, Vec3::new(0.0, -1.0, -3.0));
        assert!((v - Vec3::new(0.0, -1.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn test_round_trip_restores_position_and_velocity() {
        let (a, b) = facing_pair();

        let position = Vec3::new(0.2, 1.3, -9.5);
        let velocity = Vec3::new(0.5, -0.2, -4.0);

        let through_position = remap_position(&a, &b, position);
        let through_velocity = remap_direction(&a, &b, velocity);

        let back_position = remap_position(&b, &a, through_position);
        let back_velocity = remap_direction(&b, &a, through_velocity);

        // The exit pushes cancel: the forward push out of B maps onto the
        // inverse of the push out of A.
        assert!((back_position - position).length() < 1e-3);
        assert!((back_velocity - velocity).length() < 1e-3);
    }

    #[test]
    fn test_player_teleport_remaps_state() {
        let mut world = World::new();
        let src = world.spawn((Transform::from_position(Vec3::ZERO),));
        let dst = world.spawn((Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),));

        let mut player = Player::new();
        player.velocity = Vec3::new(0.0, 0.0, -2.0);
        let entity = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, 0.5)),
            player,
            Camera::new(Vec3::new(0.0, 0.8, 0.5)),
        ));

        teleport_entity(&mut world, src, dst, entity);

        let transform = world.get::<&Transform>(entity).unwrap();
        // Source-local (0,0,0.5) flips to (0,0,-0.5) behind the destination,
        // then the exit push carries it forward along +Z.
        assert!((transform.position - Vec3::new(10.0, 0.0, -0.5 + EXIT_PUSH)).length() < 1e-4);

        let player = world.get::<&Player>(entity).unwrap();
        assert!((player.velocity - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-4);
        assert_eq!(player.collision_mask, CollisionMask::NEAR_PORTAL);
    }

    #[test]
    fn test_non_teleportable_entity_ignored() {
        let mut world = World::new();
        let src = world.spawn((Transform::from_position(Vec3::ZERO),));
        let dst = world.spawn((Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),));

        let entity = world.spawn((Transform::from_position(Vec3::ZERO), ObjectFlags::default()));
        teleport_entity(&mut world, src, dst, entity);

        let transform = world.get::<&Transform>(entity).unwrap();
        assert_eq!(transform.position, Vec3::ZERO);
    }

    #[test]
    fn test_camera_roll_zero_for_upright_wall_portals() {
        let (a, b) = facing_pair();
        let mut camera = Camera::new(Vec3::ZERO);
        // Looking straight into portal A.
        camera.yaw = -90.0;
        camera.update_vectors();

        let roll = remap_camera(&a, &b, &mut camera);
        // Wall-to-wall transit keeps the horizon level.
        assert!(roll.abs() < 1e-3);
        // The camera now looks out of B, along +X.
        assert!((camera.front - Vec3::X).length() < 1e-3);
    }
}
