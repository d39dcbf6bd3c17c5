//! Kinematic character controller layered on the physics queries.
//!
//! The player opts out of the generic integration path: gravity is applied
//! manually so grounding can be detected before horizontal sliding. Each
//! tick resolves movement in two sub-steps, Y first and then X/Z, each one a
//! move-and-correct pass through the physics system's player query.

pub mod camera;

use glam::Vec3;
use hecs::{Entity, World};

use crate::ecs::components::gameplay::ObjectFlags;
use crate::ecs::components::physics::{CollisionMask, RigidBody};
use crate::ecs::components::transform::Transform;
use crate::geometry::Aabb;
use crate::input::InputSnapshot;
use crate::physics::PhysicsSystem;

use self::camera::Camera;

/// Movement and interaction tuning.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub move_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    /// Horizontal velocity blend rate while grounded.
    pub ground_accel: f32,
    /// Horizontal velocity blend rate while airborne.
    pub air_accel: f32,
    pub height: f32,
    pub radius: f32,
    pub grab_range: f32,
    /// Distance at which a carried object is dropped.
    pub grab_release_distance: f32,
    pub grab_spring: f32,
    pub grab_damping: f32,
    pub throw_force: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            jump_speed: 4.0,
            gravity: 9.8,
            terminal_velocity: 20.0,
            ground_accel: 10.0,
            air_accel: 2.0,
            height: 2.0,
            radius: 0.25,
            grab_range: 5.0,
            grab_release_distance: 3.0,
            grab_spring: 30.0,
            grab_damping: 5.0,
            throw_force: 10.0,
        }
    }
}

/// Player state component. Velocity lives here rather than in a `RigidBody`
/// so the generic integration pass never touches it.
#[derive(Debug, Clone)]
pub struct Player {
    pub velocity: Vec3,
    pub grounded: bool,
    pub grabbed: Option<Entity>,
    pub collision_mask: CollisionMask,
    pub collision_enabled: bool,
    pub roll_recovery_timer: f32,
    pub roll_recovery_duration: f32,
    pub initial_roll: f32,
    pub config: PlayerConfig,
}

impl Player {
    pub fn new() -> Self {
        Self {
            velocity: Vec3::ZERO,
            grounded: false,
            grabbed: None,
            collision_mask: CollisionMask::DEFAULT,
            collision_enabled: true,
            roll_recovery_timer: 0.0,
            roll_recovery_duration: 0.0,
            initial_roll: 0.0,
            config: PlayerConfig::default(),
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a player entity with its camera at eye height.
pub fn spawn_player(world: &mut World, position: Vec3) -> Entity {
    let player = Player::new();
    let eye = position + Vec3::Y * (player.config.height * 0.4);
    world.spawn((
        Transform::from_position(position),
        ObjectFlags {
            teleportable: true,
            can_open_portal: false,
        },
        player,
        Camera::new(eye),
    ))
}

/// Axis-aligned collision box around the player's center.
fn collider_box(position: Vec3, config: &PlayerConfig) -> Aabb {
    let half = Vec3::new(config.radius, config.height * 0.5, config.radius);
    Aabb::new(position - half, position + half)
}

/// Per-frame controller pass: manual gravity, vertical then horizontal
/// collide-and-correct, grab spring, camera sync, roll recovery.
pub fn update(world: &mut World, physics: &PhysicsSystem, entity: Entity, dt: f32) {
    let Ok((velocity, mask, enabled, config)) = world.get::<&mut Player>(entity).map(|mut p| {
        p.velocity.y -= p.config.gravity * dt;
        p.velocity.y = p.velocity.y.max(-p.config.terminal_velocity);
        (
            p.velocity,
            p.collision_mask,
            p.collision_enabled,
            p.config.clone(),
        )
    }) else {
        return;
    };

    let Some(mut position) = position_of(world, entity) else {
        return;
    };
    let displacement = velocity * dt;

    // Vertical sub-step first: grounding must be decided before horizontal
    // sliding can consume the correction.
    position.y += displacement.y;
    if enabled {
        match physics.check_player_collision(world, &collider_box(position, &config), mask) {
            Some(correction) => {
                position += correction;
                if let Ok(mut player) = world.get::<&mut Player>(entity) {
                    if player.velocity.y < 0.0 && correction.y > 0.0 {
                        player.grounded = true;
                        player.velocity.y = 0.0;
                    } else if player.velocity.y > 0.0 && correction.y < 0.0 {
                        player.velocity.y = 0.0;
                    }
                }
            }
            None => {
                if let Ok(mut player) = world.get::<&mut Player>(entity) {
                    player.grounded = false;
                }
            }
        }
    }

    // Horizontal sub-step: sliding along walls keeps perpendicular velocity.
    position.x += displacement.x;
    position.z += displacement.z;
    if enabled {
        if let Some(correction) =
            physics.check_player_collision(world, &collider_box(position, &config), mask)
        {
            position += correction;
        }
    }

    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position = position;
    }

    follow_grabbed(world, entity, position);

    // Camera rides at eye height; roll decays back to zero after a teleport.
    let roll = world.get::<&mut Player>(entity).ok().and_then(|mut player| {
        if player.roll_recovery_timer > 0.0 {
            player.roll_recovery_timer = (player.roll_recovery_timer - dt).max(0.0);
            let t = player.roll_recovery_timer / player.roll_recovery_duration;
            Some(player.initial_roll * t)
        } else {
            None
        }
    });
    if let Ok(mut cam) = world.get::<&mut Camera>(entity) {
        cam.position = position + Vec3::Y * (config.height * 0.4);
        if let Some(roll) = roll {
            cam.roll = roll;
            cam.update_vectors();
        }
    }
}

/// Spring-damper carry: pull the grabbed object toward a hold point in front
/// of the camera, dropping it if it strays too far.
fn follow_grabbed(world: &mut World, entity: Entity, position: Vec3) {
    let Ok((grabbed, config)) = world
        .get::<&Player>(entity)
        .map(|p| (p.grabbed, p.config.clone()))
    else {
        return;
    };
    let Some(object) = grabbed else { return };

    let Some(front) = world.get::<&Camera>(entity).map(|c| c.front).ok() else {
        return;
    };
    let target = position + front * 2.0 + Vec3::Y * (config.height * 0.5);

    let Some(object_position) = position_of(world, object) else {
        release(world, entity);
        return;
    };

    if (target - object_position).length() > config.grab_release_distance {
        release(world, entity);
        return;
    }

    if let Ok(mut rb) = world.get::<&mut RigidBody>(object) {
        let spring = (target - object_position) * config.grab_spring;
        let damping = -rb.velocity * config.grab_damping;
        rb.add_force(spring + damping);
    }
}

/// Movement input: camera-relative target velocity blended in by the
/// grounded/airborne acceleration, plus jump.
pub fn process_movement(world: &mut World, entity: Entity, input: &InputSnapshot, dt: f32) {
    let Some((front, right)) = world
        .get::<&Camera>(entity)
        .map(|c| (c.front, c.right))
        .ok()
    else {
        return;
    };

    let mut forward = Vec3::new(front.x, 0.0, front.z);
    forward = forward.normalize_or_zero();
    let mut sideways = Vec3::new(right.x, 0.0, right.z);
    sideways = sideways.normalize_or_zero();

    let mut wish = Vec3::ZERO;
    if input.move_forward {
        wish += forward;
    }
    if input.move_backward {
        wish -= forward;
    }
    if input.move_right {
        wish += sideways;
    }
    if input.move_left {
        wish -= sideways;
    }

    if let Ok(mut player) = world.get::<&mut Player>(entity) {
        let target = if wish.length_squared() > 0.0 {
            wish.normalize() * player.config.move_speed
        } else if !player.grounded {
            // No input mid-air: preserve momentum.
            Vec3::new(player.velocity.x, 0.0, player.velocity.z)
        } else {
            Vec3::ZERO
        };

        let accel = if player.grounded {
            player.config.ground_accel
        } else {
            player.config.air_accel
        };
        let t = accel * dt;
        player.velocity.x += (target.x - player.velocity.x) * t;
        player.velocity.z += (target.z - player.velocity.z) * t;

        if input.jump_pressed && player.grounded {
            player.velocity.y = player.config.jump_speed;
            player.grounded = false;
        }
    }
}

/// Toggle grabbing: release when holding, otherwise raycast for a
/// teleportable object in front of the camera.
pub fn toggle_grab(world: &mut World, physics: &PhysicsSystem, entity: Entity) {
    let Ok((grabbed, range)) = world
        .get::<&Player>(entity)
        .map(|p| (p.grabbed, p.config.grab_range))
    else {
        return;
    };

    if grabbed.is_some() {
        release(world, entity);
        return;
    }

    let Some((origin, front)) = world
        .get::<&Camera>(entity)
        .map(|c| (c.position, c.front))
        .ok()
    else {
        return;
    };

    if let Some(hit) = physics.raycast(world, origin, front, range) {
        let carryable = world
            .get::<&ObjectFlags>(hit.entity)
            .map(|flags| flags.teleportable)
            .unwrap_or(false);
        if carryable {
            if let Ok(mut player) = world.get::<&mut Player>(entity) {
                player.grabbed = Some(hit.entity);
            }
            tracing::debug!(object = ?hit.entity, "grabbed");
        }
    }
}

/// Shove the carried object along the camera front and let go.
pub fn throw_grabbed(world: &mut World, entity: Entity) {
    let Ok(grabbed) = world.get::<&Player>(entity).map(|p| p.grabbed) else {
        return;
    };
    let Some(object) = grabbed else { return };

    let (front, force) = {
        let Ok(camera) = world.get::<&Camera>(entity) else {
            return;
        };
        let Ok(player) = world.get::<&Player>(entity) else {
            return;
        };
        (camera.front, player.config.throw_force)
    };

    if let Ok(mut rb) = world.get::<&mut RigidBody>(object) {
        rb.add_force(front * force);
    }
    release(world, entity);
}

fn release(world: &mut World, entity: Entity) {
    if let Ok(mut player) = world.get::<&mut Player>(entity) {
        player.grabbed = None;
    }
}

fn position_of(world: &World, entity: Entity) -> Option<Vec3> {
    world.get::<&Transform>(entity).map(|t| t.position).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::RigidBody;

    fn world_with_floor() -> (World, PhysicsSystem) {
        let mut world = World::new();
        let physics = PhysicsSystem::default();

        let floor = world.spawn((Transform::new(
            Vec3::new(0.0, -2.0, 0.0),
            Vec3::ZERO,
            Vec3::new(10.0, 0.1, 10.0),
        ),));
        physics
            .register(
                &mut world,
                floor,
                RigidBody::new_static(),
                Aabb::from_half_extents(Vec3::splat(0.5)),
            )
            .unwrap();
        (world, physics)
    }

    #[test]
    fn test_player_settles_on_floor() {
        let (mut world, physics) = world_with_floor();
        let player = spawn_player(&mut world, Vec3::ZERO);

        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            physics.update(&mut world, dt);
            update(&mut world, &physics, player, dt);
        }

        let state = world.get::<&Player>(player).unwrap();
        assert!(state.grounded);
        assert!(state.velocity.y.abs() < 1e-3);

        // Floor top at -1.95, player half height 1.0.
        let transform = world.get::<&Transform>(player).unwrap();
        assert!((transform.position.y + 0.95).abs() < 0.05);
    }

    #[test]
    fn test_jump_only_when_grounded() {
        let (mut world, physics) = world_with_floor();
        let player = spawn_player(&mut world, Vec3::ZERO);

        let input = InputSnapshot {
            jump_pressed: true,
            ..Default::default()
        };
        // Airborne: the jump is refused.
        process_movement(&mut world, player, &input, 1.0 / 60.0);
        assert!(world.get::<&Player>(player).unwrap().velocity.y <= 0.0);

        for _ in 0..120 {
            physics.update(&mut world, 1.0 / 60.0);
            update(&mut world, &physics, player, 1.0 / 60.0);
        }
        process_movement(&mut world, player, &input, 1.0 / 60.0);
        let state = world.get::<&Player>(player).unwrap();
        assert!((state.velocity.y - state.config.jump_speed).abs() < 1e-5);
    }

    #[test]
    fn test_grab_spring_and_distance_release() {
        let (mut world, physics) = world_with_floor();
        let player = spawn_player(&mut world, Vec3::ZERO);

        let mut body = RigidBody::new_dynamic(1.0);
        body.use_gravity = false;
        let cube = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.8, -2.0)),
            ObjectFlags::teleportable(),
        ));
        physics
            .register(
                &mut world,
                cube,
                body,
                Aabb::from_half_extents(Vec3::splat(0.25)),
            )
            .unwrap();
        physics.update(&mut world, 0.0);

        // The default camera looks along -Z, straight at the cube.
        toggle_grab(&mut world, &physics, player);
        assert_eq!(world.get::<&Player>(player).unwrap().grabbed, Some(cube));

        // The spring pulls the cube toward the hold point.
        update(&mut world, &physics, player, 1.0 / 60.0);
        let force = world.get::<&RigidBody>(cube).unwrap().force;
        assert!(force.length() > 0.0);

        // Yank the cube out of range: the carry releases itself.
        world.get::<&mut Transform>(cube).unwrap().position = Vec3::new(20.0, 0.0, 0.0);
        update(&mut world, &physics, player, 1.0 / 60.0);
        assert_eq!(world.get::<&Player>(player).unwrap().grabbed, None);
    }

    #[test]
    fn test_roll_recovery_decays_to_zero() {
        let mut world = World::new();
        let player = spawn_player(&mut world, Vec3::ZERO);
        let physics = PhysicsSystem::default();

        {
            let mut state = world.get::<&mut Player>(player).unwrap();
            state.initial_roll = 90.0;
            state.roll_recovery_duration = 0.4;
            state.roll_recovery_timer = 0.4;
            state.collision_enabled = false;
        }

        update(&mut world, &physics, player, 0.1);
        let mid_roll = world.get::<&Camera>(player).unwrap().roll;
        assert!(mid_roll > 0.0 && mid_roll < 90.0);

        for _ in 0..10 {
            update(&mut world, &physics, player, 0.1);
        }
        assert!(world.get::<&Camera>(player).unwrap().roll.abs() < 1e-4);
    }
}
