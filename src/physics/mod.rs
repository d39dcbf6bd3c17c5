//! Rigid-body physics over oriented bounding boxes.
//!
//! # Pipeline
//!
//! Each `update` call runs, in order:
//!
//! 1. Semi-implicit Euler integration of every non-static body
//! 2. Refresh of every registered world OBB from its transform
//! 3. Pairwise collision detection (15-axis SAT) and resolution
//!
//! Registration means carrying the (`RigidBody`, `BoxCollider`, `WorldObb`)
//! components; removal by entity id is O(1).

pub mod narrowphase;
pub mod raycast;
pub mod rigid_body;

use glam::Vec3;
use hecs::{Entity, World};

use crate::ecs::components::physics::{BoxCollider, CollisionMask, RigidBody, WorldObb};
use crate::ecs::components::transform::Transform;
use crate::geometry::{Aabb, Obb};

use self::narrowphase::sat_obb_obb;
use self::raycast::RayHit;

/// Speed below which a body in resting contact is zeroed to stop
/// micro-bouncing.
const RESTING_SPEED: f32 = 0.5;
/// Approach speed below which resting-contact zeroing applies.
const RESTING_APPROACH: f32 = 1.0;
/// Horizontal force applied to dynamic bodies the player stands against.
const PLAYER_PUSH_FORCE: f32 = 10.0;

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// The physics system. Owns no bodies itself; it operates on the registered
/// components of a `hecs::World`.
#[derive(Debug, Default)]
pub struct PhysicsSystem {
    config: PhysicsConfig,
}

impl PhysicsSystem {
    /// Create a new physics system with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    /// Replace the gravity vector.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    /// Register an entity for simulation by attaching a rigid body and a
    /// local collider. The world OBB cache is derived immediately so queries
    /// made before the first `update` already see the body.
    pub fn register(
        &self,
        world: &mut World,
        entity: Entity,
        body: RigidBody,
        bounds: Aabb,
    ) -> anyhow::Result<()> {
        let transform = *world.get::<&Transform>(entity)?;
        let collider = BoxCollider(bounds);
        let obb = rigid_body::world_obb_for(&transform, &collider);
        world.insert(entity, (body, collider, WorldObb(obb)))?;
        tracing::debug!(?entity, "registered physics body");
        Ok(())
    }

    /// Remove an entity from simulation. Unregistered entities are left
    /// untouched.
    pub fn unregister(&self, world: &mut World, entity: Entity) {
        if world
            .remove::<(RigidBody, BoxCollider, WorldObb)>(entity)
            .is_ok()
        {
            tracing::debug!(?entity, "unregistered physics body");
        }
    }

    /// Step the simulation: integrate, refresh OBBs, resolve collisions.
    pub fn update(&self, world: &mut World, dt: f32) {
        rigid_body::integrate(world, self.config.gravity, dt);
        rigid_body::refresh_world_obbs(world);
        self.check_collisions(world);
    }

    /// Cast a ray against every registered body.
    pub fn raycast(
        &self,
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayHit> {
        raycast::raycast(world, origin, direction, max_distance)
    }

    fn check_collisions(&self, world: &mut World) {
        let entities: Vec<Entity> = world
            .query::<(&RigidBody, &WorldObb)>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();

        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                let (entity_a, entity_b) = (entities[i], entities[j]);

                let Some((rb_a, obb_a)) = snapshot(world, entity_a) else {
                    continue;
                };
                let Some((rb_b, obb_b)) = snapshot(world, entity_b) else {
                    continue;
                };

                if !rb_a.collision_enabled || !rb_b.collision_enabled {
                    continue;
                }
                if rb_a.is_static && rb_b.is_static {
                    continue;
                }
                if !rb_a.collision_mask.collides_with(rb_b.collision_mask) {
                    continue;
                }

                if let Some(contact) = sat_obb_obb(&obb_a, &obb_b) {
                    resolve_collision(
                        world,
                        entity_a,
                        entity_b,
                        &rb_a,
                        &rb_b,
                        contact.normal,
                        contact.penetration,
                    );
                }
            }
        }
    }

    /// Character-controller query: SAT-test an axis-aligned player box
    /// against every mask-compatible body, summing the correction vectors of
    /// all overlaps. Dynamic bodies the player presses into receive a small
    /// horizontal push away from the player as a side effect.
    ///
    /// The summed (uncapped) correction can overshoot at multi-collider
    /// seams.
    pub fn check_player_collision(
        &self,
        world: &mut World,
        player_box: &Aabb,
        player_mask: CollisionMask,
    ) -> Option<Vec3> {
        let player_obb = Obb::axis_aligned(player_box.center(), player_box.half_extents());

        let entities: Vec<Entity> = world
            .query::<(&RigidBody, &WorldObb)>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();

        let mut correction = Vec3::ZERO;
        let mut collided = false;

        for entity in entities {
            let Some((rb, obb)) = snapshot(world, entity) else {
                continue;
            };
            if !rb.collision_mask.collides_with(player_mask) {
                continue;
            }

            if let Some(contact) = sat_obb_obb(&player_obb, &obb) {
                // The normal points from the obstacle toward the player.
                correction += contact.normal * contact.penetration;
                collided = true;

                if !rb.is_static {
                    let mut push = -contact.normal * PLAYER_PUSH_FORCE;
                    push.y = 0.0;
                    if let Ok(mut body) = world.get::<&mut RigidBody>(entity) {
                        body.add_force(push);
                    }
                }
            }
        }

        collided.then_some(correction)
    }
}

fn snapshot(world: &World, entity: Entity) -> Option<(RigidBody, Obb)> {
    let rb = (*world.get::<&RigidBody>(entity).ok()?).clone();
    let obb = world.get::<&WorldObb>(entity).ok()?.0;
    Some((rb, obb))
}

fn shift_position(world: &World, entity: Entity, delta: Vec3) {
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position += delta;
    }
}

/// Positional correction plus impulse response. The normal points from B
/// toward A. Two dynamic bodies split the correction and exchange an impulse
/// weighted by inverse mass with the lesser restitution; against a static
/// body the dynamic side takes the full correction and reflects with the
/// greater restitution.
fn resolve_collision(
    world: &mut World,
    entity_a: Entity,
    entity_b: Entity,
    rb_a: &RigidBody,
    rb_b: &RigidBody,
    normal: Vec3,
    penetration: f32,
) {
    if !rb_a.is_static && !rb_b.is_static {
        shift_position(world, entity_a, normal * penetration * 0.5);
        shift_position(world, entity_b, -normal * penetration * 0.5);

        let v_rel = rb_a.velocity - rb_b.velocity;
        let v_rel_normal = v_rel.dot(normal);
        if v_rel_normal > 0.0 {
            return;
        }

        let e = rb_a.restitution.min(rb_b.restitution);
        let (mass_a, mass_b) = (rb_a.effective_mass(), rb_b.effective_mass());
        let j = -(1.0 + e) * v_rel_normal / (1.0 / mass_a + 1.0 / mass_b);
        let impulse = normal * j;

        if let Ok(mut rb) = world.get::<&mut RigidBody>(entity_a) {
            rb.velocity += impulse / mass_a;
        }
        if let Ok(mut rb) = world.get::<&mut RigidBody>(entity_b) {
            rb.velocity -= impulse / mass_b;
        }
    } else if !rb_a.is_static {
        shift_position(world, entity_a, normal * penetration);

        let v_rel_normal = rb_a.velocity.dot(normal);
        if v_rel_normal > 0.0 {
            return;
        }

        let e = rb_a.restitution.max(rb_b.restitution);
        let vn = normal * v_rel_normal;
        let vt = rb_a.velocity - vn;
        let mut velocity = vt - vn * e;

        if velocity.length() < RESTING_SPEED && v_rel_normal.abs() < RESTING_APPROACH {
            velocity = Vec3::ZERO;
        }
        if let Ok(mut rb) = world.get::<&mut RigidBody>(entity_a) {
            rb.velocity = velocity;
        }
    } else if !rb_b.is_static {
        shift_position(world, entity_b, -normal * penetration);

        // The normal points toward A, so B approaches when moving along it.
        let v_rel_normal = (-rb_b.velocity).dot(normal);
        if v_rel_normal > 0.0 {
            return;
        }

        let e = rb_a.restitution.max(rb_b.restitution);
        let vn = normal * rb_b.velocity.dot(normal);
        let vt = rb_b.velocity - vn;
        let mut velocity = vt - vn * e;

        if velocity.length() < RESTING_SPEED && v_rel_normal.abs() < RESTING_APPROACH {
            velocity = Vec3::ZERO;
        }
        if let Ok(mut rb) = world.get::<&mut RigidBody>(entity_b) {
            rb.velocity = velocity;
        }
    }
}
