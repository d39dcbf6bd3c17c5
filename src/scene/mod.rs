//! Scene: owns the world, the systems, and the per-frame orchestration.
//!
//! # Frame order
//!
//! 1. Physics integrates forces and resolves collisions
//! 2. The player controller runs its own move-and-correct pass
//! 3. Object behaviors animate (buttons, flip walls)
//! 4. Triggers are evaluated against every object's updated position
//! 5. Gameplay reacts to trigger state (button → flip wall → portal drop)
//!
//! Portal view matrices are recomputed by the presentation layer from the
//! accessors in [`crate::portal`].

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use hecs::{Entity, World};
use thiserror::Error;

use crate::ecs::components::gameplay::{Button, FlipWall, ObjectFlags};
use crate::ecs::components::physics::{CollisionMask, RigidBody};
use crate::ecs::components::transform::Transform;
use crate::ecs::systems::gameplay;
use crate::geometry::Aabb;
use crate::input::InputSnapshot;
use crate::physics::PhysicsSystem;
use crate::player::{self, camera::Camera, Player};
use crate::portal::{self, Portal, PortalKind};
use crate::trigger::{Trigger, TriggerRegistry};

/// Delta times are clamped to this bound before use anywhere, so a debugger
/// pause or lag spike cannot blow up the integration.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Reach of the portal gun's aim raycast.
const PORTAL_RAYCAST_RANGE: f32 = 100.0;

/// Per-frame timing, passed explicitly into update calls.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub dt: f32,
}

impl FrameContext {
    /// Wrap a raw frame delta, clamping it to [`MAX_FRAME_DELTA`].
    pub fn new(dt: f32) -> Self {
        Self {
            dt: dt.clamp(0.0, MAX_FRAME_DELTA),
        }
    }
}

/// Errors from scene assembly. Simulation itself never errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("entity has no transform")]
    MissingTransform,
}

/// Parameters for registering an entity with the physics system.
#[derive(Debug, Clone)]
pub struct PhysicsBodyDesc {
    pub is_static: bool,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    pub collision_mask: CollisionMask,
    pub use_gravity: bool,
}

impl Default for PhysicsBodyDesc {
    fn default() -> Self {
        Self {
            is_static: false,
            mass: 1.0,
            restitution: 0.2,
            friction: 0.5,
            collision_mask: CollisionMask::DEFAULT,
            use_gravity: true,
        }
    }
}

impl PhysicsBodyDesc {
    /// Immovable level geometry.
    pub fn static_body() -> Self {
        Self {
            is_static: true,
            use_gravity: false,
            ..Self::default()
        }
    }
}

/// A running scene: the world and every system that mutates it.
pub struct Scene {
    pub world: World,
    pub physics: PhysicsSystem,
    pub triggers: TriggerRegistry,
    pub portal_a: Option<Entity>,
    pub portal_b: Option<Entity>,
    pub player: Option<Entity>,
    names: HashMap<String, Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            physics: PhysicsSystem::default(),
            triggers: TriggerRegistry::new(),
            portal_a: None,
            portal_b: None,
            player: None,
            names: HashMap::new(),
        }
    }

    /// Spawn a named object with a transform and gameplay flags.
    pub fn spawn_object(&mut self, name: &str, transform: Transform, flags: ObjectFlags) -> Entity {
        let entity = self.world.spawn((transform, flags));
        self.register_name(name, entity);
        entity
    }

    /// Bind a name to an entity. A duplicate name is logged and ignored.
    pub fn register_name(&mut self, name: &str, entity: Entity) {
        if self.names.contains_key(name) {
            tracing::warn!(name, "object name already registered, ignoring");
            return;
        }
        self.names.insert(name.to_owned(), entity);
    }

    /// Look up an entity by name.
    pub fn object(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    /// Register an entity with the physics system, attaching a rigid body
    /// built from `desc` and the given local collider bounds.
    pub fn add_physics(
        &mut self,
        entity: Entity,
        desc: PhysicsBodyDesc,
        bounds: Aabb,
    ) -> anyhow::Result<()> {
        if self.world.get::<&Transform>(entity).is_err() {
            return Err(SceneError::MissingTransform.into());
        }

        let mut body = if desc.is_static {
            RigidBody::new_static()
        } else {
            RigidBody::new_dynamic(desc.mass)
        };
        body.restitution = desc.restitution;
        body.friction = desc.friction;
        body.collision_mask = desc.collision_mask;
        body.use_gravity = desc.use_gravity && !desc.is_static;

        self.physics.register(&mut self.world, entity, body, bounds)
    }

    /// Spawn the linked portal pair. Both start unaimed.
    pub fn spawn_portal_pair(&mut self, half_extents: Vec2) -> (Entity, Entity) {
        let a = portal::spawn_portal(&mut self.world, PortalKind::A, half_extents);
        let b = portal::spawn_portal(&mut self.world, PortalKind::B, half_extents);
        portal::link_portals(&mut self.world, a, b);
        portal::init_portal(&mut self.world, &mut self.triggers, a);
        portal::init_portal(&mut self.world, &mut self.triggers, b);
        self.portal_a = Some(a);
        self.portal_b = Some(b);
        (a, b)
    }

    /// Spawn the player.
    pub fn spawn_player(&mut self, position: Vec3) -> Entity {
        let entity = player::spawn_player(&mut self.world, position);
        self.player = Some(entity);
        entity
    }

    /// Spawn a floor button with its overlap trigger. The trigger volume
    /// sits above the button's top surface; anything standing in it holds
    /// the button down.
    pub fn spawn_button(
        &mut self,
        name: &str,
        transform: Transform,
        bounds: Aabb,
        target: Option<Entity>,
    ) -> Entity {
        let mut button = Button::new(transform.position);
        button.target = target;

        let entity = self.world.spawn((transform, ObjectFlags::default(), button));
        self.register_name(name, entity);

        let min = bounds.min * transform.scale;
        let max = bounds.max * transform.scale;
        let mut half = (max - min) * 0.5;
        half.y = 1.0;
        let mut center = transform.position + (min + max) * 0.5;
        center.y = transform.position.y + max.y + half.y * 0.5;

        let trigger = Trigger::from_min_max(center - half, center + half)
            .on_enter(move |_, world| {
                if let Ok(mut b) = world.get::<&mut Button>(entity) {
                    b.objects_on += 1;
                }
            })
            .on_exit(move |_, world| {
                if let Ok(mut b) = world.get::<&mut Button>(entity) {
                    b.objects_on = (b.objects_on - 1).max(0);
                }
            });
        self.triggers.insert_named(name, trigger);

        entity
    }

    /// Advance the whole scene by one frame.
    pub fn update(&mut self, ctx: FrameContext) {
        let dt = ctx.dt;

        self.physics.update(&mut self.world, dt);

        if let Some(entity) = self.player {
            player::update(&mut self.world, &self.physics, entity, dt);
        }

        gameplay::update_buttons(&mut self.world, dt);
        gameplay::update_flip_walls(&mut self.world, dt);

        self.triggers.check_all(&mut self.world);

        gameplay::drive_button_targets(&mut self.world);
        self.update_portal_state();
    }

    /// Drop portals whose host surface started moving and keep the pair's
    /// trigger arming in sync with the activation invariant.
    fn update_portal_state(&mut self) {
        for entity in [self.portal_a, self.portal_b].into_iter().flatten() {
            let host_rotating = self
                .world
                .get::<&Portal>(entity)
                .ok()
                .and_then(|p| p.on_object)
                .and_then(|host| self.world.get::<&FlipWall>(host).map(|f| f.rotating).ok())
                .unwrap_or(false);

            if host_rotating {
                portal::deactivate_portal(&mut self.world, &mut self.triggers, entity);
            }
            portal::update_trigger_arming(&self.world, &mut self.triggers, entity);
        }
    }

    /// Apply one frame of input: look, movement, grab/throw, portal fire.
    pub fn process_input(&mut self, input: &InputSnapshot, ctx: FrameContext) {
        let Some(entity) = self.player else { return };

        if input.look_delta != (0.0, 0.0) {
            if let Ok(mut camera) = self.world.get::<&mut Camera>(entity) {
                camera.process_mouse(input.look_delta.0, input.look_delta.1);
            }
        }

        player::process_movement(&mut self.world, entity, input, ctx.dt);

        if input.grab_pressed {
            player::toggle_grab(&mut self.world, &self.physics, entity);
        }

        let grabbing = self
            .world
            .get::<&Player>(entity)
            .map(|p| p.grabbed.is_some())
            .unwrap_or(false);

        if input.fire_primary {
            if grabbing {
                player::throw_grabbed(&mut self.world, entity);
            } else {
                self.fire_portal(self.portal_a);
            }
        }
        if input.fire_secondary && !grabbing {
            self.fire_portal(self.portal_b);
        }
    }

    fn fire_portal(&mut self, portal: Option<Entity>) {
        let Some(portal) = portal else { return };
        let Some(player_entity) = self.player else { return };

        let Ok((origin, front, right)) = self
            .world
            .get::<&Camera>(player_entity)
            .map(|c| (c.position, c.front, c.right))
        else {
            return;
        };

        match self
            .physics
            .raycast(&self.world, origin, front, PORTAL_RAYCAST_RANGE)
        {
            Some(hit) => {
                portal::aim_portal(&mut self.world, &mut self.triggers, portal, &hit, right);
            }
            None => tracing::debug!(?portal, "portal shot hit nothing"),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds() -> Aabb {
        Aabb::from_half_extents(Vec3::splat(0.5))
    }

    /// Two portal-capable walls and a floor.
    fn test_chamber(scene: &mut Scene) -> (Entity, Entity) {
        let floor = scene.spawn_object(
            "floor",
            Transform::new(Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO, Vec3::new(10.0, 0.1, 10.0)),
            ObjectFlags::default(),
        );
        scene
            .add_physics(floor, PhysicsBodyDesc::static_body(), unit_bounds())
            .unwrap();

        let back = scene.spawn_object(
            "back_wall",
            Transform::new(Vec3::new(0.0, 1.0, -10.0), Vec3::ZERO, Vec3::new(10.0, 5.0, 0.1)),
            ObjectFlags::portal_surface(),
        );
        scene
            .add_physics(back, PhysicsBodyDesc::static_body(), unit_bounds())
            .unwrap();

        let left = scene.spawn_object(
            "left_wall",
            Transform::new(
                Vec3::new(-10.0, 1.0, 0.0),
                Vec3::new(0.0, 90.0, 0.0),
                Vec3::new(10.0, 5.0, 0.1),
            ),
            ObjectFlags::portal_surface(),
        );
        scene
            .add_physics(left, PhysicsBodyDesc::static_body(), unit_bounds())
            .unwrap();

        (back, left)
    }

    #[test]
    fn test_frame_delta_clamped() {
        assert_eq!(FrameContext::new(5.0).dt, MAX_FRAME_DELTA);
        assert_eq!(FrameContext::new(0.016).dt, 0.016);
        assert_eq!(FrameContext::new(-1.0).dt, 0.0);
    }

    #[test]
    fn test_duplicate_name_ignored() {
        let mut scene = Scene::new();
        let first = scene.spawn_object("cube", Transform::identity(), ObjectFlags::default());
        let second = scene.spawn_object("cube", Transform::identity(), ObjectFlags::default());
        assert_ne!(first, second);
        assert_eq!(scene.object("cube"), Some(first));
    }

    #[test]
    fn test_add_physics_requires_transform() {
        let mut scene = Scene::new();
        let bare = scene.world.spawn(());
        let err = scene
            .add_physics(bare, PhysicsBodyDesc::default(), unit_bounds())
            .unwrap_err();
        assert!(err.downcast_ref::<SceneError>().is_some());
    }

    #[test]
    fn test_missed_portal_shot_changes_nothing() {
        let mut scene = Scene::new();
        test_chamber(&mut scene);
        let (a, _) = scene.spawn_portal_pair(Vec2::new(0.9, 1.35));
        scene.spawn_player(Vec3::ZERO);

        // Aim straight up at the open sky.
        {
            let player = scene.player.unwrap();
            let mut camera = scene.world.get::<&mut Camera>(player).unwrap();
            camera.pitch = 89.0;
            camera.update_vectors();
        }
        let input = InputSnapshot {
            fire_primary: true,
            ..Default::default()
        };
        scene.process_input(&input, FrameContext::new(0.016));

        let portal = scene.world.get::<&Portal>(a).unwrap();
        assert!(!portal.is_active);
        assert!(!scene
            .triggers
            .get(portal.teleport_trigger.unwrap())
            .unwrap()
            .is_active);
    }

    #[test]
    fn test_player_walks_through_portals() {
        let mut scene = Scene::new();
        test_chamber(&mut scene);
        let (a, b) = scene.spawn_portal_pair(Vec2::new(0.9, 1.35));
        scene.spawn_player(Vec3::new(0.0, -0.95, 0.0));

        // Fire portal A at the back wall, then portal B at the left wall.
        {
            let player = scene.player.unwrap();
            let mut camera = scene.world.get::<&mut Camera>(player).unwrap();
            camera.yaw = -90.0; // -Z, toward the back wall
            camera.update_vectors();
        }
        scene.process_input(
            &InputSnapshot {
                fire_primary: true,
                ..Default::default()
            },
            FrameContext::new(0.016),
        );
        {
            let player = scene.player.unwrap();
            let mut camera = scene.world.get::<&mut Camera>(player).unwrap();
            camera.yaw = 180.0; // -X, toward the left wall
            camera.update_vectors();
        }
        scene.process_input(
            &InputSnapshot {
                fire_secondary: true,
                ..Default::default()
            },
            FrameContext::new(0.016),
        );

        assert!(scene.world.get::<&Portal>(a).unwrap().is_active);
        assert!(scene.world.get::<&Portal>(b).unwrap().is_active);

        // Drop the player just inside portal A's near zone, drifting toward
        // the portal surface, and let the scene run.
        let player = scene.player.unwrap();
        {
            let mut transform = scene.world.get::<&mut Transform>(player).unwrap();
            transform.position = Vec3::new(0.0, 1.0, -9.4);
        }
        {
            let mut state = scene.world.get::<&mut Player>(player).unwrap();
            state.velocity = Vec3::new(0.0, 0.0, -2.0);
        }
        for _ in 0..8 {
            scene.update(FrameContext::new(0.05));
        }

        let transform = scene.world.get::<&Transform>(player).unwrap();
        // Through A, out of the left wall's portal B.
        assert!(transform.position.x < -8.5);
        // Mid-transit mask until the near volume is left behind.
        let state = scene.world.get::<&Player>(player).unwrap();
        assert_eq!(state.collision_mask, CollisionMask::NEAR_PORTAL);
    }

    #[test]
    fn test_button_press_flips_wall_and_drops_portal() {
        let mut scene = Scene::new();
        let (_, left) = test_chamber(&mut scene);
        let (a, b) = scene.spawn_portal_pair(Vec2::new(0.9, 1.35));

        // Make the back wall a flip wall hosting portal A.
        let wall = scene.object("back_wall").unwrap();
        scene
            .world
            .insert_one(
                wall,
                FlipWall::new(Vec3::new(0.0, 1.0, -10.0), Vec3::ZERO, Vec3::ZERO),
            )
            .unwrap();

        let button = scene.spawn_button(
            "door_button",
            Transform::from_position(Vec3::new(2.0, -1.9, 0.0)),
            Aabb::new(Vec3::new(-0.4, 0.0, -0.4), Vec3::new(0.4, 0.1, 0.4)),
            Some(wall),
        );
        assert_eq!(scene.object("door_button"), Some(button));

        // Aim both portals directly.
        let hit_a = crate::physics::raycast::RayHit {
            distance: 1.0,
            point: Vec3::new(0.0, 1.0, -9.95),
            normal: Vec3::Z,
            entity: wall,
        };
        portal::aim_portal(&mut scene.world, &mut scene.triggers, a, &hit_a, Vec3::X);
        let hit_b = crate::physics::raycast::RayHit {
            distance: 1.0,
            point: Vec3::new(-9.95, 1.0, 0.0),
            normal: Vec3::X,
            entity: left,
        };
        portal::aim_portal(&mut scene.world, &mut scene.triggers, b, &hit_b, Vec3::X);
        assert!(scene.world.get::<&Portal>(a).unwrap().is_active);

        // Park a crate on the button.
        let weight = scene.spawn_object(
            "weight",
            Transform::from_position(Vec3::new(2.0, -1.2, 0.0)),
            ObjectFlags::teleportable(),
        );
        scene
            .add_physics(weight, PhysicsBodyDesc::default(), unit_bounds())
            .unwrap();

        // Frame 1 latches the trigger, frame 2 sees the press edge and
        // starts the wall rotating, which drops portal A.
        scene.update(FrameContext::new(0.016));
        scene.update(FrameContext::new(0.016));
        scene.update(FrameContext::new(0.016));

        assert!(scene.world.get::<&FlipWall>(wall).unwrap().rotating);
        assert!(!scene.world.get::<&Portal>(a).unwrap().is_active);
        // The dropped pair disarms both teleport triggers.
        let teleport_b = scene.world.get::<&Portal>(b).unwrap().teleport_trigger.unwrap();
        assert!(!scene.triggers.get(teleport_b).unwrap().is_active);
    }
}
