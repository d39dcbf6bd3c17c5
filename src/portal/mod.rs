//! Linked-portal gameplay: aiming, frame geometry, trigger arming, and
//! transit.
//!
//! A portal pair is only traversable once both ends have been successfully
//! aimed at a surface; until then their near/teleport triggers stay
//! disarmed.

pub mod teleport;
pub mod view;

use glam::{Vec2, Vec3};
use hecs::{Entity, World};

use crate::ecs::components::gameplay::ObjectFlags;
use crate::ecs::components::physics::{BoxCollider, CollisionMask, RigidBody, WorldObb};
use crate::ecs::components::transform::Transform;
use crate::geometry::Aabb;
use crate::physics::raycast::RayHit;
use crate::physics::rigid_body::world_obb_for;
use crate::trigger::{Trigger, TriggerId, TriggerRegistry};

use self::view::DoubleBuffer;

/// Frame piece thickness perpendicular to the portal surface plane.
const FRAME_THICKNESS: f32 = 0.05;
/// Frame piece depth along the portal normal.
const FRAME_DEPTH: f32 = 0.1;
/// Half depth of the teleport trigger along the portal normal. Must stay
/// under half of `teleport::EXIT_PUSH`, or an arriving object would land
/// inside the destination's own trigger and bounce straight back.
const TELEPORT_TRIGGER_DEPTH: f32 = 0.2;
/// Half depth of the near trigger along the portal normal.
const NEAR_TRIGGER_DEPTH: f32 = 1.5;
/// Margin the near trigger extends past the portal surface.
const NEAR_TRIGGER_MARGIN: f32 = 0.5;
/// Surfaces steeper than this |normal.y| count as floor/ceiling placements.
const HORIZONTAL_NORMAL_Y: f32 = 0.95;

/// Which end of the pair a portal is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalKind {
    A,
    B,
}

/// Portal component. All cross-references are entity ids or registry
/// handles; the trigger registry stays the sole owner of the triggers.
#[derive(Debug)]
pub struct Portal {
    pub kind: PortalKind,
    /// Set once the portal has been successfully aimed at a surface.
    pub is_active: bool,
    pub linked: Option<Entity>,
    /// Surface the portal currently sits on; its collision mask is restored
    /// when the portal moves elsewhere.
    pub on_object: Option<Entity>,
    pub near_trigger: Option<TriggerId>,
    pub teleport_trigger: Option<TriggerId>,
    /// Frame pieces: top, bottom, left, right.
    pub frames: [Entity; 4],
    /// Half width / half height of the portal surface.
    pub half_extents: Vec2,
    pub buffers: DoubleBuffer,
}

/// Where unaimed portals and their frames wait, well outside any level.
const PARKED_POSITION: Vec3 = Vec3::new(0.0, -1000.0, 0.0);

/// Spawn an unaimed portal and its four frame pieces, parked out of the way
/// until the portal is aimed at a surface.
pub fn spawn_portal(world: &mut World, kind: PortalKind, half_extents: Vec2) -> Entity {
    let frames = std::array::from_fn(|_| {
        let mut body = RigidBody::new_static();
        body.collision_mask = CollisionMask::PORTAL_FRAME;
        let transform = Transform::from_position(PARKED_POSITION);
        let collider = BoxCollider(Aabb::from_half_extents(Vec3::splat(FRAME_THICKNESS)));
        let obb = world_obb_for(&transform, &collider);
        world.spawn((transform, body, collider, WorldObb(obb)))
    });

    world.spawn((
        Transform::from_position(PARKED_POSITION),
        Portal {
            kind,
            is_active: false,
            linked: None,
            on_object: None,
            near_trigger: None,
            teleport_trigger: None,
            frames,
            half_extents,
            buffers: DoubleBuffer::new(),
        },
    ))
}

/// Link two portals symmetrically.
pub fn link_portals(world: &mut World, a: Entity, b: Entity) {
    if let Ok(mut portal) = world.get::<&mut Portal>(a) {
        portal.linked = Some(b);
    }
    if let Ok(mut portal) = world.get::<&mut Portal>(b) {
        portal.linked = Some(a);
    }
}

/// Create and register the near and teleport triggers for one portal. Both
/// start disarmed; they arm only once both ends of the pair are active. A
/// portal with no link is left untouched.
pub fn init_portal(world: &mut World, triggers: &mut TriggerRegistry, portal: Entity) {
    let Some(linked) = world.get::<&Portal>(portal).ok().and_then(|p| p.linked) else {
        tracing::warn!(?portal, "init on unlinked portal ignored");
        return;
    };

    let teleport_id = triggers.insert(
        Trigger::new(Default::default())
            .inactive()
            .on_enter(move |entity, world| {
                teleport::teleport_entity(world, portal, linked, entity);
            }),
    );

    let near_id = triggers.insert(
        Trigger::new(Default::default())
            .inactive()
            .on_enter(set_transit_mask)
            .on_inside(set_transit_mask)
            .on_exit(|entity, world| {
                if let Ok(mut rb) = world.get::<&mut RigidBody>(entity) {
                    if !rb.is_static {
                        rb.collision_mask = CollisionMask::DEFAULT;
                    }
                } else if let Ok(mut player) = world.get::<&mut crate::player::Player>(entity) {
                    player.collision_mask = CollisionMask::DEFAULT;
                }
            }),
    );

    if let Ok(mut p) = world.get::<&mut Portal>(portal) {
        p.teleport_trigger = Some(teleport_id);
        p.near_trigger = Some(near_id);
    }
}

/// Mark a dynamic body or the player as mid-transit so it can pass through
/// the host surface. Static geometry never transits.
fn set_transit_mask(entity: Entity, world: &mut World) {
    if let Ok(mut rb) = world.get::<&mut RigidBody>(entity) {
        if !rb.is_static {
            rb.collision_mask = CollisionMask::NEAR_PORTAL;
        }
    } else if let Ok(mut player) = world.get::<&mut crate::player::Player>(entity) {
        player.collision_mask = CollisionMask::NEAR_PORTAL;
    }
}

/// Aim the portal at a raycast hit. Rejects surfaces that disallow portals.
/// On success: the previous host surface gets its mask back, the new host is
/// exempted from default collision, the portal transform/frames/triggers
/// follow the hit, and the pair's triggers arm if both ends are now active.
pub fn aim_portal(
    world: &mut World,
    triggers: &mut TriggerRegistry,
    portal: Entity,
    hit: &RayHit,
    player_right: Vec3,
) -> bool {
    let allowed = world
        .get::<&ObjectFlags>(hit.entity)
        .map(|flags| flags.can_open_portal)
        .unwrap_or(false);
    if !allowed {
        tracing::debug!(surface = ?hit.entity, "portal rejected by surface");
        return false;
    }

    let previous = match world.get::<&Portal>(portal) {
        Ok(p) => p.on_object,
        Err(_) => return false,
    };
    if let Some(previous) = previous.filter(|&p| p != hit.entity) {
        if let Ok(mut rb) = world.get::<&mut RigidBody>(previous) {
            rb.collision_mask = CollisionMask::DEFAULT;
        }
    }
    if let Ok(mut rb) = world.get::<&mut RigidBody>(hit.entity) {
        rb.collision_mask = CollisionMask::PORTAL_ON;
    }

    let rotation = rotation_from_normal(hit.normal, player_right);
    if let Ok(mut transform) = world.get::<&mut Transform>(portal) {
        transform.position = hit.point;
        transform.rotation = rotation;
    }
    if let Ok(mut p) = world.get::<&mut Portal>(portal) {
        p.on_object = Some(hit.entity);
        p.is_active = true;
    }

    update_frames_transform(world, portal);
    update_trigger_bounds(world, triggers, portal);
    update_trigger_arming(world, triggers, portal);

    tracing::debug!(?portal, point = ?hit.point, "portal placed");
    true
}

/// Euler rotation (degrees) orienting the portal's +Z along the surface
/// normal. Near-horizontal surfaces leave yaw degenerate, so the portal's up
/// direction is disambiguated from the player's right vector instead.
fn rotation_from_normal(normal: Vec3, player_right: Vec3) -> Vec3 {
    if normal.y.abs() > HORIZONTAL_NORMAL_Y {
        let pitch = -normal.y.signum() * 90.0;
        let up_hint = player_right.cross(normal).normalize_or_zero();
        let roll = if normal.y > 0.0 {
            (-up_hint.x).atan2(-up_hint.z)
        } else {
            (-up_hint.x).atan2(up_hint.z)
        };
        Vec3::new(pitch, 0.0, roll.to_degrees())
    } else {
        let pitch = (-normal.y).asin().to_degrees();
        let yaw = normal.x.atan2(normal.z).to_degrees();
        Vec3::new(pitch, yaw, 0.0)
    }
}

/// Reposition the four frame pieces around the portal surface and refresh
/// their collision caches so queries this frame already see them.
pub fn update_frames_transform(world: &mut World, portal: Entity) {
    let Ok((frames, half)) = world
        .get::<&Portal>(portal)
        .map(|p| (p.frames, p.half_extents))
    else {
        return;
    };
    let Ok(transform) = world.get::<&Transform>(portal).map(|t| *t) else {
        return;
    };

    let right = transform.right();
    let up = transform.up();
    let (hw, hh) = (half.x, half.y);

    let offsets = [
        up * (hh + FRAME_THICKNESS * 0.5),
        -up * (hh + FRAME_THICKNESS * 0.5),
        -right * (hw + FRAME_THICKNESS * 0.5),
        right * (hw + FRAME_THICKNESS * 0.5),
    ];
    let extents = [
        Vec3::new(hw + FRAME_THICKNESS, FRAME_THICKNESS * 0.5, FRAME_DEPTH * 0.5),
        Vec3::new(hw + FRAME_THICKNESS, FRAME_THICKNESS * 0.5, FRAME_DEPTH * 0.5),
        Vec3::new(FRAME_THICKNESS * 0.5, hh, FRAME_DEPTH * 0.5),
        Vec3::new(FRAME_THICKNESS * 0.5, hh, FRAME_DEPTH * 0.5),
    ];

    for (i, frame) in frames.into_iter().enumerate() {
        let frame_transform = Transform::new(
            transform.position + offsets[i],
            transform.rotation,
            Vec3::ONE,
        );
        let collider = BoxCollider(Aabb::from_half_extents(extents[i]));
        let obb = world_obb_for(&frame_transform, &collider);

        if let Ok(mut t) = world.get::<&mut Transform>(frame) {
            *t = frame_transform;
        }
        if let Ok(mut c) = world.get::<&mut BoxCollider>(frame) {
            *c = collider;
        }
        if let Ok(mut cached) = world.get::<&mut WorldObb>(frame) {
            cached.0 = obb;
        }
    }
}

/// Rebuild the near/teleport trigger volumes around the portal surface.
fn update_trigger_bounds(world: &World, triggers: &mut TriggerRegistry, portal: Entity) {
    let Ok((near_id, teleport_id, half)) = world
        .get::<&Portal>(portal)
        .map(|p| (p.near_trigger, p.teleport_trigger, p.half_extents))
    else {
        return;
    };
    let Ok(transform) = world.get::<&Transform>(portal).map(|t| *t) else {
        return;
    };

    let axes = [transform.right(), transform.up(), transform.forward()];

    if let Some(trigger) = teleport_id.and_then(|id| triggers.get_mut(id)) {
        trigger.set_from_center_axes_extents(
            transform.position,
            axes,
            Vec3::new(half.x, half.y, TELEPORT_TRIGGER_DEPTH),
        );
    }
    if let Some(trigger) = near_id.and_then(|id| triggers.get_mut(id)) {
        trigger.set_from_center_axes_extents(
            transform.position,
            axes,
            Vec3::new(
                half.x + NEAR_TRIGGER_MARGIN,
                half.y + NEAR_TRIGGER_MARGIN,
                NEAR_TRIGGER_DEPTH,
            ),
        );
    }
}

/// Arm or disarm the pair's triggers. Teleportation requires both ends
/// individually aimed; one-sided portals stay inert.
pub fn update_trigger_arming(world: &World, triggers: &mut TriggerRegistry, portal: Entity) {
    let Ok((my_active, linked, my_near, my_teleport)) = world
        .get::<&Portal>(portal)
        .map(|p| (p.is_active, p.linked, p.near_trigger, p.teleport_trigger))
    else {
        return;
    };

    let other = linked.and_then(|linked| {
        world
            .get::<&Portal>(linked)
            .map(|p| (p.is_active, p.near_trigger, p.teleport_trigger))
            .ok()
    });

    let armed = my_active && other.map(|(active, _, _)| active).unwrap_or(false);

    for id in [my_near, my_teleport].into_iter().flatten() {
        triggers.set_active(id, armed);
    }
    if let Some((_, other_near, other_teleport)) = other {
        for id in [other_near, other_teleport].into_iter().flatten() {
            triggers.set_active(id, armed);
        }
    }
}

/// Deactivate a portal whose host surface became invalid (e.g. a flip wall
/// mid-rotation): restore the host's mask and disarm the pair.
pub fn deactivate_portal(world: &mut World, triggers: &mut TriggerRegistry, portal: Entity) {
    let Ok((active, on_object)) = world
        .get::<&Portal>(portal)
        .map(|p| (p.is_active, p.on_object))
    else {
        return;
    };
    if !active {
        return;
    }

    if let Some(host) = on_object {
        if let Ok(mut rb) = world.get::<&mut RigidBody>(host) {
            rb.collision_mask = CollisionMask::DEFAULT;
        }
    }
    if let Ok(mut p) = world.get::<&mut Portal>(portal) {
        p.is_active = false;
        p.on_object = None;
    }
    update_trigger_arming(world, triggers, portal);
    tracing::debug!(?portal, "portal deactivated");
}

/// View transform for rendering through `portal`; unlinked portals return
/// the view unchanged.
pub fn portal_view(world: &World, portal: Entity, view: glam::Mat4) -> glam::Mat4 {
    match pair_transforms(world, portal) {
        Some((my, other)) => view::transformed_view(&my, &other, view),
        None => view,
    }
}

/// World plane of the linked portal; zero when unlinked.
pub fn portal_plane(world: &World, portal: Entity) -> glam::Vec4 {
    match pair_transforms(world, portal) {
        Some((_, other)) => view::plane_equation(&other),
        None => glam::Vec4::ZERO,
    }
}

/// Recursive view chain for the presentation layer; empty when unlinked.
pub fn portal_view_chain(
    world: &World,
    portal: Entity,
    view: glam::Mat4,
    projection: glam::Mat4,
) -> Vec<view::PortalView> {
    match pair_transforms(world, portal) {
        Some((my, other)) => view::view_chain(&my, &other, view, projection, view::MAX_VIEW_DEPTH),
        None => Vec::new(),
    }
}

fn pair_transforms(world: &World, portal: Entity) -> Option<(Transform, Transform)> {
    let linked = world.get::<&Portal>(portal).ok()?.linked?;
    let my = *world.get::<&Transform>(portal).ok()?;
    let other = *world.get::<&Transform>(linked).ok()?;
    Some((my, other))
}
