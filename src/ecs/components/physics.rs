//! Physics components: rigid bodies, box colliders, collision masks.

use bitflags::bitflags;
use glam::Vec3;

use crate::geometry::{Aabb, Obb};

/// Smallest mass the solver will divide by. Bodies configured with a zero or
/// negative mass behave as if they had this mass instead of producing NaNs.
pub const MIN_MASS: f32 = 1e-4;

bitflags! {
    /// Collision filter. Two bodies are eligible for collision only when
    /// their masks share at least one bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CollisionMask: u32 {
        /// Ordinary level geometry and props.
        const DEFAULT = 0xF;
        /// Portal frame pieces, filtered out of default collision.
        const PORTAL_FRAME = 0xF0;
        /// Host-surface mask while a portal is placed on it. Shares one bit
        /// with DEFAULT so ordinary objects still land on the surface.
        const PORTAL_ON = 0x1;
        /// Object near an active portal pair. Shares a bit with DEFAULT so
        /// the rest of the level stays solid, but none with PORTAL_ON or
        /// PORTAL_FRAME: mid-transit objects slip through the host surface
        /// and the frame pieces.
        const NEAR_PORTAL = 0x2;
        /// Collides with everything.
        const ALL = 0xFFFF_FFFF;
    }
}

impl CollisionMask {
    /// Mask gate: a pair collides iff the masks intersect.
    pub fn collides_with(self, other: CollisionMask) -> bool {
        self.intersects(other)
    }
}

/// Rigid body component. Mutated only by the physics system during
/// integration and resolution.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// Force accumulator, cleared after every integration step.
    pub force: Vec3,
    pub mass: f32,
    pub use_gravity: bool,
    pub is_static: bool,
    pub collision_enabled: bool,
    pub friction: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    pub collision_mask: CollisionMask,
}

impl RigidBody {
    /// Create a dynamic rigid body with the given mass.
    pub fn new_dynamic(mass: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            use_gravity: true,
            is_static: false,
            collision_enabled: true,
            friction: 0.5,
            restitution: 0.2,
            collision_mask: CollisionMask::ALL,
        }
    }

    /// Create an immovable rigid body.
    pub fn new_static() -> Self {
        Self {
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            force: Vec3::ZERO,
            mass: 0.0,
            use_gravity: false,
            is_static: true,
            collision_enabled: true,
            friction: 0.5,
            restitution: 0.2,
            collision_mask: CollisionMask::ALL,
        }
    }

    /// Accumulate a force for the next integration step.
    pub fn add_force(&mut self, f: Vec3) {
        self.force += f;
    }

    /// Clear the force accumulator.
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
    }

    /// Mass guarded against division by zero in integration and impulses.
    pub fn effective_mass(&self) -> f32 {
        self.mass.max(MIN_MASS)
    }
}

/// Local-space box collider, authored once from model bounds.
#[derive(Debug, Clone, Copy)]
pub struct BoxCollider(pub Aabb);

/// Cached world-space OBB, derived every physics tick from the transform and
/// the local collider. Never hand-mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldObb(pub Obb);
