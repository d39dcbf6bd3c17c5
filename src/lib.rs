//! Rift: first-person portal-mechanics game core.
//!
//! # Architecture
//!
//! The library is organized into layers, leaves first:
//!
//! 1. **geometry** - spatial primitives (AABB, OBB, plane equations)
//! 2. **ecs** - component types and behavior passes over a `hecs::World`
//! 3. **physics** - rigid bodies, SAT collision, raycasts, player queries
//! 4. **trigger** - OBB volumes with enter/exit/inside callbacks
//! 5. **portal** - linked-portal aiming, view transforms, teleportation
//! 6. **player** - first-person camera and character controller
//! 7. **scene** - world ownership and per-frame orchestration
//!
//! Window/context creation, input polling, asset loading, and rendering are
//! collaborator responsibilities: the embedding layer feeds the scene an
//! [`InputSnapshot`] per frame and consumes the portal view transforms.

pub mod ecs;
pub mod geometry;
pub mod input;
pub mod physics;
pub mod player;
pub mod portal;
pub mod scene;
pub mod trigger;

// Re-export commonly used types
pub use ecs::components::gameplay::{Button, FlipWall, ObjectFlags};
pub use ecs::components::physics::{BoxCollider, CollisionMask, RigidBody, WorldObb};
pub use ecs::components::transform::Transform;

pub use geometry::{Aabb, Obb};

pub use input::InputSnapshot;

pub use physics::raycast::RayHit;
pub use physics::{PhysicsConfig, PhysicsSystem};

pub use player::camera::Camera;
pub use player::{Player, PlayerConfig};

pub use portal::view::{DoubleBuffer, PortalView, MAX_VIEW_DEPTH};
pub use portal::{Portal, PortalKind};

pub use scene::{FrameContext, PhysicsBodyDesc, Scene, SceneError};

pub use trigger::{Trigger, TriggerId, TriggerRegistry};

// Re-export the foundation crates for convenience
pub use glam;
pub use hecs;
