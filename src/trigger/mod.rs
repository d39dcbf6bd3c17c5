//! Trigger volumes: non-colliding OBBs that fire callbacks when objects
//! enter, leave, or remain inside them.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use hecs::{Entity, World};

use crate::ecs::components::transform::Transform;
use crate::geometry::Obb;

/// Callback invoked with the entity that caused the transition and the world
/// it lives in.
pub type TriggerCallback = Box<dyn FnMut(Entity, &mut World)>;

/// A trigger volume. Tracks the set of entities currently inside so that
/// enter/exit fire exactly once per transition, while `on_inside` fires every
/// check for a contained entity. Containment tests the entity's origin point
/// only, not its full extent.
pub struct Trigger {
    pub bounds: Obb,
    /// Inactive triggers skip all checks and fire nothing.
    pub is_active: bool,
    inside: HashSet<Entity>,
    on_enter: Option<TriggerCallback>,
    on_exit: Option<TriggerCallback>,
    on_inside: Option<TriggerCallback>,
}

impl Trigger {
    /// Create an active trigger with the given bounds.
    pub fn new(bounds: Obb) -> Self {
        Self {
            bounds,
            is_active: true,
            inside: HashSet::new(),
            on_enter: None,
            on_exit: None,
            on_inside: None,
        }
    }

    /// Axis-aligned trigger spanning `min..max`.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new(Obb::axis_aligned((min + max) * 0.5, (max - min) * 0.5))
    }

    /// Start the trigger disarmed.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Register the enter callback.
    pub fn on_enter(mut self, f: impl FnMut(Entity, &mut World) + 'static) -> Self {
        self.on_enter = Some(Box::new(f));
        self
    }

    /// Register the exit callback.
    pub fn on_exit(mut self, f: impl FnMut(Entity, &mut World) + 'static) -> Self {
        self.on_exit = Some(Box::new(f));
        self
    }

    /// Register the continuous inside callback.
    pub fn on_inside(mut self, f: impl FnMut(Entity, &mut World) + 'static) -> Self {
        self.on_inside = Some(Box::new(f));
        self
    }

    /// Replace the bounds.
    pub fn set_bounds(&mut self, bounds: Obb) {
        self.bounds = bounds;
    }

    /// Rebuild the bounds from center, axes, and half extents.
    pub fn set_from_center_axes_extents(&mut self, center: Vec3, axes: [Vec3; 3], half_extents: Vec3) {
        self.bounds = Obb::new(center, axes, half_extents);
    }

    /// Whether the entity is currently tracked as inside.
    pub fn contains_entity(&self, entity: Entity) -> bool {
        self.inside.contains(&entity)
    }

    /// Evaluate one entity against the volume. Entities with no transform
    /// are a no-op.
    pub fn check(&mut self, entity: Entity, world: &mut World) {
        if !self.is_active {
            return;
        }
        let Ok(position) = world.get::<&Transform>(entity).map(|t| t.position) else {
            return;
        };

        let inside = self.bounds.contains_point(position);
        let was_inside = self.inside.contains(&entity);

        if inside && !was_inside {
            self.inside.insert(entity);
            if let Some(callback) = self.on_enter.as_mut() {
                callback(entity, world);
            }
        } else if !inside && was_inside {
            self.inside.remove(&entity);
            if let Some(callback) = self.on_exit.as_mut() {
                callback(entity, world);
            }
        }

        if inside {
            if let Some(callback) = self.on_inside.as_mut() {
                callback(entity, world);
            }
        }
    }
}

/// Stable handle into the trigger registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(usize);

/// Sole owner of every trigger in a scene. Other systems hold `TriggerId`
/// handles for lookup, never ownership.
#[derive(Default)]
pub struct TriggerRegistry {
    slots: Vec<Option<Trigger>>,
    names: HashMap<String, TriggerId>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a trigger, reusing a vacant slot when one exists.
    pub fn insert(&mut self, trigger: Trigger) -> TriggerId {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(trigger);
            TriggerId(index)
        } else {
            self.slots.push(Some(trigger));
            TriggerId(self.slots.len() - 1)
        }
    }

    /// Insert a trigger under a name. A duplicate name is logged and the
    /// new trigger dropped.
    pub fn insert_named(&mut self, name: &str, trigger: Trigger) -> Option<TriggerId> {
        if self.names.contains_key(name) {
            tracing::warn!(name, "trigger name already registered, ignoring");
            return None;
        }
        let id = self.insert(trigger);
        self.names.insert(name.to_owned(), id);
        id.into()
    }

    /// Remove a trigger by handle. O(1); the slot is recycled.
    pub fn remove(&mut self, id: TriggerId) -> Option<Trigger> {
        let removed = self.slots.get_mut(id.0)?.take();
        if removed.is_some() {
            self.names.retain(|_, v| *v != id);
        }
        removed
    }

    pub fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: TriggerId) -> Option<&mut Trigger> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Look up a trigger handle by name.
    pub fn by_name(&self, name: &str) -> Option<TriggerId> {
        self.names.get(name).copied()
    }

    /// Arm or disarm a trigger.
    pub fn set_active(&mut self, id: TriggerId, active: bool) {
        if let Some(trigger) = self.get_mut(id) {
            trigger.is_active = active;
        }
    }

    /// Evaluate every active trigger against every transform-bearing entity.
    pub fn check_all(&mut self, world: &mut World) {
        let entities: Vec<Entity> = world
            .query::<&Transform>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();

        for slot in self.slots.iter_mut() {
            let Some(trigger) = slot else { continue };
            if !trigger.is_active {
                continue;
            }
            for &entity in &entities {
                trigger.check(entity, world);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counter(i32);

    fn counting_trigger(
        bounds: Obb,
    ) -> (Trigger, Rc<Cell<i32>>, Rc<Cell<i32>>, Rc<Cell<i32>>) {
        let enters = Rc::new(Cell::new(0));
        let exits = Rc::new(Cell::new(0));
        let insides = Rc::new(Cell::new(0));
        let (e, x, i) = (enters.clone(), exits.clone(), insides.clone());
        let trigger = Trigger::new(bounds)
            .on_enter(move |_, _| e.set(e.get() + 1))
            .on_exit(move |_, _| x.set(x.get() + 1))
            .on_inside(move |_, _| i.set(i.get() + 1));
        (trigger, enters, exits, insides)
    }

    #[test]
    fn test_transition_idempotence() {
        let mut world = World::new();
        let entity = world.spawn((Transform::from_position(Vec3::ZERO),));

        let (mut trigger, enters, exits, insides) =
            counting_trigger(Obb::axis_aligned(Vec3::ZERO, Vec3::splat(1.0)));

        // Stationary inside: enter fires once, inside fires every check.
        for _ in 0..5 {
            trigger.check(entity, &mut world);
        }
        assert_eq!(enters.get(), 1);
        assert_eq!(exits.get(), 0);
        assert_eq!(insides.get(), 5);

        // Move out: exit fires exactly once.
        world.get::<&mut Transform>(entity).unwrap().position = Vec3::new(5.0, 0.0, 0.0);
        for _ in 0..3 {
            trigger.check(entity, &mut world);
        }
        assert_eq!(enters.get(), 1);
        assert_eq!(exits.get(), 1);
        assert_eq!(insides.get(), 5);
    }

    #[test]
    fn test_inactive_trigger_is_skipped() {
        let mut world = World::new();
        let entity = world.spawn((Transform::from_position(Vec3::ZERO),));

        let (trigger, enters, _, insides) =
            counting_trigger(Obb::axis_aligned(Vec3::ZERO, Vec3::splat(1.0)));
        let mut trigger = trigger.inactive();

        trigger.check(entity, &mut world);
        assert_eq!(enters.get(), 0);
        assert_eq!(insides.get(), 0);
    }

    #[test]
    fn test_callback_mutates_world() {
        let mut world = World::new();
        let entity = world.spawn((Transform::from_position(Vec3::ZERO), Counter::default()));

        let mut trigger = Trigger::new(Obb::axis_aligned(Vec3::ZERO, Vec3::splat(1.0))).on_enter(
            move |e, world| {
                if let Ok(mut counter) = world.get::<&mut Counter>(e) {
                    counter.0 += 1;
                }
            },
        );

        trigger.check(entity, &mut world);
        assert_eq!(world.get::<&Counter>(entity).unwrap().0, 1);
    }

    #[test]
    fn test_registry_handles_and_slot_reuse() {
        let mut registry = TriggerRegistry::new();
        let a = registry.insert(Trigger::new(Obb::default()));
        let b = registry.insert(Trigger::new(Obb::default()));
        assert_ne!(a, b);

        assert!(registry.remove(a).is_some());
        assert!(registry.get(a).is_none());

        // The vacated slot is reused for the next insertion.
        let c = registry.insert(Trigger::new(Obb::default()));
        assert_eq!(a, c);
        assert!(registry.get(b).is_some());
    }

    #[test]
    fn test_registry_duplicate_name_ignored() {
        let mut registry = TriggerRegistry::new();
        let first = registry.insert_named("door", Trigger::new(Obb::default()));
        assert!(first.is_some());
        assert!(registry.insert_named("door", Trigger::new(Obb::default())).is_none());
        assert_eq!(registry.by_name("door"), first);
    }
}
