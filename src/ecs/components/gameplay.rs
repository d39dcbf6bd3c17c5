//! Gameplay capability components looked up by entity id.

use glam::Vec3;

/// Per-object gameplay capabilities. Replaces type-based dispatch: systems
/// ask what an entity can do, not what class it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectFlags {
    /// May pass through linked portals (and be grabbed by the player).
    pub teleportable: bool,
    /// Surface accepts portal placement.
    pub can_open_portal: bool,
}

impl ObjectFlags {
    /// Flags for a carryable, teleportable prop.
    pub fn teleportable() -> Self {
        Self {
            teleportable: true,
            can_open_portal: false,
        }
    }

    /// Flags for a wall that accepts portals.
    pub fn portal_surface() -> Self {
        Self {
            teleportable: false,
            can_open_portal: true,
        }
    }
}

/// A floor button. A trigger volume above its top surface maintains the
/// overlap counter; the mesh animates between the rest and pressed positions.
#[derive(Debug, Clone)]
pub struct Button {
    pub initial_position: Vec3,
    pub pressed_position: Vec3,
    /// Travel speed between the two positions, units per second.
    pub press_speed: f32,
    /// Objects currently overlapping the trigger volume.
    pub objects_on: i32,
    pub pressed: bool,
    pub last_pressed: bool,
    /// Flip wall driven by this button, if any.
    pub target: Option<hecs::Entity>,
}

impl Button {
    /// Create a button at rest. The pressed pose sits 0.05 units lower.
    pub fn new(position: Vec3) -> Self {
        Self {
            initial_position: position,
            pressed_position: position - Vec3::new(0.0, 0.05, 0.0),
            press_speed: 1.0,
            objects_on: 0,
            pressed: false,
            last_pressed: false,
            target: None,
        }
    }

    /// Wire the button to a flip wall.
    pub fn with_target(mut self, target: hecs::Entity) -> Self {
        self.target = Some(target);
        self
    }

    /// True only on the frame the button went down.
    pub fn just_pressed(&self) -> bool {
        self.pressed && !self.last_pressed
    }

    /// True only on the frame the button came up.
    pub fn just_released(&self) -> bool {
        !self.pressed && self.last_pressed
    }
}

/// A wall that rotates about a pivot between its rest pose and a flipped
/// pose. While rotating it cannot host a portal.
#[derive(Debug, Clone)]
pub struct FlipWall {
    pub initial_position: Vec3,
    /// Rest rotation in degrees.
    pub initial_rotation: Vec3,
    /// Pivot point in local (model) space.
    pub pivot_local: Vec3,
    /// World-space rotation axis: the rest rotation applied to local +Z.
    pub rotation_axis: Vec3,
    /// Flipped-pose angle in degrees.
    pub max_angle: f32,
    /// Angular speed in degrees per second.
    pub speed: f32,
    pub current_angle: f32,
    pub target_angle: f32,
    pub rotating: bool,
}

impl FlipWall {
    /// Create a flip wall at rest.
    pub fn new(position: Vec3, rotation: Vec3, pivot_local: Vec3) -> Self {
        let axis = super::transform::rotation_matrix_degrees(rotation)
            .transform_vector3(Vec3::Z)
            .normalize();
        Self {
            initial_position: position,
            initial_rotation: rotation,
            pivot_local,
            rotation_axis: axis,
            max_angle: 45.0,
            speed: 90.0,
            current_angle: 0.0,
            target_angle: 0.0,
            rotating: false,
        }
    }

    /// Start rotating toward the flipped pose.
    pub fn flip(&mut self) {
        self.target_angle = self.max_angle;
    }

    /// Start rotating back to rest.
    pub fn reset(&mut self) {
        self.target_angle = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edge_detection() {
        let mut button = Button::new(Vec3::ZERO);
        assert!(!button.just_pressed());

        button.last_pressed = button.pressed;
        button.objects_on = 1;
        button.pressed = true;
        assert!(button.just_pressed());
        assert!(!button.just_released());

        button.last_pressed = button.pressed;
        assert!(!button.just_pressed());

        button.objects_on = 0;
        button.pressed = false;
        assert!(button.just_released());
    }

    #[test]
    fn test_flip_wall_axis_follows_rotation() {
        let flat = FlipWall::new(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert!((flat.rotation_axis - Vec3::Z).length() < 1e-5);

        let turned = FlipWall::new(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0), Vec3::ZERO);
        assert!((turned.rotation_axis - Vec3::X).length() < 1e-5);
    }
}
