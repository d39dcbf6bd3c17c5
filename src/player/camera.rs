//! First-person camera with yaw/pitch/roll orientation.

use glam::{Mat4, Quat, Vec3};

/// First-person camera. Orientation is stored as yaw/pitch/roll in degrees;
/// the basis vectors are re-derived whenever the angles change.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,
    /// Yaw in degrees; -90 looks along -Z.
    pub yaw: f32,
    /// Pitch in degrees, clamped short of straight up/down.
    pub pitch: f32,
    /// Roll in degrees about the front axis. Nonzero only right after a
    /// teleport, while the recovery animation runs it back to zero.
    pub roll: f32,
    pub mouse_sensitivity: f32,
}

impl Camera {
    /// Create a camera at a position, looking along -Z.
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            roll: 0.0,
            mouse_sensitivity: 0.1,
        };
        camera.update_vectors();
        camera
    }

    /// Re-derive front/right/up from the current yaw, pitch, and roll.
    pub fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();

        let mut right = front.cross(self.world_up).normalize();
        let mut up = right.cross(front).normalize();

        if self.roll.abs() > f32::EPSILON {
            let q = Quat::from_axis_angle(front, self.roll.to_radians());
            right = q * right;
            up = q * up;
        }

        self.front = front;
        self.right = right;
        self.up = up;
    }

    /// Apply a mouse delta to yaw and pitch.
    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-89.0, 89.0);
        self.update_vectors();
    }

    /// View matrix for the current pose.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.front, self.up)
    }
}
