//! Transform component: position, Euler rotation in degrees, scale.

use glam::{EulerRot, Mat4, Vec3};

/// Rotation matrix for Euler angles in degrees, using the crate-wide Y·X·Z
/// axis order. Every consumer of rotation (OBB refresh, portal view math,
/// teleport remap) goes through this function so the convention cannot drift.
pub fn rotation_matrix_degrees(euler: Vec3) -> Mat4 {
    Mat4::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// World transform. Stores position, rotation, and scale separately.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in degrees (pitch about X, yaw about Y, roll about Z).
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from position, rotation (degrees), and scale.
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotation-only matrix (Y·X·Z order).
    pub fn rotation_matrix(&self) -> Mat4 {
        rotation_matrix_degrees(self.rotation)
    }

    /// Full model matrix (translation · rotation · scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.rotation_matrix() * Mat4::from_scale(self.scale)
    }

    /// Translation · rotation only. Portal view and teleport math use this
    /// form: the surface scale must not leak into camera transforms.
    pub fn isometry_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.rotation_matrix()
    }

    /// Local +X in world space.
    pub fn right(&self) -> Vec3 {
        self.rotation_matrix().x_axis.truncate()
    }

    /// Local +Y in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation_matrix().y_axis.truncate()
    }

    /// Local +Z in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix().z_axis.truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
