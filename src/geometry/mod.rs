//! Spatial primitives shared by the physics, trigger, and portal systems.

use glam::{Vec3, Vec4};

/// Axis-aligned bounding box in local (model) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a set of points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);

        for p in points {
            min = min.min(p);
            max = max.max(p);
        }

        Self { min, max }
    }

    /// Symmetric box: `-half_extents..half_extents`.
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self {
            min: -half_extents,
            max: half_extents,
        }
    }

    /// Get the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half of the size along each axis.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if a point is inside the AABB.
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Oriented bounding box in world space: center, three orthonormal axes, and
/// half extents along each axis.
#[derive(Debug, Clone, Copy)]
pub struct Obb {
    pub center: Vec3,
    pub axes: [Vec3; 3],
    pub half_extents: Vec3,
}

impl Obb {
    /// Create a new OBB from center, axes, and half extents.
    pub fn new(center: Vec3, axes: [Vec3; 3], half_extents: Vec3) -> Self {
        Self {
            center,
            axes,
            half_extents,
        }
    }

    /// Axis-aligned OBB (identity axes).
    pub fn axis_aligned(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            axes: [Vec3::X, Vec3::Y, Vec3::Z],
            half_extents,
        }
    }

    /// Check if a point is inside the box by projecting the offset onto each
    /// local axis and comparing against the half extent.
    pub fn contains_point(&self, point: Vec3) -> bool {
        let d = point - self.center;
        for i in 0..3 {
            if d.dot(self.axes[i]).abs() > self.half_extents[i] {
                return false;
            }
        }
        true
    }
}

impl Default for Obb {
    fn default() -> Self {
        Self::axis_aligned(Vec3::ZERO, Vec3::ZERO)
    }
}

/// Plane in `Ax + By + Cz + D = 0` form from a point and a normal.
pub fn plane_from_point_normal(point: Vec3, normal: Vec3) -> Vec4 {
    let n = normal.normalize();
    Vec4::new(n.x, n.y, n.z, -n.dot(point))
}

/// Signed distance from a point to a plane in `Ax + By + Cz + D = 0` form.
pub fn plane_signed_distance(plane: Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_center_extents() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, -3.0), Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(aabb.half_extents(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_obb_contains_point_rotated() {
        // Box rotated 45 degrees about Y.
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let axes = [
            Vec3::new(s, 0.0, -s),
            Vec3::Y,
            Vec3::new(s, 0.0, s),
        ];
        let obb = Obb::new(Vec3::ZERO, axes, Vec3::splat(1.0));

        // 0.9 units along the rotated +Z axis stays inside.
        assert!(obb.contains_point(axes[2] * 0.9));
        // 1.2 units along the rotated +X axis projects past the extent.
        assert!(!obb.contains_point(axes[0] * 1.2));
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = plane_from_point_normal(Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
        assert!((plane_signed_distance(plane, Vec3::new(5.0, 3.0, -1.0)) - 1.0).abs() < 1e-6);
        assert!((plane_signed_distance(plane, Vec3::new(0.0, 2.0, 9.0))).abs() < 1e-6);
    }
}
