//! Narrowphase collision detection: separating-axis test over oriented boxes.

use glam::Vec3;

use crate::geometry::Obb;

/// Result of an overlapping SAT test.
#[derive(Debug, Clone, Copy)]
pub struct SatContact {
    /// Contact normal, oriented from box B toward box A.
    pub normal: Vec3,
    /// Depth along the minimum-penetration axis.
    pub penetration: f32,
}

/// Test a single candidate axis. Returns false when the axis separates the
/// boxes; otherwise tracks the minimum penetration seen so far. Near-zero
/// axes (parallel edge cross products) are skipped without failing the test.
fn test_axis(axis: Vec3, a: &Obb, b: &Obb, best: &mut (f32, Vec3)) -> bool {
    if axis.length_squared() < 1e-6 {
        return true;
    }
    let axis = axis.normalize();

    let proj_a = (a.axes[0].dot(axis) * a.half_extents.x).abs()
        + (a.axes[1].dot(axis) * a.half_extents.y).abs()
        + (a.axes[2].dot(axis) * a.half_extents.z).abs();
    let proj_b = (b.axes[0].dot(axis) * b.half_extents.x).abs()
        + (b.axes[1].dot(axis) * b.half_extents.y).abs()
        + (b.axes[2].dot(axis) * b.half_extents.z).abs();

    let dist = (b.center - a.center).dot(axis).abs();
    let penetration = proj_a + proj_b - dist;

    if penetration < 0.0 {
        return false;
    }
    if penetration < best.0 {
        *best = (penetration, axis);
    }
    true
}

/// 15-axis separating-axis test: 3 face axes of A, 3 of B, and the 9 edge
/// cross products. Any separating axis short-circuits to `None`; otherwise
/// the axis of minimum penetration becomes the contact normal, oriented from
/// B toward A.
pub fn sat_obb_obb(a: &Obb, b: &Obb) -> Option<SatContact> {
    let mut best = (f32::MAX, Vec3::ZERO);

    for i in 0..3 {
        if !test_axis(a.axes[i], a, b, &mut best) {
            return None;
        }
    }
    for i in 0..3 {
        if !test_axis(b.axes[i], a, b, &mut best) {
            return None;
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            if !test_axis(a.axes[i].cross(b.axes[j]), a, b, &mut best) {
                return None;
            }
        }
    }

    let (penetration, mut normal) = best;
    if normal.dot(a.center - b.center) < 0.0 {
        normal = -normal;
    }

    Some(SatContact {
        normal,
        penetration,
    })
}
