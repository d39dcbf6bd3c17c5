//! Virtual-camera and clipping math for rendering linked portal views.

use glam::{Mat4, Vec3, Vec4};

use crate::ecs::components::transform::Transform;

/// Fixed recursion depth of the portal-in-portal view chain. Bounds the
/// otherwise-recursive transform computation.
pub const MAX_VIEW_DEPTH: u32 = 3;

/// Portal model matrix: translation and rotation only. The surface scale
/// must not leak into camera transforms.
pub fn portal_model_matrix(transform: &Transform) -> Mat4 {
    transform.isometry_matrix()
}

/// Virtual camera looking out of the linked portal: the camera is re-based
/// into this portal's local frame, yawed 180 degrees (linked portals face
/// each other), and carried into the other portal's world frame.
///
/// Returns the resulting view matrix. Rendering the scene with it, clipped
/// at the linked portal's plane, produces this portal's surface texture.
pub fn transformed_view(my: &Transform, other: &Transform, view: Mat4) -> Mat4 {
    let my_model = portal_model_matrix(my);
    let other_model = portal_model_matrix(other);
    let flip = Mat4::from_rotation_y(std::f32::consts::PI);

    let camera_transform = view.inverse();
    let dest = other_model * flip * my_model.inverse() * camera_transform;
    dest.inverse()
}

/// World-space plane of the linked portal surface, `Ax + By + Cz + D = 0`
/// with the normal along the portal's local +Z.
pub fn plane_equation(linked: &Transform) -> Vec4 {
    let normal = linked.rotation_matrix().transform_vector3(Vec3::Z).normalize();
    Vec4::new(normal.x, normal.y, normal.z, -normal.dot(linked.position))
}

/// Replace the projection's near plane with an arbitrary view-space plane
/// (Lengyel's oblique-frustum derivation): pick the clip-space corner `q` on
/// the plane's side of the frustum, scale the plane so it passes through
/// `q`, and substitute it into the matrix's third row. Geometry behind the
/// plane is clipped away.
pub fn oblique_projection(projection: Mat4, view: Mat4, world_plane: Vec4) -> Mat4 {
    // Planes transform by the inverse transpose.
    let view_plane = view.inverse().transpose() * world_plane;

    let q = projection.inverse()
        * Vec4::new(view_plane.x.signum(), view_plane.y.signum(), 1.0, 1.0);
    let c = view_plane * (2.0 / view_plane.dot(q));

    let mut oblique = projection;
    oblique.x_axis.z = c.x - oblique.x_axis.w;
    oblique.y_axis.z = c.y - oblique.y_axis.w;
    oblique.z_axis.z = c.z - oblique.z_axis.w;
    oblique.w_axis.z = c.w - oblique.w_axis.w;
    oblique
}

/// One recursion level of the portal view chain.
#[derive(Debug, Clone, Copy)]
pub struct PortalView {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Build the recursive view chain, deepest level first: the order the
/// presentation layer renders it, each level compositing the previous one
/// onto the portal surface.
pub fn view_chain(
    my: &Transform,
    other: &Transform,
    view: Mat4,
    projection: Mat4,
    depth: u32,
) -> Vec<PortalView> {
    let world_plane = plane_equation(other);

    let mut chain = Vec::with_capacity(depth as usize);
    let mut current = view;
    for _ in 0..depth {
        current = transformed_view(my, other, current);
        chain.push(PortalView {
            view: current,
            projection: oblique_projection(projection, current, world_plane),
        });
    }
    chain.reverse();
    chain
}

/// Double-buffered render-target indexing: `advance` flips the current
/// target each pass while the previous one stays readable for compositing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleBuffer {
    current: usize,
}

impl DoubleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip to the next buffer and return its index.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % 2;
        self.current
    }

    /// Index currently being rendered to.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Index holding the previous pass, safe to read while rendering.
    pub fn previous(&self) -> usize {
        (self.current + 1) % 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformed_view_places_virtual_camera_behind_link() {
        // Portal A at the origin facing +Z, portal B ten units along +X,
        // also facing +Z. A camera three units in front of A must become a
        // virtual camera three units behind B.
        let a = Transform::from_position(Vec3::ZERO);
        let b = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));

        let camera_world = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));
        let view = camera_world.inverse();

        let virtual_view = transformed_view(&a, &b, view);
        let virtual_position = virtual_view.inverse().w_axis.truncate();
        assert!((virtual_position - Vec3::new(10.0, 0.0, -3.0)).length() < 1e-4);
    }

    #[test]
    fn test_double_traversal_returns_to_start() {
        // With identical portal transforms the round trip degenerates to the
        // 180-degree flip alone.
        let p = Transform::from_position(Vec3::ZERO);
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)).inverse();
        let twice = transformed_view(&p, &p, transformed_view(&p, &p, view));
        let original = view.inverse().w_axis.truncate();
        let returned = twice.inverse().w_axis.truncate();
        assert!((original - returned).length() < 1e-4);
    }

    #[test]
    fn test_plane_equation() {
        let t = Transform::new(
            Vec3::new(0.0, 1.0, -9.8),
            Vec3::new(0.0, 90.0, 0.0),
            Vec3::ONE,
        );
        let plane = plane_equation(&t);
        let eps = 1e-5;
        // Yaw 90 carries +Z onto +X.
        assert!((plane.truncate() - Vec3::X).length() < eps);
        assert!((plane.w - 0.0).abs() < eps);
    }

    #[test]
    fn test_oblique_projection_clips_at_plane() {
        // Any world point on the clip plane must land on the near plane
        // (z/w = -1) after the oblique projection.
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);

        // Plane z = -1 facing the camera.
        let world_plane = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let oblique = oblique_projection(projection, view, world_plane);

        let on_plane = Vec3::new(0.3, -0.2, -1.0);
        let clip = oblique * view * on_plane.extend(1.0);
        assert!((clip.z / clip.w + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_chain_depth_and_order() {
        let a = Transform::from_position(Vec3::ZERO);
        let b = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::IDENTITY;

        let chain = view_chain(&a, &b, view, projection, MAX_VIEW_DEPTH);
        assert_eq!(chain.len(), MAX_VIEW_DEPTH as usize);

        // The last entry is one application of the portal transform; the
        // first is the deepest.
        let shallow = transformed_view(&a, &b, view);
        let last = chain.last().unwrap().view;
        assert!((shallow.w_axis - last.w_axis).length() < 1e-4);
    }

    #[test]
    fn test_double_buffer_flip() {
        let mut buffers = DoubleBuffer::new();
        assert_eq!(buffers.current(), 0);
        assert_eq!(buffers.advance(), 1);
        assert_eq!(buffers.previous(), 0);
        assert_eq!(buffers.advance(), 0);
        assert_eq!(buffers.previous(), 1);
    }
}
