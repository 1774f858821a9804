//! Transform component
//!
//! Position, non-uniform scale and Euler rotation in degrees. The model
//! matrix composes as translation * scale * rotation.

use crate::ecs::Component;
use crate::foundation::math::{utils, Mat3, Mat4, Mat4Ext, Quat, Vec3};

/// Spatial transform of an entity in world space
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vec3,
    scale: Vec3,
    /// Euler angles in degrees, each kept inside [-360, 360]
    rotation: Vec3,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::zeros())
    }
}

impl Transform {
    /// Create a transform at `position` with unit scale and no rotation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::zeros(),
        }
    }

    /// Builder pattern: Set scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: Set rotation in degrees
    pub fn with_rotation(mut self, degrees: Vec3) -> Self {
        self.set_rotation(degrees);
        self
    }

    /// Move by `translation`
    pub fn translate(&mut self, translation: Vec3) {
        self.position += translation;
    }

    /// Rotate by the given Euler angles in degrees
    ///
    /// An axis that would leave [-360, 360] is brought back by one turn.
    pub fn rotate(&mut self, degrees: Vec3) {
        self.rotation.x = wrap_degrees(self.rotation.x, degrees.x);
        self.rotation.y = wrap_degrees(self.rotation.y, degrees.y);
        self.rotation.z = wrap_degrees(self.rotation.z, degrees.z);
    }

    /// Grow the scale by `delta` on each axis
    pub fn scale_by(&mut self, delta: Vec3) {
        self.scale += delta;
    }

    /// World position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Set world position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Scale factors
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set scale factors
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Euler rotation in degrees
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Set Euler rotation in degrees
    pub fn set_rotation(&mut self, degrees: Vec3) {
        self.rotation = Vec3::zeros();
        self.rotate(degrees);
    }

    /// Translation matrix
    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
    }

    /// Scale matrix
    pub fn scale_matrix(&self) -> Mat4 {
        Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Rotation matrix built from a quaternion of the Euler angles
    pub fn rotation_matrix(&self) -> Mat4 {
        Quat::from_euler_angles(
            utils::deg_to_rad(self.rotation.x),
            utils::deg_to_rad(self.rotation.y),
            utils::deg_to_rad(self.rotation.z),
        )
        .to_homogeneous()
    }

    /// Model matrix (translation * scale * rotation)
    pub fn model_matrix(&self) -> Mat4 {
        self.translation_matrix() * self.scale_matrix() * self.rotation_matrix()
    }

    /// Matrix for transforming normals into world space
    pub fn normal_matrix(&self) -> Mat3 {
        self.model_matrix().normal_matrix()
    }
}

fn wrap_degrees(current: f32, delta: f32) -> f32 {
    let next = current + delta;
    if next > 360.0 {
        next - 360.0
    } else if next < -360.0 {
        next + 360.0
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_default_is_identity() {
        let transform = Transform::default();
        assert_relative_eq!(transform.model_matrix(), Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(transform.normal_matrix(), Mat3::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_translate_accumulates() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        transform.translate(Vec3::new(1.0, -2.0, 0.5));
        assert_relative_eq!(transform.position(), Vec3::new(2.0, 0.0, 3.5), epsilon = EPSILON);
    }

    #[test]
    fn test_rotate_wraps_each_axis_independently() {
        let mut transform = Transform::default().with_rotation(Vec3::new(350.0, -350.0, 10.0));
        transform.rotate(Vec3::new(20.0, -20.0, 5.0));

        assert_relative_eq!(transform.rotation(), Vec3::new(10.0, -10.0, 15.0), epsilon = 1e-4);
    }

    #[test]
    fn test_scale_by_adds_to_scale() {
        let mut transform = Transform::default();
        transform.scale_by(Vec3::new(1.0, 0.5, 0.0));
        assert_relative_eq!(transform.scale(), Vec3::new(2.0, 1.5, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_model_matrix_applies_rotation_then_scale_then_translation() {
        let transform = Transform::from_position(Vec3::new(10.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0))
            .with_rotation(Vec3::new(0.0, 0.0, 90.0));

        // +X rotates onto +Y, doubles, then shifts along X
        let point = transform.model_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(point, Vec4::new(10.0, 2.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let transform = Transform::default().with_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = transform.normal_matrix() * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(normal, Vec3::new(0.5, 0.0, 0.0), epsilon = EPSILON);
    }
}
