//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the handful of projection helpers the
//! renderer needs. Projections use a right-handed view space with
//! zero-to-one clip depth.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Right-handed perspective projection mapping depth to `[0, 1]`
    ///
    /// # Arguments
    /// * `fov_y` - Vertical field of view in radians
    /// * `aspect` - Viewport width divided by height
    /// * `near` - Distance to the near plane (must be > 0)
    /// * `far` - Distance to the far plane (must be > near)
    fn perspective_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Inverse-transpose of the upper 3x3 block, used to transform normals
    ///
    /// Falls back to identity when the block is singular (zero scale).
    fn normal_matrix(&self) -> Mat3;
}

impl Mat4Ext for Mat4 {
    fn perspective_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = -(far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn normal_matrix(&self) -> Mat3 {
        let upper: Mat3 = self.fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map_or_else(Mat3::identity, |inverse| inverse.transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_zo(utils::deg_to_rad(60.0), 4.0 / 3.0, 0.1, 10.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10.0, 1.0);

        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let eye = Vec3::new(3.0, 3.0, 3.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::z());
        let transformed = view.transform_point(&Point3::from(eye));

        assert_relative_eq!(transformed.coords, Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_inverse_scale() {
        let model = Mat4::new_scaling(2.0);
        assert_relative_eq!(model.normal_matrix(), Mat3::identity() * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_normal_matrix_of_singular_model_is_identity() {
        let model = Mat4::new_scaling(0.0);
        assert_relative_eq!(model.normal_matrix(), Mat3::identity());
    }
}
