//! Per-renderable uniform block
//!
//! Packed from the entity's transform and the designated camera once per
//! frame, then written into the frame slot's mapped uniform buffer.

use bytemuck::{Pod, Zeroable};

use crate::ecs::components::{PerspectiveCamera, Transform};
use crate::foundation::math::{Mat3, Mat4};

/// Uniform block layout shared with the vertex shader
///
/// Four column-major `mat4`s at 64-byte offsets, which matches std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    /// Object to world
    pub model: [[f32; 4]; 4],
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to clip, Y flipped for Vulkan
    pub proj: [[f32; 4]; 4],
    /// Inverse-transpose of the model's upper 3x3, padded to 4x4
    pub normal: [[f32; 4]; 4],
}

impl UniformBufferObject {
    /// Pack the block for an entity
    ///
    /// Without a transform the entity sits at the origin unscaled.
    pub fn pack(transform: Option<&Transform>, camera: &PerspectiveCamera) -> Self {
        let (model, normal) = transform.map_or_else(
            || (Mat4::identity(), Mat3::identity()),
            |transform| (transform.model_matrix(), transform.normal_matrix()),
        );

        let mut proj = camera.projection_matrix();
        proj[(1, 1)] *= -1.0;

        Self {
            model: model.into(),
            view: camera.view_matrix().into(),
            proj: proj.into(),
            normal: normal.to_homogeneous().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_block_is_four_matrices() {
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 256);
    }

    #[test]
    fn test_pack_without_transform_uses_identity() {
        let camera = PerspectiveCamera::default();
        let ubo = UniformBufferObject::pack(None, &camera);

        assert_eq!(Mat4::from(ubo.model), Mat4::identity());
        assert_eq!(Mat4::from(ubo.normal), Mat4::identity());
    }

    #[test]
    fn test_pack_flips_projection_y() {
        let camera = PerspectiveCamera::default();
        let ubo = UniformBufferObject::pack(None, &camera);
        let proj = Mat4::from(ubo.proj);
        let expected = camera.projection_matrix();

        assert_relative_eq!(proj[(1, 1)], -expected[(1, 1)]);
        assert_relative_eq!(proj[(0, 0)], expected[(0, 0)]);
        assert_relative_eq!(Mat4::from(ubo.view), camera.view_matrix());
    }

    #[test]
    fn test_pack_uses_transform() {
        let camera = PerspectiveCamera::default();
        let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).with_scale(Vec3::new(2.0, 2.0, 2.0));
        let ubo = UniformBufferObject::pack(Some(&transform), &camera);

        let model = Mat4::from(ubo.model);
        assert_relative_eq!(model, transform.model_matrix());
        assert_relative_eq!(model[(0, 3)], 1.0);
        assert_relative_eq!(model[(2, 3)], 3.0);

        let normal = Mat4::from(ubo.normal);
        assert_relative_eq!(normal[(0, 0)], 0.5);
        assert_relative_eq!(normal[(3, 3)], 1.0);
    }
}
