//! CPU-side mesh data

use bytemuck::{Pod, Zeroable};

use crate::assets::AssetError;

/// Vertex layout shared by every model pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub pos: [f32; 3],
    /// Vertex color, multiplied with the texture
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
    /// Object-space normal
    pub normal: [f32; 3],
}

/// Decoded vertex and index arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Build from raw arrays
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        u32::try_from(self.indices.len()).unwrap_or(u32::MAX)
    }

    /// Check the mesh can be drawn: vertices and indices present, every
    /// index in range
    pub fn validate(&self, source: &str) -> Result<(), AssetError> {
        let invalid = |reason: String| AssetError::InvalidData {
            path: source.to_string(),
            reason,
        };

        if self.vertices.is_empty() {
            return Err(invalid("mesh has no vertices".to_string()));
        }
        if self.indices.is_empty() {
            return Err(invalid("mesh has no indices".to_string()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(invalid(format!(
                "index {index} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        Ok(())
    }

    /// Unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        let white = [1.0, 1.0, 1.0];
        let normal = [0.0, 0.0, 1.0];
        let corner = |pos: [f32; 3], tex_coord: [f32; 2]| Vertex {
            pos,
            color: white,
            tex_coord,
            normal,
        };

        Self::new(
            vec![
                corner([-0.5, -0.5, 0.0], [0.0, 1.0]),
                corner([0.5, -0.5, 0.0], [1.0, 1.0]),
                corner([0.5, 0.5, 0.0], [1.0, 0.0]),
                corner([-0.5, 0.5, 0.0], [0.0, 0.0]),
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 11 * 4);
        assert_eq!(std::mem::offset_of!(Vertex, normal), 8 * 4);
    }

    #[test]
    fn test_quad_winding_is_counter_clockwise() {
        let quad = MeshData::quad();
        assert_eq!(quad.index_count(), 6);

        let [a, b, c] = [0, 1, 2].map(|i| quad.vertices[quad.indices[i] as usize].pos);
        let cross_z = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        assert!(cross_z > 0.0);
    }

    #[test]
    fn test_validate_rejects_undrawable_meshes() {
        assert!(MeshData::quad().validate("quad").is_ok());
        assert!(matches!(
            MeshData::default().validate("empty"),
            Err(AssetError::InvalidData { .. })
        ));

        let mut no_indices = MeshData::quad();
        no_indices.indices.clear();
        assert!(no_indices.validate("no indices").is_err());

        let mut out_of_range = MeshData::quad();
        out_of_range.indices.push(4);
        assert!(out_of_range.validate("out of range").is_err());
    }
}
