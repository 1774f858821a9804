//! SPIR-V shader code

use std::path::Path;

use crate::assets::AssetError;

/// Vertex and fragment SPIR-V for one shader program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCode {
    /// Vertex stage words
    pub vertex: Vec<u32>,
    /// Fragment stage words
    pub fragment: Vec<u32>,
}

impl ShaderCode {
    /// Read both stages from compiled `.spv` files
    pub fn from_files<P: AsRef<Path>>(vertex: P, fragment: P) -> Result<Self, AssetError> {
        Ok(Self {
            vertex: read_spirv_file(vertex.as_ref())?,
            fragment: read_spirv_file(fragment.as_ref())?,
        })
    }
}

/// Read a SPIR-V binary from disk
pub fn read_spirv_file(path: &Path) -> Result<Vec<u32>, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("Read {} bytes of SPIR-V from {:?}", bytes.len(), path);
    spirv_words(&bytes, &path.display().to_string())
}

/// Reinterpret SPIR-V bytes as words
///
/// The length must be a non-zero multiple of four.
pub fn spirv_words(bytes: &[u8], source: &str) -> Result<Vec<u32>, AssetError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(AssetError::InvalidData {
            path: source.to_string(),
            reason: format!("SPIR-V length {} is not a multiple of 4", bytes.len()),
        });
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}
