//! Wavefront OBJ loader
//!
//! Reads `v`, `vt`, `vn` and `f` records. Polygons are fan-triangulated and
//! identical vertices are merged into a shared index buffer. Everything
//! else (materials, groups, smoothing) is ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::assets::{AssetError, MeshData, Vertex};

const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// OBJ parser
pub struct ObjLoader;

#[derive(Default)]
struct Attributes {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    unique: HashMap<[u32; 11], u32>,
}

impl MeshBuilder {
    fn push(&mut self, vertex: Vertex) -> u32 {
        let key: [u32; 11] = bytemuck::cast(vertex);
        let vertices = &mut self.vertices;
        let index = *self.unique.entry(key).or_insert_with(|| {
            vertices.push(vertex);
            u32::try_from(vertices.len() - 1).unwrap_or(u32::MAX)
        });
        index
    }
}

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshData, AssetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mesh = Self::parse(BufReader::new(file), &path.display().to_string())?;
        log::info!(
            "Loaded model {:?}: {} vertices, {} indices",
            path,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    /// Parse OBJ text; `source` names the input in error messages
    pub fn parse<R: BufRead>(reader: R, source: &str) -> Result<MeshData, AssetError> {
        let invalid = |line: usize, reason: String| AssetError::InvalidData {
            path: source.to_string(),
            reason: format!("line {line}: {reason}"),
        };

        let mut attributes = Attributes::default();
        let mut builder = MeshBuilder::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(|source_err| AssetError::Io {
                path: source.to_string(),
                source: source_err,
            })?;
            let line_number = number + 1;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => {
                    let [x, y, z] = parse_floats::<3>(&mut parts).map_err(|e| invalid(line_number, e))?;
                    attributes.positions.push([x, y, z]);
                }
                Some("vt") => {
                    let [u, v] = parse_floats::<2>(&mut parts).map_err(|e| invalid(line_number, e))?;
                    // OBJ puts v = 0 at the bottom of the image
                    attributes.tex_coords.push([u, 1.0 - v]);
                }
                Some("vn") => {
                    let [x, y, z] = parse_floats::<3>(&mut parts).map_err(|e| invalid(line_number, e))?;
                    attributes.normals.push([x, y, z]);
                }
                Some("f") => {
                    let corners = parts
                        .map(|corner| {
                            let vertex = attributes.resolve(corner)?;
                            Ok(builder.push(vertex))
                        })
                        .collect::<Result<Vec<u32>, String>>()
                        .map_err(|e| invalid(line_number, e))?;

                    if corners.len() < 3 {
                        return Err(invalid(line_number, "face has fewer than 3 vertices".to_string()));
                    }
                    for i in 1..corners.len() - 1 {
                        builder.indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if builder.indices.is_empty() {
            return Err(AssetError::InvalidData {
                path: source.to_string(),
                reason: "no faces found".to_string(),
            });
        }

        Ok(MeshData::new(builder.vertices, builder.indices))
    }
}

impl Attributes {
    fn resolve(&self, corner: &str) -> Result<Vertex, String> {
        let mut refs = corner.split('/');

        let pos = refs
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing position index in {corner:?}"))
            .and_then(|s| lookup(&self.positions, s))?;
        let tex_coord = match refs.next().filter(|s| !s.is_empty()) {
            Some(s) => lookup(&self.tex_coords, s)?,
            None => [0.0, 0.0],
        };
        let normal = match refs.next().filter(|s| !s.is_empty()) {
            Some(s) => lookup(&self.normals, s)?,
            None => DEFAULT_NORMAL,
        };

        Ok(Vertex {
            pos,
            color: DEFAULT_COLOR,
            tex_coord,
            normal,
        })
    }
}

/// Resolve a 1-based or negative relative OBJ index
fn lookup<T: Copy>(items: &[T], index: &str) -> Result<T, String> {
    let raw: i64 = index
        .parse()
        .map_err(|_| format!("invalid index {index:?}"))?;
    let len = items.len() as i64;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(len + r),
    };

    resolved
        .filter(|&i| (0..len).contains(&i))
        .and_then(|i| items.get(i as usize).copied())
        .ok_or_else(|| format!("index {raw} out of range (have {len})"))
}

fn parse_floats<const N: usize>(parts: &mut std::str::SplitWhitespace<'_>) -> Result<[f32; N], String> {
    let mut values = [0.0; N];
    for value in &mut values {
        let text = parts.next().ok_or_else(|| format!("expected {N} components"))?;
        *value = text.parse().map_err(|_| format!("invalid number {text:?}"))?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MeshData, AssetError> {
        ObjLoader::parse(text.as_bytes(), "test.obj")
    }

    #[test]
    fn test_shared_corners_are_deduplicated() {
        let mesh = parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\n\
             f 1/1 2/1 3/1\nf 1/1 3/1 4/1\n",
        )
        .expect("valid quad");

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_polygons_are_fan_triangulated() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").expect("valid quad");
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").expect("valid triangle");
        assert_eq!(mesh.vertices[2].pos, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_tex_coords_are_flipped_and_normals_read() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.25 0.25\nvn 0 1 0\nf 1/1/1 2/1/1 3/1/1\n")
            .expect("valid triangle");
        assert_eq!(mesh.vertices[0].tex_coord, [0.25, 0.75]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        assert!(matches!(
            parse("v 0 0 0\nf 1 2 3\n"),
            Err(AssetError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(parse("# nothing\n").is_err());
    }
}
