//! Keyed asset pool
//!
//! Each asset kind lives in its own [`AssetCache`] keyed by a caller-chosen
//! string. Loading under a key that already exists is a no-op that returns
//! the existing handle, so files are read at most once per key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::assets::{AssetError, AssetHandle, ImageData, MeshData, ObjLoader, ShaderCode};
use crate::config::AssetConfig;

/// String-keyed storage for one asset type
#[derive(Debug)]
pub struct AssetCache<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> AssetCache<T> {
    /// Resolve a handle
    pub fn get(&self, handle: &AssetHandle<T>) -> Option<&T> {
        self.entries.get(handle.key())
    }

    /// Whether `key` is stored
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored assets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load into `key` unless the key is taken
    ///
    /// `load` only runs for a new key.
    fn get_or_load(
        &mut self,
        kind: &str,
        key: &str,
        load: impl FnOnce() -> Result<T, AssetError>,
    ) -> Result<AssetHandle<T>, AssetError> {
        if self.entries.contains_key(key) {
            log::warn!("{kind} '{key}' is already loaded; keeping the existing entry");
        } else {
            let value = load()?;
            self.entries.insert(key.to_string(), value);
            log::debug!("Added {kind} '{key}'");
        }
        Ok(AssetHandle::new(key))
    }

    fn insert(&mut self, kind: &str, key: &str, value: T) -> AssetHandle<T> {
        if self.entries.contains_key(key) {
            log::warn!("{kind} '{key}' is already loaded; keeping the existing entry");
        } else {
            self.entries.insert(key.to_string(), value);
            log::debug!("Inserted {kind} '{key}'");
        }
        AssetHandle::new(key)
    }
}

/// All assets loaded by the application
#[derive(Debug, Default)]
pub struct AssetPool {
    config: AssetConfig,
    shaders: AssetCache<ShaderCode>,
    meshes: AssetCache<MeshData>,
    images: AssetCache<ImageData>,
    loaded_paths: HashMap<PathBuf, String>,
}

impl AssetPool {
    /// Empty pool resolving relative paths against `config`'s directories
    pub fn new(config: AssetConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Load a vertex/fragment SPIR-V pair under `key`
    pub fn add_shader(
        &mut self,
        key: &str,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<AssetHandle<ShaderCode>, AssetError> {
        let vertex = self.config.shader_dir.join(vertex);
        let fragment = self.config.shader_dir.join(fragment);
        if !self.shaders.contains(key) {
            self.note_path(&vertex, key);
            self.note_path(&fragment, key);
        }
        self.shaders
            .get_or_load("Shader", key, || ShaderCode::from_files(&vertex, &fragment))
    }

    /// Load an OBJ model under `key`
    pub fn add_mesh(&mut self, key: &str, path: impl AsRef<Path>) -> Result<AssetHandle<MeshData>, AssetError> {
        let path = self.config.model_dir.join(path);
        if !self.meshes.contains(key) {
            self.note_path(&path, key);
        }
        self.meshes.get_or_load("Model", key, || ObjLoader::load(&path))
    }

    /// Load an image under `key`
    pub fn add_texture(&mut self, key: &str, path: impl AsRef<Path>) -> Result<AssetHandle<ImageData>, AssetError> {
        let path = self.config.texture_dir.join(path);
        if !self.images.contains(key) {
            self.note_path(&path, key);
        }
        self.images.get_or_load("Texture", key, || ImageData::from_file(&path))
    }

    /// Store in-memory shader code under `key`
    pub fn insert_shader(&mut self, key: &str, code: ShaderCode) -> AssetHandle<ShaderCode> {
        self.shaders.insert("Shader", key, code)
    }

    /// Store an in-memory mesh under `key`
    ///
    /// Meshes that cannot be drawn are rejected here rather than at upload.
    pub fn insert_mesh(&mut self, key: &str, mesh: MeshData) -> Result<AssetHandle<MeshData>, AssetError> {
        mesh.validate(key)?;
        Ok(self.meshes.insert("Model", key, mesh))
    }

    /// Store in-memory pixels under `key`
    pub fn insert_texture(&mut self, key: &str, image: ImageData) -> AssetHandle<ImageData> {
        self.images.insert("Texture", key, image)
    }

    /// Resolve a shader handle
    pub fn shader(&self, handle: &AssetHandle<ShaderCode>) -> Option<&ShaderCode> {
        self.shaders.get(handle)
    }

    /// Resolve a mesh handle
    pub fn mesh(&self, handle: &AssetHandle<MeshData>) -> Option<&MeshData> {
        self.meshes.get(handle)
    }

    /// Resolve a texture handle
    pub fn texture(&self, handle: &AssetHandle<ImageData>) -> Option<&ImageData> {
        self.images.get(handle)
    }

    /// Shader cache
    pub fn shaders(&self) -> &AssetCache<ShaderCode> {
        &self.shaders
    }

    /// Mesh cache
    pub fn meshes(&self) -> &AssetCache<MeshData> {
        &self.meshes
    }

    /// Texture cache
    pub fn textures(&self) -> &AssetCache<ImageData> {
        &self.images
    }

    fn note_path(&mut self, path: &Path, key: &str) {
        if let Some(previous) = self.loaded_paths.get(path) {
            if cfg!(debug_assertions) && previous != key {
                log::warn!("{:?} is already loaded as '{}'; loading it again as '{}'", path, previous, key);
            }
        } else {
            self.loaded_paths.insert(path.to_path_buf(), key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn temp_obj(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cake_engine_{}_{}.obj", name, std::process::id()));
        std::fs::write(&path, TRIANGLE).expect("write temp obj");
        path
    }

    #[test]
    fn test_adding_same_key_twice_loads_once() {
        let path = temp_obj("twice");
        let mut pool = AssetPool::default();

        let first = pool.add_mesh("triangle", &path).expect("first load");
        std::fs::remove_file(&path).expect("remove temp obj");

        // the file is gone, so a second read would fail
        let second = pool.add_mesh("triangle", &path).expect("cached");

        assert_eq!(first, second);
        assert_eq!(pool.meshes().len(), 1);
        assert_eq!(pool.mesh(&first).map(MeshData::index_count), Some(3));
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let mut pool = AssetPool::default();
        let handle = pool.insert_texture("white", ImageData::solid_color(1, 1, [255; 4]));
        pool.insert_texture("white", ImageData::solid_color(2, 2, [0; 4]));

        assert_eq!(pool.textures().len(), 1);
        assert_eq!(pool.texture(&handle).map(|image| image.width), Some(1));
    }

    #[test]
    fn test_missing_handle_resolves_to_none() {
        let pool = AssetPool::default();
        assert!(pool.mesh(&AssetHandle::new("nothing")).is_none());
    }

    #[test]
    fn test_same_path_under_two_keys_loads_both() {
        let path = temp_obj("two_keys");
        let mut pool = AssetPool::default();

        pool.add_mesh("a", &path).expect("load a");
        pool.add_mesh("b", &path).expect("load b");
        std::fs::remove_file(&path).expect("remove temp obj");

        assert_eq!(pool.meshes().len(), 2);
    }

    #[test]
    fn test_empty_mesh_is_rejected_on_insert() {
        let mut pool = AssetPool::default();
        let result = pool.insert_mesh("empty", MeshData::default());

        assert!(matches!(result, Err(AssetError::InvalidData { .. })));
        assert!(!pool.meshes().contains("empty"));
        assert!(pool.mesh(&AssetHandle::new("empty")).is_none());

        let quad = pool.insert_mesh("quad", MeshData::quad()).expect("quad is drawable");
        assert_eq!(pool.mesh(&quad).map(MeshData::index_count), Some(6));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut pool = AssetPool::default();
        let result = pool.add_mesh("ghost", "/definitely/not/here.obj");
        assert!(matches!(result, Err(AssetError::Io { .. })));
        assert!(pool.meshes().is_empty());
    }
}
