//! Asset loading and the keyed asset pool
//!
//! Assets are loaded once under a caller-chosen string key and looked up
//! through typed [`AssetHandle`]s. The pool is owned by the engine and
//! passed explicitly to whoever needs it.

pub mod image_loader;
pub mod mesh;
pub mod obj_loader;
pub mod pool;
pub mod shader_loader;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use thiserror::Error;

pub use image_loader::ImageData;
pub use mesh::{MeshData, Vertex};
pub use obj_loader::ObjLoader;
pub use pool::{AssetCache, AssetPool};
pub use shader_loader::ShaderCode;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to decode an asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// File contents are malformed
    #[error("Invalid data in {path}: {reason}")]
    InvalidData {
        /// File or source description
        path: String,
        /// What was wrong
        reason: String,
    },
}

/// Non-owning typed reference to a pooled asset
///
/// A handle is only a key; resolve it through the [`AssetPool`] on every use
/// and treat a miss as a normal outcome.
pub struct AssetHandle<T> {
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssetHandle<T> {
    /// Handle for the asset stored under `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            _marker: PhantomData,
        }
    }

    /// Pool key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone())
    }
}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> Hash for AssetHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetHandle<{}>({:?})", std::any::type_name::<T>(), self.key)
    }
}
