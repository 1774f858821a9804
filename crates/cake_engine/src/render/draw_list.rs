//! Draw requests collected from the ECS draw pass

use crate::assets::{AssetHandle, MeshData};
use crate::ecs::EntityKey;

/// One entity asking for a mesh to be drawn this frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRequest {
    /// Entity whose transform and pipeline are used
    pub entity: EntityKey,
    /// Mesh to draw
    pub model: AssetHandle<MeshData>,
}

/// Per-frame list of draw requests
///
/// Cleared and refilled every loop iteration by `Manager::draw`.
#[derive(Debug, Default)]
pub struct DrawList {
    requests: Vec<DrawRequest>,
}

impl DrawList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request
    pub fn push(&mut self, request: DrawRequest) {
        self.requests.push(request);
    }

    /// First request made by `entity`
    pub fn find(&self, entity: EntityKey) -> Option<&DrawRequest> {
        self.requests.iter().find(|request| request.entity == entity)
    }

    /// Requests in submission order
    pub fn iter(&self) -> std::slice::Iter<'_, DrawRequest> {
        self.requests.iter()
    }

    /// Number of requests
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no requests were made
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Remove all requests, keeping the allocation
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
