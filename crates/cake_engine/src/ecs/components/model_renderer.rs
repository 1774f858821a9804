//! Model renderer component

use crate::assets::{AssetHandle, MeshData};
use crate::ecs::{Component, Drawable, EntityKey};
use crate::render::{DrawList, DrawRequest};

/// Draws a pooled mesh at the owning entity's transform
///
/// Holds only a handle; the mesh is looked up in the asset pool every time
/// it is used and may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRenderer {
    model: AssetHandle<MeshData>,
}

impl ModelRenderer {
    /// Render the mesh behind `model`
    pub fn new(model: AssetHandle<MeshData>) -> Self {
        Self { model }
    }

    /// Handle of the mesh to draw
    pub fn model(&self) -> &AssetHandle<MeshData> {
        &self.model
    }
}

impl Component for ModelRenderer {
    fn as_drawable(&self) -> Option<&dyn Drawable> {
        Some(self)
    }
}

impl Drawable for ModelRenderer {
    fn draw(&self, owner: EntityKey, list: &mut DrawList) {
        list.push(DrawRequest {
            entity: owner,
            model: self.model.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Manager;

    #[test]
    fn test_draw_pushes_request_for_owner() {
        let mut manager = Manager::new();
        let entity = manager.add_entity();
        entity.add_component(ModelRenderer::new(AssetHandle::new("cube")));
        let key = entity.key();

        let mut list = DrawList::new();
        manager.draw(&mut list);

        let request = list.find(key).expect("model renderer emits a request");
        assert_eq!(request.model.key(), "cube");
        assert_eq!(list.len(), 1);
    }
}
