//! Texture renderer component

use crate::assets::{AssetHandle, ImageData};
use crate::ecs::Component;

/// Selects the pooled image sampled by the owning entity's pipeline
///
/// Entities without one are drawn with a plain white texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRenderer {
    texture: AssetHandle<ImageData>,
}

impl TextureRenderer {
    /// Sample the image behind `texture`
    pub fn new(texture: AssetHandle<ImageData>) -> Self {
        Self { texture }
    }

    /// Handle of the image to sample
    pub fn texture(&self) -> &AssetHandle<ImageData> {
        &self.texture
    }
}

impl Component for TextureRenderer {}
