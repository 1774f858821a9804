//! Built-in components

pub mod camera;
pub mod model_renderer;
pub mod texture_renderer;
pub mod transform;

pub use camera::PerspectiveCamera;
pub use model_renderer::ModelRenderer;
pub use texture_renderer::TextureRenderer;
pub use transform::Transform;
