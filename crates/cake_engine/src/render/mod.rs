//! Rendering
//!
//! The ECS draw pass fills a [`DrawList`]. The [`Renderer`] walks its
//! renderable bindings in order, packs each entity's uniform block into the
//! current frame slot and records one draw per requested entity.

pub mod binding;
pub mod draw_list;
pub mod frame;
pub mod renderer;
pub mod settings;
pub mod ubo;
pub mod vulkan;

pub use binding::{RenderBindings, Renderable};
pub use draw_list::{DrawList, DrawRequest};
pub use frame::{FrameScheduler, FrameSlot, SyncState, MAX_FRAMES_IN_FLIGHT};
pub use renderer::Renderer;
pub use settings::{GraphicsSettings, MipmapMode, MsaaLevel, SettingChange};
pub use ubo::UniformBufferObject;
