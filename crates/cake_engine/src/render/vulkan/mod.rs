//! Vulkan backend
//!
//! RAII wrappers over the ash objects the renderer needs. Every wrapper
//! destroys its handle on drop; owners order their fields so dependents drop
//! first.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod frame_sync;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use buffer::{Buffer, MappedBuffer};
pub use commands::CommandPool;
pub use context::{PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanResult};
pub use frame_sync::{FrameSynchronizer, FrameTarget};
pub use model::GpuModel;
pub use pipeline::{MultisampleSettings, Pipeline};
pub use texture::Texture;
pub use window::{Window, WindowError, WindowEvents, WindowResult};
