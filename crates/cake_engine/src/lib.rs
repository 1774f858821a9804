//! # Cake Engine
//!
//! A small Vulkan renderer driven by an entity-component store.
//!
//! ## Features
//!
//! - **ECS**: entities own their components; components opt into per-frame
//!   update and draw through capability traits
//! - **Frames in flight**: fence-guarded frame slots with swapchain
//!   recreation on resize or stale presents
//! - **Per-renderable pipelines**: one pipeline, descriptor pool and uniform
//!   buffer set per renderable entity
//! - **Runtime settings**: mipmapping, MSAA and sample shading can be
//!   changed while running
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cake_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, ctx: &mut EngineContext<'_>) -> Result<(), AppError> {
//!         let camera = ctx.manager.add_entity();
//!         camera.add_component(PerspectiveCamera::default());
//!         let key = camera.key();
//!         ctx.set_camera(key);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     cake_engine::foundation::logging::init();
//!     let mut engine = Engine::new(EngineConfig::default())?;
//!     engine.run(&mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod ecs;
pub mod foundation;
pub mod input;
pub mod render;

mod application;
mod engine;

pub use application::{AppError, Application, EngineContext};
pub use engine::{Engine, EngineError, DEV_BINDS, DEV_MODIFIER};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetHandle, AssetPool, ImageData, MeshData, ShaderCode},
        config::{Config, EngineConfig},
        ecs::{
            components::{ModelRenderer, PerspectiveCamera, TextureRenderer, Transform},
            Component, Drawable, Entity, EntityKey, Manager, UpdateContext, Updatable,
        },
        foundation::math::{Mat4, Vec3},
        input::{Key, KeyboardState},
        render::{MipmapMode, MsaaLevel, Renderer, SettingChange},
        AppError, Application, Engine, EngineContext, EngineError,
    };
}
