//! Application trait and lifecycle management

use thiserror::Error;

use crate::assets::{AssetError, AssetHandle, AssetPool, ShaderCode};
use crate::ecs::{EntityKey, Manager};
use crate::input::KeyboardState;
use crate::render::vulkan::{VulkanError, Window};
use crate::render::Renderer;

/// Everything an application may touch during a callback
///
/// Borrowed from the engine for the duration of one call.
pub struct EngineContext<'a> {
    /// Entity store
    pub manager: &'a mut Manager,
    /// Loaded assets
    pub assets: &'a mut AssetPool,
    /// Renderer
    pub renderer: &'a mut Renderer,
    /// Keyboard state for this loop iteration
    pub keyboard: &'a KeyboardState,
    /// Window
    pub window: &'a mut Window,
}

impl EngineContext<'_> {
    /// Make `entity` renderable with `shader`
    pub fn add_renderable(&mut self, entity: EntityKey, shader: AssetHandle<ShaderCode>) -> Result<(), AppError> {
        self.renderer
            .add_renderable(self.manager, self.assets, entity, shader)
            .map_err(AppError::from)
    }

    /// Use `entity` as the camera
    pub fn set_camera(&mut self, entity: EntityKey) {
        self.renderer.set_camera(entity);
    }

    /// End the main loop after the current iteration
    pub fn quit(&mut self) {
        log::info!("Application requested shutdown");
        self.window.set_should_close(true);
    }
}

/// Application lifecycle trait
///
/// Implement this trait to drive the engine. There is no global engine
/// instance; every callback receives the pieces it may use.
pub trait Application {
    /// Build entities, load assets, register renderables and pick the camera
    fn initialize(&mut self, ctx: &mut EngineContext<'_>) -> Result<(), AppError>;

    /// Per-frame application logic, run before the ECS update
    fn update(&mut self, _ctx: &mut EngineContext<'_>, _delta_time: f32) -> Result<(), AppError> {
        Ok(())
    }

    /// Called once after the main loop ends and the GPU is idle
    fn cleanup(&mut self, _ctx: &mut EngineContext<'_>) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Asset loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Renderer rejected a request
    #[error("Render error: {0}")]
    Render(#[from] VulkanError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
