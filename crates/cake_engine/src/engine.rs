//! Engine and main loop

use thiserror::Error;

use crate::application::{AppError, Application, EngineContext};
use crate::assets::{AssetError, AssetPool};
use crate::config::{ConfigError, EngineConfig};
use crate::ecs::{Manager, UpdateContext};
use crate::foundation::time::{FpsCounter, FrameLimiter, FrameTimer};
use crate::input::{Key, KeyboardState};
use crate::render::vulkan::{VulkanError, Window, WindowError};
use crate::render::{DrawList, Renderer, SettingChange};

/// Modifier held for the developer key binds
pub const DEV_MODIFIER: Key = Key::LeftControl;

/// Developer key binds and the setting each one changes
pub const DEV_BINDS: [(Key, SettingChange); 3] = [
    (Key::F1, SettingChange::CycleMipmaps),
    (Key::F2, SettingChange::CycleMsaa),
    (Key::F3, SettingChange::ToggleSampleShading),
];

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window setup failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Graphics API failure
    #[error("Vulkan error: {0}")]
    Render(#[from] VulkanError),

    /// Asset loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration could not be read
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The application returned an error
    #[error("Application error: {0}")]
    Application(#[from] AppError),
}

/// Main engine struct
///
/// Owns the window, the entity store, the asset pool and the renderer, and
/// drives the main loop.
pub struct Engine {
    // The renderer holds the surface and must drop before the window
    renderer: Renderer,
    manager: Manager,
    assets: AssetPool,
    keyboard: KeyboardState,
    draw_list: DrawList,
    timer: FrameTimer,
    limiter: FrameLimiter,
    fps: FpsCounter,
    window: Window,
}

impl Engine {
    /// Create the window and every subsystem
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");

        let mut window = Window::new(&config.window)?;
        let assets = AssetPool::new(config.assets.clone());
        let manager = Manager::new();
        let renderer = Renderer::new(&mut window, &config.window.title, &config.renderer)?;
        let keyboard = KeyboardState::new();

        Ok(Self {
            renderer,
            manager,
            assets,
            keyboard,
            draw_list: DrawList::new(),
            timer: FrameTimer::new(),
            limiter: FrameLimiter::new(config.limits.max_fps),
            fps: FpsCounter::new(config.limits.fps_log_interval),
            window,
        })
    }

    /// Run `app` until the window closes
    pub fn run<A: Application>(&mut self, app: &mut A) -> Result<(), EngineError> {
        log_dev_binds();
        app.initialize(&mut self.context())?;

        log::info!("Starting main loop...");
        let result = self.main_loop(app);

        self.renderer.wait_idle()?;
        app.cleanup(&mut self.context());
        log::info!("Engine shutdown complete");
        result
    }

    fn main_loop<A: Application>(&mut self, app: &mut A) -> Result<(), EngineError> {
        while !self.window.should_close() {
            let elapsed = self.timer.tick();
            self.fps.advance(elapsed);
            let Some(delta_time) = self.limiter.accumulate(elapsed) else {
                continue;
            };

            let events = self.window.poll_events(&mut self.keyboard);
            if events.resized {
                self.renderer.set_resize_pending();
            }
            if events.close_requested {
                break;
            }

            self.handle_dev_binds()?;
            app.update(&mut self.context(), delta_time)?;

            self.manager.update(&UpdateContext {
                delta_time,
                keyboard: &self.keyboard,
            });
            self.draw_list.clear();
            self.manager.draw(&mut self.draw_list);
            self.renderer
                .draw_frame(&mut self.manager, &self.draw_list, &self.assets, &mut self.window)?;
            self.fps.frame();

            if !self.manager.refresh().is_empty() {
                self.renderer.prune_bindings(&self.manager)?;
            }
            self.keyboard.update();
        }
        Ok(())
    }

    fn handle_dev_binds(&mut self) -> Result<(), EngineError> {
        if self.keyboard.is_key_down(Key::Escape) {
            log::info!("Escape pressed, closing");
            self.window.set_should_close(true);
        }
        for (key, change) in DEV_BINDS {
            if self.keyboard.is_bind_down(DEV_MODIFIER, key) {
                self.renderer
                    .apply_setting(change, &self.manager, &self.assets, &mut self.window)?;
            }
        }
        Ok(())
    }

    fn context(&mut self) -> EngineContext<'_> {
        EngineContext {
            manager: &mut self.manager,
            assets: &mut self.assets,
            renderer: &mut self.renderer,
            keyboard: &self.keyboard,
            window: &mut self.window,
        }
    }

    /// Entity store
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Frames counted in the last FPS interval
    pub fn last_fps(&self) -> u32 {
        self.fps.last_fps()
    }
}

fn log_dev_binds() {
    log::info!("Developer key binds:");
    log::info!("  Ctrl+F1  cycle mipmap mode");
    log::info!("  Ctrl+F2  cycle MSAA level");
    log::info!("  Ctrl+F3  toggle sample shading");
    log::info!("  Escape   close");
}
