//! Window management using GLFW
//!
//! Provides window creation and event handling for Vulkan rendering. Key
//! events are forwarded into a [`KeyboardState`]; close and resize are
//! reported through [`WindowEvents`].

use thiserror::Error;

use crate::config::WindowConfig;
use crate::input::{KeyEventQueue, KeyboardState};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// Window creation failed
    #[error("Window creation failed")]
    CreationFailed,

    /// Other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// What happened during one event poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowEvents {
    /// The framebuffer changed size
    pub resized: bool,
    /// The user asked to close the window
    pub close_requested: bool,
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    deferred_keys: KeyEventQueue,
}

impl Window {
    /// Create a window without a client API, ready for a Vulkan surface
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::InitializationFailed("Vulkan is not supported".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);
        Ok(Self {
            glfw,
            window,
            events,
            deferred_keys: KeyEventQueue::new(),
        })
    }

    /// Whether the window has been asked to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Ask the window to close at the end of this iteration
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Poll events, feeding key presses into `keyboard`
    ///
    /// Key events that arrived while the window was minimised are applied
    /// first.
    pub fn poll_events(&mut self, keyboard: &mut KeyboardState) -> WindowEvents {
        self.deferred_keys.replay_into(keyboard);
        self.glfw.poll_events();
        self.drain_events(Some(keyboard))
    }

    /// Block until the framebuffer has a non-zero size
    ///
    /// Used while the window is minimised. Key events are queued for the
    /// next [`Window::poll_events`].
    pub fn wait_for_visible_framebuffer(&mut self) -> (u32, u32) {
        loop {
            let size = self.framebuffer_size();
            if (size.0 > 0 && size.1 > 0) || self.should_close() {
                return size;
            }
            self.glfw.wait_events();
            self.drain_events(None);
        }
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }

    fn drain_events(&mut self, mut keyboard: Option<&mut KeyboardState>) -> WindowEvents {
        let mut summary = WindowEvents::default();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(key, _, action, _) => {
                    match keyboard.as_deref_mut() {
                        Some(keyboard) => keyboard.handle_event(key, action),
                        None => self.deferred_keys.push(key, action),
                    }
                }
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {}x{}", width, height);
                    summary.resized = true;
                }
                glfw::WindowEvent::Close => summary.close_requested = true,
                _ => {}
            }
        }
        summary
    }
}
