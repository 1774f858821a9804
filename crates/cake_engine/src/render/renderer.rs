//! Renderer
//!
//! Orchestrates the frame synchronizer and the renderable bindings. Owns the
//! GPU copies of pooled meshes and textures, keyed by the same strings the
//! [`AssetPool`] uses. Graphics-setting changes rebuild every pipeline and the
//! whole frame synchronizer from scratch.

use std::collections::HashMap;
use std::mem::size_of;

use ash::vk;

use crate::assets::{AssetHandle, AssetPool, ImageData, ShaderCode};
use crate::config::RendererConfig;
use crate::ecs::components::{PerspectiveCamera, TextureRenderer, Transform};
use crate::ecs::{EntityKey, Manager};
use crate::render::binding::{RenderBindings, Renderable};
use crate::render::frame::MAX_FRAMES_IN_FLIGHT;
use crate::render::settings::{max_usable_msaa, GraphicsSettings, MsaaLevel, SettingChange};
use crate::render::ubo::UniformBufferObject;
use crate::render::vulkan::{
    CommandPool, FrameSynchronizer, FrameTarget, GpuModel, MultisampleSettings, Pipeline, Texture, VulkanContext,
    VulkanError, VulkanResult, Window,
};
use crate::render::DrawList;

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Vulkan renderer driving one window
pub struct Renderer {
    // Field order is drop order: pipelines first, context last
    bindings: RenderBindings<Pipeline>,
    synchronizer: Option<FrameSynchronizer>,
    textures: HashMap<String, Texture>,
    default_texture: Option<Texture>,
    models: HashMap<String, GpuModel>,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    context: VulkanContext,
    camera: Option<EntityKey>,
    settings: GraphicsSettings,
    max_msaa: MsaaLevel,
    vsync: bool,
    clear_color: [f32; 4],
    resize_pending: bool,
}

impl Renderer {
    /// Set up Vulkan for `window`
    pub fn new(window: &mut Window, app_name: &str, config: &RendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, app_name, config.validation)?;
        let physical = context.physical_device();
        log::info!("Using GPU: {}", physical.name());

        let limits = &physical.properties.limits;
        let max_msaa = max_usable_msaa(
            limits.framebuffer_color_sample_counts,
            limits.framebuffer_depth_sample_counts,
            config.max_msaa,
        );
        let settings = GraphicsSettings {
            mipmaps: config.mipmaps,
            msaa: config.msaa.clamp_to(max_msaa),
            sample_shading: config.sample_shading,
        };
        if settings.msaa != config.msaa {
            log::warn!("MSAA {:?} not available, using {:?}", config.msaa, settings.msaa);
        }
        log::info!("Maximum usable MSAA: {:?}", max_msaa);

        let command_pool = CommandPool::new(context.device().clone(), physical.graphics_family)?;
        let command_buffers = command_pool.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;
        let synchronizer = FrameSynchronizer::new(&context, window, settings.msaa, config.vsync)?;
        let default_texture = Texture::upload(
            &context,
            &command_pool,
            &ImageData::solid_color(1, 1, WHITE),
            settings.mipmaps,
        )?;

        Ok(Self {
            bindings: RenderBindings::new(),
            synchronizer: Some(synchronizer),
            textures: HashMap::new(),
            default_texture: Some(default_texture),
            models: HashMap::new(),
            command_buffers,
            command_pool,
            context,
            camera: None,
            settings,
            max_msaa,
            vsync: config.vsync,
            clear_color: config.clear_color,
            resize_pending: false,
        })
    }

    /// Give `entity` its own pipeline built from `shader`
    ///
    /// The entity's texture comes from its `TextureRenderer`, or a plain
    /// white texture without one. Binding an entity twice is ignored.
    pub fn add_renderable(
        &mut self,
        manager: &Manager,
        assets: &AssetPool,
        entity: EntityKey,
        shader: AssetHandle<ShaderCode>,
    ) -> VulkanResult<()> {
        if !manager.contains(entity) {
            return Err(VulkanError::InvalidOperation {
                reason: format!("entity {entity:?} does not exist"),
            });
        }
        if self.bindings.contains(entity) {
            log::warn!("Entity {:?} is already renderable", entity);
            return Ok(());
        }

        let renderable = Renderable { entity, shader };
        let texture_key = self.ensure_texture(manager, assets, entity)?;
        let pipeline = self.create_pipeline(&renderable, texture_key.as_deref(), assets)?;
        self.bindings.bind(renderable, pipeline);
        log::debug!("Entity {:?} bound as renderable #{}", entity, self.bindings.len());
        Ok(())
    }

    /// Use `entity`'s `PerspectiveCamera` for view and projection
    pub fn set_camera(&mut self, entity: EntityKey) {
        self.camera = Some(entity);
    }

    /// Camera entity, if one was set
    pub fn camera(&self) -> Option<EntityKey> {
        self.camera
    }

    /// Request a swapchain rebuild after the next present
    pub fn set_resize_pending(&mut self) {
        self.resize_pending = true;
    }

    /// Whether a resize is waiting to be handled
    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Current graphics settings
    pub fn settings(&self) -> GraphicsSettings {
        self.settings
    }

    /// Highest MSAA level the device supports
    pub fn max_msaa(&self) -> MsaaLevel {
        self.max_msaa
    }

    /// Renderable bindings in draw order
    pub fn bindings(&self) -> &RenderBindings<Pipeline> {
        &self.bindings
    }

    /// Vulkan context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    /// Render one frame of every bound entity that asked to be drawn
    ///
    /// A stale swapchain drops the frame silently after recreating it.
    pub fn draw_frame(
        &mut self,
        manager: &mut Manager,
        draw_list: &DrawList,
        assets: &AssetPool,
        window: &mut Window,
    ) -> VulkanResult<()> {
        let extent = self.synchronizer()?.extent();
        self.sync_camera_aspect(manager, extent);

        let target = {
            let synchronizer = self.synchronizer.as_mut().ok_or_else(missing_synchronizer)?;
            match synchronizer.acquire(&self.context, window)? {
                Some(target) => target,
                None => {
                    self.resize_pending = false;
                    return Ok(());
                }
            }
        };

        self.upload_models(draw_list, assets)?;
        self.update_uniforms(manager, draw_list, &target)?;

        let command_buffer = self.command_buffers[target.slot().index()];
        self.record(command_buffer, &target, draw_list)?;

        let synchronizer = self.synchronizer.as_mut().ok_or_else(missing_synchronizer)?;
        if synchronizer.submit_and_present(&self.context, window, target, command_buffer, self.resize_pending)? {
            self.resize_pending = false;
        }
        Ok(())
    }

    /// Apply a setting change and restart if anything changed
    pub fn apply_setting(
        &mut self,
        change: SettingChange,
        manager: &Manager,
        assets: &AssetPool,
        window: &mut Window,
    ) -> VulkanResult<()> {
        let next = self.settings.apply(change, self.max_msaa);
        if next == self.settings {
            log::info!("{:?} has no effect with MSAA limited to {:?}", change, self.max_msaa);
            return Ok(());
        }

        if next.sample_shading && !self.context.physical_device().supports_sample_shading() {
            log::warn!("Sample shading is not supported by this device");
        }
        log::info!(
            "Graphics settings: mipmaps {:?}, MSAA {:?}, sample shading {}",
            next.mipmaps,
            next.msaa,
            next.sample_shading
        );
        self.settings = next;
        self.restart(manager, assets, window)
    }

    /// Tear down and rebuild every pipeline, the synchronizer and all textures
    ///
    /// Binding order is preserved. Bindings whose entity is gone are dropped.
    pub fn restart(&mut self, manager: &Manager, assets: &AssetPool, window: &mut Window) -> VulkanResult<()> {
        self.context.wait_idle()?;

        let renderables = self.bindings.clear();
        self.synchronizer = None;
        self.textures.clear();
        self.default_texture = None;

        self.synchronizer = Some(FrameSynchronizer::new(
            &self.context,
            window,
            self.settings.msaa,
            self.vsync,
        )?);
        self.default_texture = Some(Texture::upload(
            &self.context,
            &self.command_pool,
            &ImageData::solid_color(1, 1, WHITE),
            self.settings.mipmaps,
        )?);

        for renderable in renderables {
            if !manager.contains(renderable.entity) {
                continue;
            }
            let texture_key = self.ensure_texture(manager, assets, renderable.entity)?;
            let pipeline = self.create_pipeline(&renderable, texture_key.as_deref(), assets)?;
            self.bindings.bind(renderable, pipeline);
        }

        self.resize_pending = false;
        log::info!("Renderer restarted with {} renderables", self.bindings.len());
        Ok(())
    }

    /// Drop bindings of entities the manager no longer holds
    ///
    /// Waits for the device first when anything is dropped, since the GPU may
    /// still read those pipelines.
    pub fn prune_bindings(&mut self, manager: &Manager) -> VulkanResult<usize> {
        forget_removed_camera(&mut self.camera, manager);
        if self.bindings.entities().all(|entity| manager.contains(entity)) {
            return Ok(0);
        }

        self.context.wait_idle()?;
        let dropped = self.bindings.retain(|renderable| manager.contains(renderable.entity));
        log::debug!("Pruned {} renderables", dropped);
        Ok(dropped)
    }

    /// Block until the GPU is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn synchronizer(&self) -> VulkanResult<&FrameSynchronizer> {
        self.synchronizer.as_ref().ok_or_else(missing_synchronizer)
    }

    fn sync_camera_aspect(&self, manager: &mut Manager, extent: vk::Extent2D) {
        if extent.height == 0 {
            return;
        }
        let aspect = extent.width as f32 / extent.height as f32;
        let camera = self
            .camera
            .and_then(|key| manager.entity_mut(key))
            .and_then(|entity| entity.get_component_mut::<PerspectiveCamera>());
        if let Some(camera) = camera {
            if (camera.aspect_ratio() - aspect).abs() > f32::EPSILON {
                camera.set_aspect_ratio(aspect);
            }
        }
    }

    /// Upload the entity's texture if needed and return its key
    fn ensure_texture(
        &mut self,
        manager: &Manager,
        assets: &AssetPool,
        entity: EntityKey,
    ) -> VulkanResult<Option<String>> {
        let Some(handle) = manager
            .entity(entity)
            .and_then(|entity| entity.get_component::<TextureRenderer>())
            .map(|renderer| renderer.texture().clone())
        else {
            return Ok(None);
        };

        if self.textures.contains_key(handle.key()) {
            return Ok(Some(handle.key().to_string()));
        }
        let Some(data) = assets.texture(&handle) else {
            log::warn!("Texture '{}' is not loaded, using plain white", handle.key());
            return Ok(None);
        };

        let texture = Texture::upload(&self.context, &self.command_pool, data, self.settings.mipmaps)?;
        self.textures.insert(handle.key().to_string(), texture);
        Ok(Some(handle.key().to_string()))
    }

    fn create_pipeline(
        &self,
        renderable: &Renderable,
        texture_key: Option<&str>,
        assets: &AssetPool,
    ) -> VulkanResult<Pipeline> {
        let shader = assets
            .shader(&renderable.shader)
            .ok_or_else(|| VulkanError::MissingAsset(format!("shader '{}'", renderable.shader.key())))?;
        let texture = texture_key
            .and_then(|key| self.textures.get(key))
            .or(self.default_texture.as_ref())
            .ok_or_else(|| VulkanError::MissingAsset("default texture".to_string()))?;
        let synchronizer = self.synchronizer()?;

        let supports_shading = self.context.physical_device().supports_sample_shading();
        let multisample = MultisampleSettings {
            samples: self.settings.msaa.sample_count(),
            sample_shading: self.settings.sample_shading_active(supports_shading),
        };

        Pipeline::new(
            &self.context,
            synchronizer.render_pass().handle(),
            shader,
            texture,
            multisample,
            size_of::<UniformBufferObject>() as vk::DeviceSize,
        )
    }

    fn upload_models(&mut self, draw_list: &DrawList, assets: &AssetPool) -> VulkanResult<()> {
        for request in draw_list.iter() {
            let key = request.model.key();
            if self.models.contains_key(key) {
                continue;
            }
            match assets.mesh(&request.model) {
                Some(mesh) => {
                    let model = GpuModel::upload(&self.context, &self.command_pool, mesh)?;
                    log::debug!("Uploaded model '{}' ({} indices)", key, model.index_count());
                    self.models.insert(key.to_string(), model);
                }
                None => log::debug!("Model '{}' is not loaded, skipping", key),
            }
        }
        Ok(())
    }

    fn update_uniforms(&mut self, manager: &Manager, draw_list: &DrawList, target: &FrameTarget) -> VulkanResult<()> {
        let fallback;
        let camera = match self
            .camera
            .and_then(|key| manager.entity(key))
            .and_then(|entity| entity.get_component::<PerspectiveCamera>())
        {
            Some(camera) => camera,
            None => {
                fallback = PerspectiveCamera::default();
                &fallback
            }
        };

        for (renderable, pipeline) in self.bindings.iter_mut() {
            if draw_list.find(renderable.entity).is_none() {
                continue;
            }
            let transform = manager
                .entity(renderable.entity)
                .and_then(|entity| entity.get_component::<Transform>());
            let ubo = UniformBufferObject::pack(transform, camera);
            pipeline.update_uniform(target.slot(), &ubo)?;
        }
        Ok(())
    }

    fn record(&self, command_buffer: vk::CommandBuffer, target: &FrameTarget, draw_list: &DrawList) -> VulkanResult<()> {
        let device = self.context.device();
        let synchronizer = self.synchronizer()?;
        let extent = target.extent();

        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(synchronizer.render_pass().handle())
            .framebuffer(target.framebuffer())
            .render_area(render_area)
            .clear_values(&clear_values);
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            device.cmd_begin_render_pass(command_buffer, &pass_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);
        }

        for (renderable, pipeline) in self.bindings.iter() {
            let Some(model) = draw_list
                .find(renderable.entity)
                .and_then(|request| self.models.get(request.model.key()))
            else {
                continue;
            };
            pipeline.bind(command_buffer, target.slot());
            model.draw(device, command_buffer);
        }

        unsafe {
            device.cmd_end_render_pass(command_buffer);
            device.end_command_buffer(command_buffer).map_err(VulkanError::Api)
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during renderer shutdown: {}", e);
        }
    }
}

fn missing_synchronizer() -> VulkanError {
    VulkanError::InvalidOperation {
        reason: "frame synchronizer is not built".to_string(),
    }
}

/// Clear `camera` if its entity is gone; true when it was cleared
fn forget_removed_camera(camera: &mut Option<EntityKey>, manager: &Manager) -> bool {
    if camera.is_some_and(|key| !manager.contains(key)) {
        log::warn!("Camera entity was removed");
        *camera = None;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_camera_is_forgotten_without_bindings_changing() {
        let mut manager = Manager::new();
        let camera_key = manager.add_entity().key();
        let model_key = manager.add_entity().key();
        let mut bindings = RenderBindings::<()>::new();
        bindings.bind(
            Renderable {
                entity: model_key,
                shader: AssetHandle::new("basic"),
            },
            (),
        );

        if let Some(entity) = manager.entity_mut(camera_key) {
            entity.pop();
        }
        manager.refresh();

        // every bound entity is still alive, yet the camera must go
        assert!(bindings.entities().all(|entity| manager.contains(entity)));
        let mut camera = Some(camera_key);
        assert!(forget_removed_camera(&mut camera, &manager));
        assert_eq!(camera, None);
    }

    #[test]
    fn test_live_camera_is_kept() {
        let mut manager = Manager::new();
        let camera_key = manager.add_entity().key();

        let mut camera = Some(camera_key);
        assert!(!forget_removed_camera(&mut camera, &manager));
        assert_eq!(camera, Some(camera_key));

        let mut unset = None;
        assert!(!forget_removed_camera(&mut unset, &manager));
    }
}
