//! Frame synchronizer
//!
//! Owns the swapchain, the render targets that depend on its extent and the
//! per-frame-in-flight synchronization objects. Drives the
//! acquire, submit and present cycle and rebuilds everything extent-bound
//! when the surface changes.

use ash::{vk, Device};

use crate::render::frame::{
    classify_acquire, classify_present, AcquireOutcome, FrameScheduler, FrameSlot, SyncState, MAX_FRAMES_IN_FLIGHT,
};
use crate::render::settings::MsaaLevel;
use crate::render::vulkan::image::{self, Image};
use crate::render::vulkan::render_pass::{framebuffer_attachments, Framebuffer, RenderPass};
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult, Window};

/// Everything a frame needs between acquire and present
pub struct FrameTarget {
    slot: FrameSlot,
    image_index: u32,
    suboptimal: bool,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl FrameTarget {
    /// Frame-in-flight slot whose fence has been observed signaled
    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// Acquired swapchain image
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Framebuffer wrapping the acquired image
    pub fn framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    /// Render area
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

/// Attachments sized to the swapchain
struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    // Referenced by the framebuffers
    _depth: Image,
    _color: Option<Image>,
}

impl RenderTargets {
    fn new(
        context: &VulkanContext,
        swapchain: &Swapchain,
        render_pass: &RenderPass,
        depth_format: vk::Format,
    ) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let samples = render_pass.samples();

        let color = if samples == vk::SampleCountFlags::TYPE_1 {
            None
        } else {
            Some(Image::color_attachment(context, extent, swapchain.format().format, samples)?)
        };
        let depth = Image::depth_attachment(context, extent, depth_format, samples)?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                let attachments = framebuffer_attachments(view, depth.view(), color.as_ref().map(Image::view));
                Framebuffer::new(context.device().clone(), render_pass.handle(), &attachments, extent)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            _depth: depth,
            _color: color,
        })
    }
}

/// Swapchain, render targets and frame-in-flight synchronization
pub struct FrameSynchronizer {
    // Field order is drop order: targets before the pass and chain they use
    targets: Option<RenderTargets>,
    render_pass: RenderPass,
    swapchain: Swapchain,
    scheduler: FrameScheduler<FrameSync>,
    device: Device,
    depth_format: vk::Format,
    msaa: MsaaLevel,
    vsync: bool,
    state: SyncState,
}

impl FrameSynchronizer {
    /// Build the chain, render pass and targets for the window's framebuffer
    pub fn new(context: &VulkanContext, window: &mut Window, msaa: MsaaLevel, vsync: bool) -> VulkanResult<Self> {
        let framebuffer = window.wait_for_visible_framebuffer();
        let swapchain = Swapchain::new(context, framebuffer, vsync, vk::SwapchainKHR::null())?;
        let depth_format = image::choose_depth_format(|format| context.format_properties(format))?;
        let render_pass = RenderPass::new(
            context.device().clone(),
            swapchain.format().format,
            depth_format,
            msaa.sample_count(),
        )?;
        let targets = RenderTargets::new(context, &swapchain, &render_pass, depth_format)?;

        let slots = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(context.device().clone()))
            .collect::<VulkanResult<Vec<_>>>()?;
        let scheduler = FrameScheduler::new(slots)?;

        log::info!(
            "Frame synchronizer ready: {}x{}, depth {:?}, MSAA {:?}",
            swapchain.extent().width,
            swapchain.extent().height,
            depth_format,
            msaa
        );

        Ok(Self {
            targets: Some(targets),
            render_pass,
            swapchain,
            scheduler,
            device: context.device().clone(),
            depth_format,
            msaa,
            vsync,
            state: SyncState::Ready,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Render pass every pipeline must be compatible with
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Multisample level the pass was built for
    pub fn msaa(&self) -> MsaaLevel {
        self.msaa
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Wait for the current slot and acquire the next image
    ///
    /// Returns `None` when the swapchain was stale. It has been recreated and
    /// the frame must be skipped.
    pub fn acquire(&mut self, context: &VulkanContext, window: &mut Window) -> VulkanResult<Option<FrameTarget>> {
        let slot = self.scheduler.begin()?;
        let image_available = self.scheduler.slot(&slot).image_available.handle();

        let result = unsafe {
            self.swapchain
                .loader()
                .acquire_next_image(self.swapchain.handle(), u64::MAX, image_available, vk::Fence::null())
        };

        match classify_acquire(result)? {
            AcquireOutcome::Stale => {
                log::debug!("Swapchain out of date at acquire, dropping frame");
                self.state = SyncState::AcquireFailed;
                self.recreate(context, window)?;
                Ok(None)
            }
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => {
                let framebuffer = self
                    .targets
                    .as_ref()
                    .and_then(|targets| targets.framebuffers.get(image_index as usize))
                    .map(Framebuffer::handle)
                    .ok_or_else(|| VulkanError::InvalidOperation {
                        reason: format!("no framebuffer for swapchain image {image_index}"),
                    })?;
                Ok(Some(FrameTarget {
                    slot,
                    image_index,
                    suboptimal,
                    framebuffer,
                    extent: self.swapchain.extent(),
                }))
            }
        }
    }

    /// Submit `command_buffer` for `target` and present it
    ///
    /// Returns true when the swapchain was recreated afterwards.
    pub fn submit_and_present(
        &mut self,
        context: &VulkanContext,
        window: &mut Window,
        target: FrameTarget,
        command_buffer: vk::CommandBuffer,
        resize_pending: bool,
    ) -> VulkanResult<bool> {
        let sync = self.scheduler.slot(&target.slot);
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [command_buffer];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // The command buffer is fully recorded; the fence is reset only now
        let device = &self.device;
        self.scheduler.submit(&target.slot, |sync| unsafe {
            device
                .queue_submit(context.graphics_queue(), &[submit_info.build()], sync.in_flight.handle())
                .map_err(VulkanError::Api)
        })?;
        self.state = SyncState::Presenting;

        let swapchains = [self.swapchain.handle()];
        let image_indices = [target.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain
                .loader()
                .queue_present(context.present_queue(), &present_info)
        };
        let needs_recreate = classify_present(result, target.suboptimal, resize_pending)?;

        self.scheduler.advance(target.slot);
        self.state = SyncState::Ready;

        if needs_recreate {
            self.recreate(context, window)?;
        }
        Ok(needs_recreate)
    }

    /// Rebuild the swapchain and everything sized to it
    ///
    /// The render pass survives unless the surface format changed. A change
    /// of multisample level needs a new synchronizer instead.
    pub fn recreate(&mut self, context: &VulkanContext, window: &mut Window) -> VulkanResult<()> {
        self.state = SyncState::Recreating;
        context.wait_idle()?;

        let framebuffer = window.wait_for_visible_framebuffer();
        if framebuffer.0 == 0 || framebuffer.1 == 0 {
            // Closing while minimised; keep the old chain for teardown
            self.state = SyncState::Ready;
            return Ok(());
        }

        self.targets = None;
        let swapchain = Swapchain::new(context, framebuffer, self.vsync, self.swapchain.handle())?;
        self.swapchain = swapchain;

        if self.swapchain.format().format != self.render_pass.color_format() {
            self.render_pass = RenderPass::new(
                context.device().clone(),
                self.swapchain.format().format,
                self.depth_format,
                self.msaa.sample_count(),
            )?;
        }
        self.targets = Some(RenderTargets::new(
            context,
            &self.swapchain,
            &self.render_pass,
            self.depth_format,
        )?);

        log::debug!(
            "Swapchain recreated at {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        self.state = SyncState::Ready;
        Ok(())
    }
}

impl Drop for FrameSynchronizer {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
    }
}
