//! Vulkan swapchain management
//!
//! The selection rules are plain functions over the surface queries so they
//! can be checked without a device.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::vulkan::{image, VulkanContext, VulkanError, VulkanResult};

/// Pick the surface format, preferring 8-bit BGRA sRGB
///
/// Falls back to the first reported format. `None` only if the list is empty.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// Pick the present mode for the vsync setting
///
/// Mailbox with vsync, immediate without; FIFO whenever the preferred mode is
/// missing since every surface supports it.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    let preferred = if vsync {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::IMMEDIATE
    };

    if modes.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// One more image than the minimum, limited by the maximum (0 = unbounded)
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let requested = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        requested.min(caps.max_image_count)
    } else {
        requested
    }
}

/// Use the surface's extent, or clamp the framebuffer size when it is unset
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer
                .0
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: framebuffer
                .1
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// Swapchain plus one view per image
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the context's surface
    ///
    /// Pass the previous handle as `old_swapchain` when recreating.
    pub fn new(
        context: &VulkanContext,
        framebuffer: (u32, u32),
        vsync: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical = context.physical_device().device;
        let surface = context.surface();
        let surface_loader = context.surface_loader();

        let (caps, formats, modes) = unsafe {
            (
                surface_loader
                    .get_physical_device_surface_capabilities(physical, surface)
                    .map_err(VulkanError::Api)?,
                surface_loader
                    .get_physical_device_surface_formats(physical, surface)
                    .map_err(VulkanError::Api)?,
                surface_loader
                    .get_physical_device_surface_present_modes(physical, surface)
                    .map_err(VulkanError::Api)?,
            )
        };

        let format = choose_surface_format(&formats)
            .ok_or_else(|| VulkanError::UnsupportedFormat("surface reports no formats".to_string()))?;
        let present_mode = choose_present_mode(&modes, vsync);
        let extent = choose_extent(&caps, framebuffer);
        let image_count = choose_image_count(&caps);

        let physical_info = context.physical_device();
        let families = [physical_info.graphics_family, physical_info.present_family];
        let concurrent = families[0] != families[1];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);
        create_info = if concurrent {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let device = context.device().clone();
        let loader = context.swapchain_loader().clone();
        let swapchain = unsafe { loader.create_swapchain(&create_info, None).map_err(VulkanError::Api)? };

        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(e));
            }
        };

        // Own the handle before creating views so a failure below cleans up
        let mut chain = Self {
            device,
            loader,
            swapchain,
            images,
            image_views: Vec::new(),
            format,
            extent,
        };
        for &image in &chain.images {
            let view = image::create_image_view(&chain.device, image, format.format, vk::ImageAspectFlags::COLOR, 1)?;
            chain.image_views.push(view);
        }

        log::debug!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            chain.images.len(),
            format.format,
            present_mode
        );
        Ok(chain)
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }

    /// Number of presentable images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 2048,
            },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn test_surface_format_prefers_bgra_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[1]));
    }

    #[test]
    fn test_surface_format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode_follows_vsync() {
        let all = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(choose_present_mode(&all, true), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&all, false), vk::PresentModeKHR::IMMEDIATE);

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&fifo_only, true), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&fifo_only, false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_image_count_is_clamped() {
        assert_eq!(choose_image_count(&caps(2, 8)), 3);
        assert_eq!(choose_image_count(&caps(3, 3)), 3);
        assert_eq!(choose_image_count(&caps(2, 0)), 3);
    }

    #[test]
    fn test_extent_clamps_only_when_surface_leaves_it_open() {
        let open = caps(2, 0);
        assert_eq!(
            choose_extent(&open, (8000, 600)),
            vk::Extent2D {
                width: 4096,
                height: 600
            }
        );

        let fixed = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 640,
                height: 480,
            },
            ..open
        };
        assert_eq!(
            choose_extent(&fixed, (8000, 600)),
            vk::Extent2D {
                width: 640,
                height: 480
            }
        );
    }
}
