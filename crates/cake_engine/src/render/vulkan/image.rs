//! Images, image views and render-target attachments

use ash::{vk, Device};

use crate::render::vulkan::buffer::find_memory_type;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// First candidate usable as an optimal-tiling depth attachment
pub fn choose_depth_format(properties: impl Fn(vk::Format) -> vk::FormatProperties) -> VulkanResult<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|&format| {
            properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| VulkanError::UnsupportedFormat("no supported depth attachment format".to_string()))
}

/// Whether the depth format carries a stencil component
pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(format, vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT)
}

/// Create a 2D view over `mip_levels` levels of `image`
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
    mip_levels: u32,
) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None).map_err(VulkanError::Api) }
}

/// Parameters for [`Image::new`]
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Size of level 0
    pub extent: vk::Extent2D,
    /// Texel format
    pub format: vk::Format,
    /// Number of mip levels
    pub mip_levels: u32,
    /// Samples per texel
    pub samples: vk::SampleCountFlags,
    /// Usage flags
    pub usage: vk::ImageUsageFlags,
    /// Aspect of the created view
    pub aspect: vk::ImageAspectFlags,
}

/// Device-local image with its own memory and one view
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    desc: ImageDesc,
}

impl Image {
    /// Create an optimal-tiling image, bind memory and create its view
    pub fn new(context: &VulkanContext, desc: ImageDesc) -> VulkanResult<Self> {
        let device = context.device().clone();
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .format(desc.format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(desc.samples);

        let image = unsafe { device.create_image(&create_info, None).map_err(VulkanError::Api)? };
        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let memory = find_memory_type(
            &context.memory_properties(),
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .and_then(|memory_type_index| {
            let alloc_info = vk::MemoryAllocateInfo::builder()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);
            unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
        });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut created = Self {
            device,
            image,
            memory,
            view: vk::ImageView::null(),
            desc,
        };
        unsafe {
            created
                .device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        created.view = create_image_view(&created.device, image, desc.format, desc.aspect, desc.mip_levels)?;
        Ok(created)
    }

    /// Transient multisampled color target
    pub fn color_attachment(
        context: &VulkanContext,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        Self::new(
            context,
            ImageDesc {
                extent,
                format,
                mip_levels: 1,
                samples,
                usage: vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )
    }

    /// Depth target
    pub fn depth_attachment(
        context: &VulkanContext,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        Self::new(
            context,
            ImageDesc {
                extent,
                format,
                mip_levels: 1,
                samples,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                aspect: vk::ImageAspectFlags::DEPTH,
            },
        )
    }

    /// Get the image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Get the view handle
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Creation parameters
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supports(formats: &'static [vk::Format]) -> impl Fn(vk::Format) -> vk::FormatProperties {
        move |format| vk::FormatProperties {
            optimal_tiling_features: if formats.contains(&format) {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::FormatFeatureFlags::empty()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_depth_format_prefers_d32() {
        let all = &[
            vk::Format::D24_UNORM_S8_UINT,
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
        ];
        assert_eq!(choose_depth_format(supports(all)).ok(), Some(vk::Format::D32_SFLOAT));
    }

    #[test]
    fn test_depth_format_falls_back_in_order() {
        assert_eq!(
            choose_depth_format(supports(&[vk::Format::D24_UNORM_S8_UINT])).ok(),
            Some(vk::Format::D24_UNORM_S8_UINT)
        );
        assert!(has_stencil_component(vk::Format::D24_UNORM_S8_UINT));
        assert!(!has_stencil_component(vk::Format::D32_SFLOAT));
    }

    #[test]
    fn test_no_depth_format_is_an_error() {
        assert!(matches!(
            choose_depth_format(supports(&[])),
            Err(VulkanError::UnsupportedFormat(_))
        ));
    }
}
