//! Sampled textures with optional mip chains

use ash::{vk, Device};

use crate::assets::ImageData;
use crate::render::settings::MipmapMode;
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::image::{Image, ImageDesc};
use crate::render::vulkan::{CommandPool, VulkanContext, VulkanError, VulkanResult};

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Image, view and sampler for one pooled texture
pub struct Texture {
    image: Image,
    sampler: vk::Sampler,
    device: Device,
}

impl Texture {
    /// Upload `data` and build its sampler for `mipmaps`
    ///
    /// With mipmapping on, the full chain is generated by linear blits, which
    /// requires the format to support linear filtering.
    pub fn upload(
        context: &VulkanContext,
        pool: &CommandPool,
        data: &ImageData,
        mipmaps: MipmapMode,
    ) -> VulkanResult<Self> {
        if data.width == 0 || data.height == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "texture has zero size".to_string(),
            });
        }

        let mip_levels = if mipmaps.is_enabled() { data.full_mip_levels() } else { 1 };
        if mip_levels > 1 {
            let features = context.format_properties(TEXTURE_FORMAT).optimal_tiling_features;
            if !features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR) {
                return Err(VulkanError::UnsupportedFormat(format!(
                    "{TEXTURE_FORMAT:?} does not support linear blitting"
                )));
            }
        }

        let extent = vk::Extent2D {
            width: data.width,
            height: data.height,
        };
        let image = Image::new(
            context,
            ImageDesc {
                extent,
                format: TEXTURE_FORMAT,
                mip_levels,
                samples: vk::SampleCountFlags::TYPE_1,
                usage: vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )?;

        let staging = Buffer::new(
            context,
            data.pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_bytes(&data.pixels)?;

        pool.submit_once(context.graphics_queue(), |device, cmd| {
            record_upload(device, cmd, staging.handle(), image.handle(), extent, mip_levels);
        })?;

        let device = context.device().clone();
        let sampler = create_sampler(&device, context, mipmaps, mip_levels)?;
        log::debug!(
            "Uploaded texture {}x{} with {} mip levels ({:?})",
            data.width,
            data.height,
            mip_levels,
            mipmaps
        );

        Ok(Self { image, sampler, device })
    }

    /// Image view covering all mip levels
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Sampler handle
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Number of mip levels
    pub fn mip_levels(&self) -> u32 {
        self.image.desc().mip_levels
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

fn create_sampler(
    device: &Device,
    context: &VulkanContext,
    mipmaps: MipmapMode,
    mip_levels: u32,
) -> VulkanResult<vk::Sampler> {
    let physical = context.physical_device();
    let anisotropy = physical.supports_anisotropy();

    let create_info = vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(anisotropy)
        .max_anisotropy(if anisotropy {
            physical.properties.limits.max_sampler_anisotropy
        } else {
            1.0
        })
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(mipmaps.sampler_mode())
        .min_lod(0.0)
        .max_lod(mip_levels as f32)
        .mip_lod_bias(0.0);

    unsafe { device.create_sampler(&create_info, None).map_err(VulkanError::Api) }
}

fn barrier(
    image: vk::Image,
    level: u32,
    level_count: u32,
    (old_layout, src_access): (vk::ImageLayout, vk::AccessFlags),
    (new_layout, dst_access): (vk::ImageLayout, vk::AccessFlags),
) -> vk::ImageMemoryBarrier {
    vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: level,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build()
}

fn pipeline_barrier(
    device: &Device,
    cmd: vk::CommandBuffer,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
    barrier: vk::ImageMemoryBarrier,
) {
    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Copy level 0 from `staging`, blit down the chain, leave every level
/// shader-readable
fn record_upload(
    device: &Device,
    cmd: vk::CommandBuffer,
    staging: vk::Buffer,
    image: vk::Image,
    extent: vk::Extent2D,
    mip_levels: u32,
) {
    let transfer_dst = (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::AccessFlags::TRANSFER_WRITE);
    let transfer_src = (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::AccessFlags::TRANSFER_READ);
    let shader_read = (vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::AccessFlags::SHADER_READ);

    pipeline_barrier(
        device,
        cmd,
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::PipelineStageFlags::TRANSFER,
        barrier(
            image,
            0,
            mip_levels,
            (vk::ImageLayout::UNDEFINED, vk::AccessFlags::empty()),
            transfer_dst,
        ),
    );

    let region = vk::BufferImageCopy::builder()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .build();
    unsafe {
        device.cmd_copy_buffer_to_image(cmd, staging, image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &[region]);
    }

    let mut mip_width = extent.width as i32;
    let mut mip_height = extent.height as i32;

    for level in 1..mip_levels {
        pipeline_barrier(
            device,
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            barrier(image, level - 1, 1, transfer_dst, transfer_src),
        );

        let next_width = (mip_width / 2).max(1);
        let next_height = (mip_height / 2).max(1);
        let blit = vk::ImageBlit::builder()
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: mip_width,
                    y: mip_height,
                    z: 1,
                },
            ])
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: next_width,
                    y: next_height,
                    z: 1,
                },
            ])
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        unsafe {
            device.cmd_blit_image(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );
        }

        pipeline_barrier(
            device,
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            barrier(image, level - 1, 1, transfer_src, shader_read),
        );

        mip_width = next_width;
        mip_height = next_height;
    }

    pipeline_barrier(
        device,
        cmd,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        barrier(image, mip_levels - 1, 1, transfer_dst, shader_read),
    );
}
