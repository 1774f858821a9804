//! Descriptor layout and per-renderable descriptor sets
//!
//! Every renderable owns one layout, one pool sized for
//! [`MAX_FRAMES_IN_FLIGHT`] sets and one persistently mapped uniform buffer
//! per frame in flight. Binding 0 is the uniform buffer for the vertex stage,
//! binding 1 the combined image sampler for the fragment stage.

use ash::{vk, Device};
use bytemuck::Pod;

use crate::render::frame::{FrameSlot, MAX_FRAMES_IN_FLIGHT};
use crate::render::vulkan::buffer::MappedBuffer;
use crate::render::vulkan::texture::Texture;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Binding slot of the uniform buffer
pub const UNIFORM_BINDING: u32 = 0;
/// Binding slot of the texture sampler
pub const SAMPLER_BINDING: u32 = 1;

/// Layout bindings shared by every renderable
pub fn layout_bindings() -> [vk::DescriptorSetLayoutBinding; 2] {
    [
        vk::DescriptorSetLayoutBinding::builder()
            .binding(UNIFORM_BINDING)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .build(),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(SAMPLER_BINDING)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build(),
    ]
}

/// Pool sizes for `sets` descriptor sets of [`layout_bindings`]
pub fn pool_sizes(sets: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: sets,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: sets,
        },
    ]
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorLayout {
    /// Create the uniform-plus-sampler layout
    pub fn new(device: Device) -> VulkanResult<Self> {
        let bindings = layout_bindings();
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { device, layout })
    }

    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Per-frame descriptor sets and their uniform buffers
pub struct FrameDescriptors {
    device: Device,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    uniforms: Vec<MappedBuffer>,
}

impl FrameDescriptors {
    /// Allocate one set per frame in flight, each pointing at its own
    /// `uniform_size`-byte buffer and at `texture`
    pub fn new(
        context: &VulkanContext,
        layout: &DescriptorLayout,
        texture: &Texture,
        uniform_size: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let frames = MAX_FRAMES_IN_FLIGHT as u32;

        let sizes = pool_sizes(frames);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(frames)
            .pool_sizes(&sizes);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None).map_err(VulkanError::Api)? };

        let mut descriptors = Self {
            device,
            pool,
            sets: Vec::new(),
            uniforms: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
        };

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            descriptors
                .uniforms
                .push(MappedBuffer::new(context, uniform_size, vk::BufferUsageFlags::UNIFORM_BUFFER)?);
        }

        let layouts = [layout.handle(); MAX_FRAMES_IN_FLIGHT];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        descriptors.sets = unsafe {
            descriptors
                .device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        descriptors.write_sets(texture);
        Ok(descriptors)
    }

    fn write_sets(&self, texture: &Texture) {
        // The info arrays must outlive the update call
        let buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = self
            .uniforms
            .iter()
            .map(|uniform| {
                [vk::DescriptorBufferInfo {
                    buffer: uniform.handle(),
                    offset: 0,
                    range: uniform.size(),
                }]
            })
            .collect();
        let image_info = [vk::DescriptorImageInfo {
            sampler: texture.sampler(),
            image_view: texture.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];

        let writes: Vec<vk::WriteDescriptorSet> = self
            .sets
            .iter()
            .zip(&buffer_infos)
            .flat_map(|(&set, buffer_info)| {
                [
                    vk::WriteDescriptorSet::builder()
                        .dst_set(set)
                        .dst_binding(UNIFORM_BINDING)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(buffer_info)
                        .build(),
                    vk::WriteDescriptorSet::builder()
                        .dst_set(set)
                        .dst_binding(SAMPLER_BINDING)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(&image_info)
                        .build(),
                ]
            })
            .collect();

        unsafe {
            self.device.update_descriptor_sets(&writes, &[]);
        }
    }

    /// Overwrite the uniform buffer of `slot`
    ///
    /// Holding the slot token proves the GPU is done with this buffer.
    pub fn write_uniform<T: Pod>(&mut self, slot: &FrameSlot, value: &T) -> VulkanResult<()> {
        self.uniforms[slot.index()].write(value)
    }

    /// Descriptor set for `slot`
    pub fn set(&self, slot: &FrameSlot) -> vk::DescriptorSet {
        self.sets[slot.index()]
    }
}

impl Drop for FrameDescriptors {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its sets
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stages_per_binding() {
        let bindings = layout_bindings();
        assert_eq!(bindings[0].binding, UNIFORM_BINDING);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);
        assert_eq!(bindings[1].binding, SAMPLER_BINDING);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_pool_covers_every_frame() {
        let sizes = pool_sizes(MAX_FRAMES_IN_FLIGHT as u32);
        assert!(sizes.iter().all(|size| size.descriptor_count == MAX_FRAMES_IN_FLIGHT as u32));
    }
}
