//! Per-renderable graphics pipeline
//!
//! Each renderable gets its own pipeline together with its descriptor layout,
//! descriptor pool and per-frame uniform buffers. Viewport and scissor are
//! dynamic so pipelines survive a swapchain resize.

use std::mem::{offset_of, size_of};

use ash::{vk, Device};
use bytemuck::Pod;

use crate::assets::{ShaderCode, Vertex};
use crate::render::frame::FrameSlot;
use crate::render::vulkan::descriptor::{DescriptorLayout, FrameDescriptors};
use crate::render::vulkan::shader::ShaderModule;
use crate::render::vulkan::texture::Texture;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Minimum fraction of samples shaded when sample shading is on
pub const MIN_SAMPLE_SHADING: f32 = 0.2;

/// Multisample state a pipeline is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisampleSettings {
    /// Rasterization samples, matching the render pass
    pub samples: vk::SampleCountFlags,
    /// Shade every sample instead of every pixel
    pub sample_shading: bool,
}

/// Vertex buffer binding for [`Vertex`]
pub fn vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// Attribute locations 0..=3: position, color, texture coordinate, normal
pub fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
    let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
        binding: 0,
        location,
        format,
        offset: offset as u32,
    };
    [
        attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, pos)),
        attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
        attribute(2, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, tex_coord)),
        attribute(3, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
    ]
}

/// Graphics pipeline plus the descriptor state it reads
pub struct Pipeline {
    // Descriptors drop before the layout they were allocated against
    descriptors: FrameDescriptors,
    descriptor_layout: DescriptorLayout,
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl Pipeline {
    /// Build a pipeline for `render_pass` sampling `texture`
    ///
    /// `uniform_size` is the size of the per-frame uniform block.
    pub fn new(
        context: &VulkanContext,
        render_pass: vk::RenderPass,
        shaders: &ShaderCode,
        texture: &Texture,
        multisample: MultisampleSettings,
        uniform_size: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let descriptor_layout = DescriptorLayout::new(device.clone())?;
        let descriptors = FrameDescriptors::new(context, &descriptor_layout, texture, uniform_size)?;

        let set_layouts = [descriptor_layout.handle()];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };

        let pipeline = match create_graphics_pipeline(&device, render_pass, layout, shaders, multisample) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(e);
            }
        };

        Ok(Self {
            descriptors,
            descriptor_layout,
            device,
            pipeline,
            layout,
        })
    }

    /// Write this frame's uniform block
    pub fn update_uniform<T: Pod>(&mut self, slot: &FrameSlot, value: &T) -> VulkanResult<()> {
        self.descriptors.write_uniform(slot, value)
    }

    /// Bind the pipeline and the descriptor set of `slot`
    pub fn bind(&self, command_buffer: vk::CommandBuffer, slot: &FrameSlot) {
        let sets = [self.descriptors.set(slot)];
        unsafe {
            self.device
                .cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &sets,
                &[],
            );
        }
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Descriptor set layout this pipeline was built with
    pub fn descriptor_layout(&self) -> &DescriptorLayout {
        &self.descriptor_layout
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

fn create_graphics_pipeline(
    device: &Device,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    shaders: &ShaderCode,
    multisample: MultisampleSettings,
) -> VulkanResult<vk::Pipeline> {
    // Modules are only needed until the pipeline exists
    let vertex_shader = ShaderModule::from_words(device.clone(), &shaders.vertex)?;
    let fragment_shader = ShaderModule::from_words(device.clone(), &shaders.fragment)?;
    let stages = [
        vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
        fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
    ];

    let bindings = [vertex_binding()];
    let attributes = vertex_attributes();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewport_count(1)
        .scissor_count(1);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .rasterization_samples(multisample.samples)
        .sample_shading_enable(multisample.sample_shading)
        .min_sample_shading(if multisample.sample_shading { MIN_SAMPLE_SHADING } else { 0.0 });

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)
        .build()];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
            .map_err(|(_, err)| VulkanError::Api(err))?
    };
    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| VulkanError::InitializationFailed("driver returned no pipeline".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        assert_eq!(vertex_binding().stride, 44);

        let attributes = vertex_attributes();
        let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);

        let locations: Vec<u32> = attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
        assert_eq!(attributes[2].format, vk::Format::R32G32_SFLOAT);
    }
}
