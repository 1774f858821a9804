//! SPIR-V shader modules

use std::ffi::CStr;

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Entry point every stage is compiled with
pub const ENTRY_POINT: &CStr = c"main";

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V words
    pub fn from_words(device: Device, words: &[u32]) -> VulkanResult<Self> {
        if words.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "empty SPIR-V module".to_string(),
            });
        }

        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Stage description using [`ENTRY_POINT`]
    pub fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
