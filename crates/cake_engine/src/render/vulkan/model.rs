//! Meshes uploaded to device-local memory

use ash::vk;

use crate::assets::MeshData;
use crate::render::vulkan::buffer::{upload_device_local, Buffer};
use crate::render::vulkan::{CommandPool, VulkanContext, VulkanError, VulkanResult};

/// Vertex and index buffers for one mesh
pub struct GpuModel {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl GpuModel {
    /// Copy `mesh` into device-local vertex and index buffers
    pub fn upload(context: &VulkanContext, pool: &CommandPool, mesh: &MeshData) -> VulkanResult<Self> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot upload an empty mesh".to_string(),
            });
        }

        let vertex_buffer = upload_device_local(
            context,
            pool,
            bytemuck::cast_slice(&mesh.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = upload_device_local(
            context,
            pool,
            bytemuck::cast_slice(&mesh.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }

    /// Bind both buffers and issue one indexed draw
    pub fn draw(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer.handle()], &[0]);
            device.cmd_bind_index_buffer(command_buffer, self.index_buffer.handle(), 0, vk::IndexType::UINT32);
            device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        }
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
