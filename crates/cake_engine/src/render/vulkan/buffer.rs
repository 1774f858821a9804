//! Buffer management for vertex data and uniforms
//!
//! Plain device-memory-per-buffer allocation. The engine creates few
//! buffers (two per model, one uniform buffer per renderable and frame), so
//! there is no sub-allocator.

use ash::{vk, Device};
use bytemuck::Pod;

use crate::render::vulkan::{CommandPool, VulkanContext, VulkanError, VulkanResult};

/// Buffer with its own memory allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind fresh memory with `properties`
    pub fn new(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory = find_memory_type(&context.memory_properties(), requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // From here on Drop releases both handles
        let created = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe {
            created
                .device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        Ok(created)
    }

    /// Copy `data` into host-visible memory
    pub fn write_bytes(&self, data: &[u8]) -> VulkanResult<()> {
        if data.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes into a {} byte buffer", data.len(), self.size),
            });
        }
        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Host-coherent buffer that stays mapped for its whole life
pub struct MappedBuffer {
    buffer: Buffer,
    ptr: *mut u8,
}

impl MappedBuffer {
    /// Create and map a buffer of `size` bytes
    pub fn new(context: &VulkanContext, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            context,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let ptr = unsafe {
            buffer
                .device
                .map_memory(buffer.memory, 0, size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        Ok(Self {
            buffer,
            ptr: ptr.cast(),
        })
    }

    /// Overwrite the start of the buffer with `value`
    ///
    /// The caller must ensure no GPU work reading this buffer is in flight.
    pub fn write<T: Pod>(&mut self, value: &T) -> VulkanResult<()> {
        let bytes = bytemuck::bytes_of(value);
        if bytes.len() as vk::DeviceSize > self.buffer.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes into a {} byte buffer", bytes.len(), self.buffer.size),
            });
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr, bytes.len());
        }
        Ok(())
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.buffer.device.unmap_memory(self.buffer.memory);
        }
    }
}

/// Create a device-local buffer filled with `data` through a staging copy
pub fn upload_device_local(
    context: &VulkanContext,
    pool: &CommandPool,
    data: &[u8],
    usage: vk::BufferUsageFlags,
) -> VulkanResult<Buffer> {
    let size = data.len() as vk::DeviceSize;
    let staging = Buffer::new(
        context,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    staging.write_bytes(data)?;

    let buffer = Buffer::new(
        context,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    pool.submit_once(context.graphics_queue(), |device, cmd| {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe { device.cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), &[region]) };
    })?;

    Ok(buffer)
}

/// Index of the first memory type allowed by `type_filter` with all `properties`
pub fn find_memory_type(
    memory: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..memory.memory_type_count)
        .find(|&i| {
            type_filter & (1 << i) != 0 && memory.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        props
    }

    #[test]
    fn test_memory_type_respects_filter_and_flags() {
        let props = memory(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let coherent = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        assert_eq!(find_memory_type(&props, 0b111, coherent).ok(), Some(2));
        assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE).ok(), Some(1));
        assert!(matches!(
            find_memory_type(&props, 0b011, coherent),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
