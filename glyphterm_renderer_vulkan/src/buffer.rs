//! Host-visible GPU buffers
//!
//! The terminal renderer only ever uploads small, grid-sized payloads (cell
//! character indices, quad vertices), so every buffer lives in CpuToGpu
//! memory and is written through a persistent mapping. No staging path.

use ash::vk;
use glyphterm_engine::{term_err, term_trace, Result};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::context::VulkanContext;

/// A host-visible buffer with a persistent mapping.
pub struct HostBuffer {
    context: Arc<VulkanContext>,
    pub handle: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
}

impl HostBuffer {
    /// Create a buffer of `size` bytes in CpuToGpu memory.
    pub fn new(
        context: Arc<VulkanContext>,
        name: &str,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let handle = unsafe {
            context.device.create_buffer(&buffer_info, None).map_err(|e| {
                term_err!("glyphterm::buffer", "Failed to create buffer '{}': {:?}", name, e)
            })?
        };

        let requirements = unsafe { context.device.get_buffer_memory_requirements(handle) };

        let allocation = context
            .allocator
            .lock()
            .map_err(|e| {
                term_err!("glyphterm::buffer", "Allocator mutex poisoned: {:?}", e)
            })?
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe { context.device.destroy_buffer(handle, None) };
                term_err!(
                    "glyphterm::buffer",
                    "Failed to allocate {} bytes for '{}': {:?}",
                    size,
                    name,
                    e
                )
            })?;

        unsafe {
            context
                .device
                .bind_buffer_memory(handle, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    term_err!("glyphterm::buffer", "Failed to bind buffer memory: {:?}", e)
                })?;
        }

        term_trace!("glyphterm::buffer", "Created host buffer '{}' ({} bytes)", name, size);

        Ok(Self {
            context,
            handle,
            allocation: Some(allocation),
            size,
        })
    }

    /// Write a slice of plain-old-data values at the start of the buffer.
    pub fn write<T: bytemuck::Pod>(&mut self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(term_err!(
                "glyphterm::buffer",
                "Write of {} bytes exceeds buffer size {}",
                bytes.len(),
                self.size
            ));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            term_err!("glyphterm::buffer", "Write to buffer with freed allocation")
        })?;
        let ptr = allocation.mapped_ptr().ok_or_else(|| {
            term_err!("glyphterm::buffer", "Host buffer is not mapped")
        })?;

        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr() as *mut u8, bytes.len());
        }
        Ok(())
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut allocator) = self.context.allocator.lock() {
                allocator.free(allocation).ok();
            }
        }
        unsafe {
            self.context.device.destroy_buffer(self.handle, None);
        }
    }
}
