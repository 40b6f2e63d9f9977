use std::sync::{Arc, Mutex};
use ash::vk;
use color_eyre::eyre::{OptionExt, Result};
use color_eyre::eyre::eyre;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator},
    MemoryLocation,
};
use crate::renderer::host::GpuBuffer;
use crate::renderer::shader_data::DeviceAddress;

pub struct Buffer {
    pub buffer: vk::Buffer,
    pub size: u64,
    device_address: DeviceAddress,

    allocation: Option<Allocation>,
    memory_allocator: Arc<Mutex<Allocator>>,
    device: Arc<ash::Device>,
}

impl Buffer {
    pub fn new(
        size: u64,
        usage: vk::BufferUsageFlags,
        name: &str,
        mem_loc: MemoryLocation,
        mem_allocator: Arc<Mutex<Allocator>>,
        device: Arc<ash::Device>,
    ) -> Result<Self> {
        let buffer = {
            let buffer_info = vk::BufferCreateInfo {
                size,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                ..Default::default()
            };
            unsafe { device.create_buffer(&buffer_info, None)? }
        };

        let requirements = unsafe {
            device.get_buffer_memory_requirements(buffer)
        };
        let allocation = mem_allocator
            .lock()
            .map_err(|e| eyre!(e.to_string()))
            .and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name,
                        requirements,
                        location: mem_loc,
                        linear: true,
                        allocation_scheme: AllocationScheme::DedicatedBuffer(buffer),
                    })
                    .map_err(Into::into)
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e.wrap_err(format!("Failed to allocate {}", name)));
            }
        };

        let mut buf = Self {
            buffer,
            size,
            device_address: DeviceAddress::NULL,

            allocation: Some(allocation),
            memory_allocator: mem_allocator,
            device,
        };

        if let Some(allocation) = buf.allocation.as_ref() {
            unsafe {
                buf.device.bind_buffer_memory(
                    buffer,
                    allocation.memory(),
                    allocation.offset(),
                )?;
            }
        }

        if usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS) {
            let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            buf.device_address = DeviceAddress::from_raw(unsafe {
                buf.device.get_buffer_device_address(&info)
            });
        }

        Ok(buf)
    }

    /// Copy `data` into host-visible memory at `start_offset` bytes
    pub fn write<T>(
        &mut self,
        data: &[T],
        start_offset: usize,
    ) -> Result<presser::CopyRecord>
    where
        T: Copy,
    {
        let allocation = self
            .allocation
            .as_mut()
            .ok_or_eyre("Buffer has no memory")?;
        Ok(presser::copy_from_slice_to_offset(
            data,
            allocation,
            start_offset,
        )?)
    }
}

impl GpuBuffer for Buffer {
    fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn device_address(&self) -> DeviceAddress {
        self.device_address
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                match self.memory_allocator.lock() {
                    Ok(mut allocator) => {
                        if let Err(e) = allocator.free(allocation) {
                            log::error!("Failed to free buffer memory: {}", e);
                        }
                    }
                    Err(e) => log::error!("Memory allocator poisoned: {}", e),
                }
            }
            self.device.destroy_buffer(self.buffer, None);
        }
    }
}
