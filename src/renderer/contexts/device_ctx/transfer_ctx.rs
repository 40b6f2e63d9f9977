use std::sync::{Arc, Mutex, PoisonError};
use ash::vk;
use color_eyre::eyre::{eyre, Result};
use crate::renderer::contexts::device_ctx::queue::Queue;
use crate::renderer::resources::buffer::Buffer;

/// One-shot command submission outside the frame loop
pub struct TransferContext {
    transfer_fence: vk::Fence,
    command_pool: vk::CommandPool,
    // Staging buffers whose copies are recorded but not yet submitted
    pending_staging: Mutex<Vec<Buffer>>,

    queue: Arc<Queue>,
    device: Arc<ash::Device>,
}

impl TransferContext {
    pub fn new(
        queue: Arc<Queue>,
        device: Arc<ash::Device>,
    ) -> Result<Self> {
        let transfer_fence_info = vk::FenceCreateInfo::default();
        let transfer_fence =
            unsafe { device.create_fence(&transfer_fence_info, None)? };

        let command_pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue.family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT);
        let command_pool = unsafe {
            match device.create_command_pool(&command_pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    device.destroy_fence(transfer_fence, None);
                    return Err(e.into());
                }
            }
        };

        Ok(Self {
            transfer_fence,
            command_pool,
            pending_staging: Mutex::new(Vec::new()),
            queue,
            device,
        })
    }

    /// Allocate a primary command buffer and begin recording it
    pub fn begin(&self) -> Result<vk::CommandBuffer> {
        let command_buffer_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .command_buffer_count(1)
            .level(vk::CommandBufferLevel::PRIMARY);
        let cmd = unsafe {
            self.device
                .allocate_command_buffers(&command_buffer_info)?
                .into_iter()
                .next()
                .ok_or_else(|| eyre!("No command buffer allocated"))?
        };

        // This command buffer will be used exactly once before being freed
        let cmd_begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(e) = unsafe { self.device.begin_command_buffer(cmd, &cmd_begin_info) } {
            unsafe { self.device.free_command_buffers(self.command_pool, &[cmd]) };
            return Err(e.into());
        }

        Ok(cmd)
    }

    /// Keep `staging` alive until the next [`TransferContext::submit_and_wait`]
    pub fn hold(&self, staging: Buffer) {
        self.pending_staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(staging);
    }

    pub fn submit_and_wait(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let result = self.submit(cmd);

        // The command buffer and staging memory are released either way
        self.release(cmd);

        result
    }

    /// Drop a command buffer that will never be submitted
    pub fn discard(&self, cmd: vk::CommandBuffer) {
        log::debug!("Discarding unsubmitted transfer command buffer");
        self.release(cmd);
    }

    fn release(&self, cmd: vk::CommandBuffer) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, &[cmd]);
        }
        let released = std::mem::take(
            &mut *self.pending_staging
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        log::trace!("Released {} staging buffers", released.len());
        drop(released);
    }

    fn submit(&self, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device.end_command_buffer(cmd)?;
        }

        let cmd = [cmd];
        let submit = vk::SubmitInfo::default()
            .command_buffers(&cmd);
        unsafe {
            self.device.queue_submit(
                self.queue.handle,
                &[submit],
                self.transfer_fence,
            )?;
            // `transfer_fence` will now block until the commands finish execution
            self.device.wait_for_fences(&[self.transfer_fence], true, u64::MAX)?;
            self.device.reset_fences(&[self.transfer_fence])?;
        }

        Ok(())
    }
}

impl Drop for TransferContext {
    fn drop(&mut self) {
        self.pending_staging
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_fence(self.transfer_fence, None);
        }
    }
}
