pub mod config;
pub mod contexts;
pub mod debug_printf;
pub mod host;
pub mod resources;
pub mod sample;
pub mod shader_data;
#[cfg(test)]
pub mod testing;

use std::sync::Arc;
use ash::vk;
use color_eyre::eyre::OptionExt;
use color_eyre::Result;
use glam::Vec2;
use winit::window::Window;
use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::recorder::AshRecorder;
use crate::renderer::contexts::device_ctx::target::window_extent;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::frame_ctx::{PointerState, CLEAR_COLOR};
use crate::renderer::contexts::pipeline_ctx::ShaderSource;
use crate::renderer::debug_printf::SampleLog;
use crate::renderer::host::RenderHost;
use crate::renderer::resources::image::{blit_image_to_image, transition_image_layout};
use crate::renderer::sample::ShaderPrintfSample;

/// Shader prints kept for display
const PRINT_HISTORY: usize = 64;

/// The G-buffer covers the whole window
const VIEWPORT_ORIGIN: Vec2 = Vec2::ZERO;

pub struct Renderer {
    // Field order is drop order: sample objects and sync objects go before the device
    sample: ShaderPrintfSample<RenderDeviceContext>,
    frame_sync: FrameSync,
    dev: RenderDeviceContext,

    log: Arc<SampleLog>,
    resize_requested: bool,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        config: &RenderConfig,
    ) -> Result<Self> {
        let log = Arc::new(SampleLog::new(PRINT_HISTORY));
        let dev = RenderDeviceContext::new(window, config, log.clone())?;
        let shader = ShaderSource::load(&config.shader_dir, &config.shader)?;

        let frame_sync = FrameSync::new(
            dev.device.logical.clone(),
            dev.device.graphics_queue.family_index,
            dev.target.swapchain.images.len(),
        )?;

        let mut sample = ShaderPrintfSample::new(shader);
        sample.on_attach(&dev)?;
        let extent = dev.target.extent();
        if extent.width > 0 && extent.height > 0 {
            sample.on_resize(&dev, extent.width, extent.height)?;
        }

        Ok(Self {
            sample,
            frame_sync,
            dev,
            log,
            resize_requested: false,
        })
    }

    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    pub fn window(&self) -> &Window {
        &self.dev.target.window
    }

    pub fn printf_enabled(&self) -> bool {
        self.dev.instance.printf_enabled()
    }

    /// Latest line the shader printed, if any
    pub fn last_print(&self) -> Option<String> {
        self.log.last().map(|line| line.text)
    }

    /// Render and present one frame. Returns `false` when nothing was
    /// presented, e.g. while the window is minimized.
    pub fn draw(&mut self, pointer: &PointerState) -> Result<bool> {
        if self.resize_requested && !self.resize()? {
            return Ok(false);
        }

        let device = self.dev.device.logical.clone();
        let sync = &self.frame_sync;
        unsafe {
            device.wait_for_fences(&[sync.in_flight], true, u64::MAX)?;
        }

        let swapchain = &self.dev.target.swapchain;
        let Some(image_index) = swapchain.acquire_next_image(sync.image_available)? else {
            self.resize_requested = true;
            return Ok(false);
        };
        let swapchain_image = *swapchain
            .images
            .get(image_index as usize)
            .ok_or_eyre("Swapchain returned an unknown image index")?;
        let render_finished = *sync
            .render_finished
            .get(image_index as usize)
            .ok_or_eyre("No semaphore for swapchain image")?;
        let swapchain_extent = swapchain.extent;

        let cmd = sync.command_buffer;
        unsafe {
            device.reset_fences(&[sync.in_flight])?;
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &begin_info)?;
        }

        let mut recorder = AshRecorder::new(&device, cmd);
        let drawn = self.sample.on_render(&mut recorder, pointer, VIEWPORT_ORIGIN)?;

        transition_image_layout(
            cmd,
            swapchain_image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &device,
        );
        match self.sample.display_handle().filter(|_| drawn) {
            Some(handle) => {
                transition_image_layout(
                    cmd,
                    handle.image,
                    vk::ImageAspectFlags::COLOR,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    &device,
                );
                blit_image_to_image(
                    cmd,
                    handle.image,
                    swapchain_image,
                    handle.extent,
                    swapchain_extent,
                    &device,
                );
            }
            None => unsafe {
                device.cmd_clear_color_image(
                    cmd,
                    swapchain_image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &vk::ClearColorValue { float32: CLEAR_COLOR },
                    &[vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    }],
                );
            },
        }
        transition_image_layout(
            cmd,
            swapchain_image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
            &device,
        );

        unsafe {
            device.end_command_buffer(cmd)?;
        }

        let wait_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(sync.image_available)
            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
        let signal_infos = [vk::SemaphoreSubmitInfo::default()
            .semaphore(render_finished)
            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
        let cmd_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(cmd)];
        let submit = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&wait_infos)
            .signal_semaphore_infos(&signal_infos)
            .command_buffer_infos(&cmd_infos);
        let queue = self.dev.device.graphics_queue.handle;
        unsafe {
            device.queue_submit2(queue, &[submit], sync.in_flight)?;
        }

        if self.dev.target.swapchain.present(queue, image_index, render_finished)? {
            self.resize_requested = true;
        }
        Ok(true)
    }

    /// Rebuild the swapchain and the G-buffer for the current window size.
    /// Returns `false` while the window has no area.
    fn resize(&mut self) -> Result<bool> {
        let size = window_extent(&self.dev.target.window);
        if size.width == 0 || size.height == 0 {
            log::trace!("Window has no area, postponing resize");
            return Ok(false);
        }
        self.resize_requested = false;

        self.dev.resize_target()?;
        self.frame_sync
            .ensure_render_finished(self.dev.target.swapchain.images.len())?;

        let extent = self.dev.target.extent();
        self.sample.on_resize(&self.dev, extent.width, extent.height)?;
        log::debug!("Resized to {}x{}", extent.width, extent.height);
        Ok(true)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.dev.wait_device_idle() {
            log::error!("Failed to wait for device idle: {:?}", e);
        }
        if let Err(e) = self.sample.on_detach(&self.dev) {
            log::error!("Failed to detach sample: {:?}", e);
        }
    }
}

/// Synchronization for the single frame in flight
struct FrameSync {
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    in_flight: vk::Fence,
    image_available: vk::Semaphore,
    // One per swapchain image, since presentation may still hold the last one
    render_finished: Vec<vk::Semaphore>,

    device: Arc<ash::Device>,
}

impl FrameSync {
    fn new(
        device: Arc<ash::Device>,
        family_index: u32,
        image_count: usize,
    ) -> Result<Self> {
        // Every member starts null so a partially built value can be dropped
        let mut sync = Self {
            command_pool: vk::CommandPool::null(),
            command_buffer: vk::CommandBuffer::null(),
            in_flight: vk::Fence::null(),
            image_available: vk::Semaphore::null(),
            render_finished: Vec::new(),
            device,
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(family_index)
            // Allow the pool to reset individual command buffers
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        sync.command_pool = unsafe { sync.device.create_command_pool(&pool_info, None)? };

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(sync.command_pool)
            .command_buffer_count(1)
            .level(vk::CommandBufferLevel::PRIMARY);
        sync.command_buffer = unsafe {
            sync.device
                .allocate_command_buffers(&alloc_info)?
                .into_iter()
                .next()
                .ok_or_eyre("No frame command buffer allocated")?
        };

        // Signaled so the first frame does not wait forever
        let fence_info = vk::FenceCreateInfo::default()
            .flags(vk::FenceCreateFlags::SIGNALED);
        sync.in_flight = unsafe { sync.device.create_fence(&fence_info, None)? };
        sync.image_available = unsafe {
            sync.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?
        };
        sync.ensure_render_finished(image_count)?;

        Ok(sync)
    }

    /// Match the semaphore count to the swapchain. The device must be idle.
    fn ensure_render_finished(&mut self, image_count: usize) -> Result<()> {
        if self.render_finished.len() == image_count {
            return Ok(());
        }
        self.destroy_render_finished();
        for _ in 0..image_count {
            let semaphore = unsafe {
                self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?
            };
            self.render_finished.push(semaphore);
        }
        Ok(())
    }

    fn destroy_render_finished(&mut self) {
        for semaphore in self.render_finished.drain(..) {
            unsafe { self.device.destroy_semaphore(semaphore, None) };
        }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        self.destroy_render_finished();
        unsafe {
            self.device.destroy_semaphore(self.image_available, None);
            self.device.destroy_fence(self.in_flight, None);
            // Frees the command buffer as well
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
