pub mod device;
pub mod instance;
pub mod queue;
pub mod recorder;
pub mod swapchain;
pub mod target;
pub mod transfer_ctx;

use std::sync::Arc;
use ash::vk;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use gpu_allocator::MemoryLocation;
use winit::window::Window;
use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::device_ctx::instance::RenderInstance;
use crate::renderer::contexts::device_ctx::target::RenderTarget;
use crate::renderer::debug_printf::LogSink;
use crate::renderer::host::{GraphicsPipelineDesc, ImageCreateInfo, RenderHost};
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::image::Image;
use crate::renderer::resources::pipeline::GraphicsPipeline;

/// Responsibilities:
/// - Manage the Vulkan instance, device, queue and presentation target
/// - Create GPU resources and submit one-shot command buffers for the sample
pub struct RenderDeviceContext {
    // Dropped in declaration order: swapchain and surface, device, instance
    pub target: RenderTarget,
    pub device: RenderDevice,
    pub instance: RenderInstance,
}

impl RenderDeviceContext {
    pub fn new(
        window: Arc<Window>,
        config: &RenderConfig,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let instance = RenderInstance::new(
            &window,
            Some(config.printf_settings()),
            !config.printf_optional,
            sink,
        )?;
        let surface = instance.create_surface(&window)?;
        let device = RenderDevice::new(&instance, &surface)?;
        let target = RenderTarget::new(window, surface, config.vsync(), &instance, &device)?;

        Ok(Self {
            target,
            device,
            instance,
        })
    }

    /// Recreate the swapchain after the window changed size
    pub fn resize_target(&mut self) -> Result<()> {
        self.device.wait_idle()?;
        self.target.resize(&self.instance, &self.device)
    }
}

impl RenderHost for RenderDeviceContext {
    type Image = Image;
    type Buffer = Buffer;
    type Pipeline = GraphicsPipeline;

    fn supports_depth_format(&self, format: vk::Format) -> bool {
        self.device
            .format_features(format)
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    }

    fn create_image(&self, info: &ImageCreateInfo) -> Result<Image> {
        Image::new(
            info,
            self.device.memory_allocator(),
            self.device.logical.clone(),
        )
    }

    fn create_temp_command_buffer(&self) -> Result<vk::CommandBuffer> {
        self.device.transfer_context().begin()
    }

    fn upload_buffer(
        &self,
        cmd: vk::CommandBuffer,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Buffer> {
        if data.is_empty() {
            return Err(eyre!("Nothing to upload into {}", name));
        }
        let size = data.len() as u64;

        let mut staging = Buffer::new(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            &format!("{} staging", name),
            MemoryLocation::CpuToGpu,
            self.device.memory_allocator(),
            self.device.logical.clone(),
        )?;
        staging.write(data, 0)?;

        let buffer = Buffer::new(
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            name,
            MemoryLocation::GpuOnly,
            self.device.memory_allocator(),
            self.device.logical.clone(),
        )?;

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        // Make the copy visible to whatever reads the buffer later
        let barrier = vk::BufferMemoryBarrier2::default()
            .src_stage_mask(vk::PipelineStageFlags2::ALL_TRANSFER)
            .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            .dst_access_mask(vk::AccessFlags2::MEMORY_READ)
            .buffer(buffer.buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        let barriers = [barrier];
        let dep_info = vk::DependencyInfo::default().buffer_memory_barriers(&barriers);
        unsafe {
            self.device.logical.cmd_copy_buffer(cmd, staging.buffer, buffer.buffer, &[region]);
            self.device.logical.cmd_pipeline_barrier2(cmd, &dep_info);
        }

        self.device.transfer_context().hold(staging);
        Ok(buffer)
    }

    fn submit_and_wait(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.device.transfer_context().submit_and_wait(cmd)
    }

    fn discard_temp_command_buffer(&self, cmd: vk::CommandBuffer) {
        self.device.transfer_context().discard(cmd);
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<GraphicsPipeline> {
        GraphicsPipeline::new(desc, self.device.logical.clone())
    }

    fn wait_device_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}
