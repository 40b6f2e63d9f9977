//! GPU-free stand-ins for [`RenderHost`] and [`FrameRecorder`]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use ash::vk;
use ash::vk::Handle;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::host::{
    FrameRecorder, GpuBuffer, GpuImage, GpuPipeline, GraphicsPipelineDesc, ImageCreateInfo,
    RenderHost, RenderingAttachments,
};
use crate::renderer::shader_data::DeviceAddress;

#[derive(Default)]
pub struct MockState {
    next_handle: Cell<u64>,
    pub live_images: Cell<usize>,
    pub live_buffers: Cell<usize>,
    pub live_pipelines: Cell<usize>,
    pub open_command_buffer: Cell<Option<vk::CommandBuffer>>,
    pub pending_uploads: Cell<usize>,
    pub submits: Cell<usize>,
    pub idle_waits: Cell<usize>,
    pub destroyed_images: RefCell<Vec<vk::Image>>,
}

impl MockState {
    fn next(&self) -> u64 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        handle
    }

    pub fn live_objects(&self) -> usize {
        self.live_images.get() + self.live_buffers.get() + self.live_pipelines.get()
    }
}

pub struct MockImage {
    handle: vk::Image,
    view: vk::ImageView,
    info: (vk::Format, vk::Extent2D),
    pub usage: vk::ImageUsageFlags,
    pub name: String,
    state: Rc<MockState>,
}

impl GpuImage for MockImage {
    fn handle(&self) -> vk::Image {
        self.handle
    }

    fn view(&self) -> vk::ImageView {
        self.view
    }

    fn format(&self) -> vk::Format {
        self.info.0
    }

    fn extent(&self) -> vk::Extent2D {
        self.info.1
    }
}

impl Drop for MockImage {
    fn drop(&mut self) {
        self.state.live_images.set(self.state.live_images.get() - 1);
        self.state.destroyed_images.borrow_mut().push(self.handle);
    }
}

pub struct MockBuffer {
    handle: vk::Buffer,
    pub data: Vec<u8>,
    pub usage: vk::BufferUsageFlags,
    state: Rc<MockState>,
}

impl GpuBuffer for MockBuffer {
    fn handle(&self) -> vk::Buffer {
        self.handle
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn device_address(&self) -> DeviceAddress {
        DeviceAddress::from_raw(self.handle.as_raw() << 16)
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.state.live_buffers.set(self.state.live_buffers.get() - 1);
    }
}

pub struct MockPipeline {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    pub desc: GraphicsPipelineDesc,
    state: Rc<MockState>,
}

impl GpuPipeline for MockPipeline {
    fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.state.live_pipelines.set(self.state.live_pipelines.get() - 1);
    }
}

pub struct MockHost {
    pub state: Rc<MockState>,
    pub supported_depth_formats: Vec<vk::Format>,
    /// Image creation fails once this many images are alive
    pub image_limit: Option<usize>,
    /// Buffer uploads fail once this many have been recorded
    pub upload_limit: Cell<Option<usize>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            state: Rc::default(),
            supported_depth_formats: vec![vk::Format::D32_SFLOAT, vk::Format::D24_UNORM_S8_UINT],
            image_limit: None,
            upload_limit: Cell::new(None),
        }
    }
}

impl MockHost {
    pub fn with_depth_formats(formats: &[vk::Format]) -> Self {
        Self {
            supported_depth_formats: formats.to_vec(),
            ..Default::default()
        }
    }
}

impl RenderHost for MockHost {
    type Image = MockImage;
    type Buffer = MockBuffer;
    type Pipeline = MockPipeline;

    fn supports_depth_format(&self, format: vk::Format) -> bool {
        self.supported_depth_formats.contains(&format)
    }

    fn create_image(&self, info: &ImageCreateInfo) -> Result<MockImage> {
        if self.image_limit.is_some_and(|limit| self.state.live_images.get() >= limit) {
            return Err(eyre!("Out of device memory for {}", info.name));
        }
        self.state.live_images.set(self.state.live_images.get() + 1);
        Ok(MockImage {
            handle: vk::Image::from_raw(self.state.next()),
            view: vk::ImageView::from_raw(self.state.next()),
            info: (info.format, info.extent),
            usage: info.usage,
            name: info.name.to_string(),
            state: self.state.clone(),
        })
    }

    fn create_temp_command_buffer(&self) -> Result<vk::CommandBuffer> {
        if self.state.open_command_buffer.get().is_some() {
            return Err(eyre!("A temporary command buffer is already recording"));
        }
        let cmd = vk::CommandBuffer::from_raw(self.state.next());
        self.state.open_command_buffer.set(Some(cmd));
        Ok(cmd)
    }

    fn upload_buffer(
        &self,
        cmd: vk::CommandBuffer,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<MockBuffer> {
        if self.state.open_command_buffer.get() != Some(cmd) {
            return Err(eyre!("Upload recorded into a command buffer that is not open"));
        }
        if self.upload_limit.get().is_some_and(|limit| self.state.pending_uploads.get() >= limit) {
            return Err(eyre!("Out of staging memory for {}", name));
        }
        self.state.pending_uploads.set(self.state.pending_uploads.get() + 1);
        self.state.live_buffers.set(self.state.live_buffers.get() + 1);
        Ok(MockBuffer {
            handle: vk::Buffer::from_raw(self.state.next()),
            data: data.to_vec(),
            usage,
            state: self.state.clone(),
        })
    }

    fn submit_and_wait(&self, cmd: vk::CommandBuffer) -> Result<()> {
        if self.state.open_command_buffer.take() != Some(cmd) {
            return Err(eyre!("Submitted a command buffer that is not open"));
        }
        self.state.pending_uploads.set(0);
        self.state.submits.set(self.state.submits.get() + 1);
        Ok(())
    }

    fn discard_temp_command_buffer(&self, cmd: vk::CommandBuffer) {
        if self.state.open_command_buffer.get() == Some(cmd) {
            self.state.open_command_buffer.set(None);
            self.state.pending_uploads.set(0);
        }
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<MockPipeline> {
        if desc.modules.is_empty() {
            return Err(eyre!("Pipeline {} has no shader modules", desc.name));
        }
        self.state.live_pipelines.set(self.state.live_pipelines.get() + 1);
        Ok(MockPipeline {
            pipeline: vk::Pipeline::from_raw(self.state.next()),
            layout: vk::PipelineLayout::from_raw(self.state.next()),
            desc: desc.clone(),
            state: self.state.clone(),
        })
    }

    fn wait_device_idle(&self) -> Result<()> {
        self.state.idle_waits.set(self.state.idle_waits.get() + 1);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginRendering(RenderingAttachments),
    SetViewportAndScissor(vk::Extent2D),
    PushConstants {
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: Vec<u8>,
    },
    BindPipeline(vk::Pipeline),
    BindVertexBuffer(vk::Buffer),
    BindIndexBuffer(vk::Buffer, vk::IndexType),
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
    EndRendering,
}

#[derive(Default)]
pub struct MockRecorder {
    pub commands: Vec<Command>,
    pub fail_draw: bool,
}

impl FrameRecorder for MockRecorder {
    fn begin_rendering(&mut self, attachments: &RenderingAttachments) -> Result<()> {
        self.commands.push(Command::BeginRendering(*attachments));
        Ok(())
    }

    fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.commands.push(Command::SetViewportAndScissor(extent));
        Ok(())
    }

    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) -> Result<()> {
        self.commands.push(Command::PushConstants {
            layout,
            stages,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn bind_graphics_pipeline(&mut self, pipeline: vk::Pipeline) -> Result<()> {
        self.commands.push(Command::BindPipeline(pipeline));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) -> Result<()> {
        self.commands.push(Command::BindVertexBuffer(buffer));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, index_type: vk::IndexType) -> Result<()> {
        self.commands.push(Command::BindIndexBuffer(buffer, index_type));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()> {
        if self.fail_draw {
            return Err(eyre!("Device lost"));
        }
        self.commands.push(Command::DrawIndexed {
            index_count,
            instance_count,
        });
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.commands.push(Command::EndRendering);
        Ok(())
    }
}
