//! The contract the sample needs from the GPU host.
//!
//! [`RenderHost`] covers resource creation and one-shot submission,
//! [`FrameRecorder`] covers the commands of a single frame. The device context
//! implements both on top of ash; everything above them only talks to these
//! traits.

use std::ffi::CString;
use ash::vk;
use color_eyre::Result;
use crate::renderer::shader_data::DeviceAddress;

pub trait GpuImage {
    fn handle(&self) -> vk::Image;
    fn view(&self) -> vk::ImageView;
    fn format(&self) -> vk::Format;
    fn extent(&self) -> vk::Extent2D;
}

pub trait GpuBuffer {
    fn handle(&self) -> vk::Buffer;
    fn size(&self) -> u64;
    fn device_address(&self) -> DeviceAddress;
}

pub trait GpuPipeline {
    fn pipeline(&self) -> vk::Pipeline;
    fn layout(&self) -> vk::PipelineLayout;
}

pub struct ImageCreateInfo<'a> {
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    /// Aspect of the image view
    pub aspect: vk::ImageAspectFlags,
    pub name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub stage: vk::ShaderStageFlags,
    /// Index into [`GraphicsPipelineDesc::modules`]
    pub module: usize,
    pub entry_point: CString,
}

/// Everything needed to build a graphics pipeline rendering into a single
/// color attachment plus depth, with dynamic viewport and scissor
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub name: String,
    pub modules: Vec<Vec<u32>>,
    pub stages: Vec<ShaderStageDesc>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub depth_compare_op: vk::CompareOp,
}

pub trait RenderHost {
    type Image: GpuImage;
    type Buffer: GpuBuffer;
    type Pipeline: GpuPipeline;

    /// Whether `format` can be used as an optimal-tiling depth attachment
    fn supports_depth_format(&self, format: vk::Format) -> bool;

    fn create_image(&self, info: &ImageCreateInfo) -> Result<Self::Image>;

    /// Begin recording a command buffer meant for a single submission
    fn create_temp_command_buffer(&self) -> Result<vk::CommandBuffer>;

    /// Record a copy of `data` into a new device-local buffer.
    ///
    /// The copy only happens once `cmd` is submitted, so the staging memory is
    /// held until [`RenderHost::submit_and_wait`] returns.
    fn upload_buffer(
        &self,
        cmd: vk::CommandBuffer,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Self::Buffer>;

    /// Submit a command buffer from [`RenderHost::create_temp_command_buffer`]
    /// and block until the GPU is done with it
    fn submit_and_wait(&self, cmd: vk::CommandBuffer) -> Result<()>;

    /// Free a command buffer from [`RenderHost::create_temp_command_buffer`]
    /// without submitting it, along with the staging memory of its uploads
    fn discard_temp_command_buffer(&self, cmd: vk::CommandBuffer);

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Self::Pipeline>;

    fn wait_device_idle(&self) -> Result<()>;
}

/// Attachments and clear values of one dynamic rendering pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachments {
    pub color_image: vk::Image,
    pub color_view: vk::ImageView,
    pub depth_image: vk::Image,
    pub depth_view: vk::ImageView,
    pub depth_format: vk::Format,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
}

pub trait FrameRecorder {
    /// Open a rendering pass that clears both attachments
    fn begin_rendering(&mut self, attachments: &RenderingAttachments) -> Result<()>;
    fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D) -> Result<()>;
    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) -> Result<()>;
    fn bind_graphics_pipeline(&mut self, pipeline: vk::Pipeline) -> Result<()>;
    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) -> Result<()>;
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, index_type: vk::IndexType) -> Result<()>;
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()>;
    fn end_rendering(&mut self) -> Result<()>;
}
