use ash::vk;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crate::renderer::contexts::resource_ctx::depth_aspect;
use crate::renderer::host::{FrameRecorder, RenderingAttachments};
use crate::renderer::resources::image::transition_image_layout;

/// Records frame commands into a primary command buffer that is already
/// in the recording state
pub struct AshRecorder<'a> {
    device: &'a ash::Device,
    cmd: vk::CommandBuffer,
    rendering: bool,
}

impl<'a> AshRecorder<'a> {
    pub fn new(device: &'a ash::Device, cmd: vk::CommandBuffer) -> Self {
        Self {
            device,
            cmd,
            rendering: false,
        }
    }

    fn require_rendering(&self, what: &str) -> Result<()> {
        if !self.rendering {
            return Err(eyre!("{} recorded outside of a rendering pass", what));
        }
        Ok(())
    }
}

impl FrameRecorder for AshRecorder<'_> {
    fn begin_rendering(&mut self, attachments: &RenderingAttachments) -> Result<()> {
        if self.rendering {
            return Err(eyre!("Rendering pass is already open"));
        }

        // Both attachments are cleared, so their previous contents are discarded
        transition_image_layout(
            self.cmd,
            attachments.color_image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            self.device,
        );
        transition_image_layout(
            self.cmd,
            attachments.depth_image,
            depth_aspect(attachments.depth_format),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            self.device,
        );

        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(attachments.color_view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: attachments.clear_color,
                },
            })];
        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(attachments.depth_view)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: attachments.clear_depth,
                    stencil: 0,
                },
            });
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: attachments.extent,
            })
            .layer_count(1)
            .color_attachments(&color_attachments)
            .depth_attachment(&depth_attachment);

        unsafe {
            self.device.cmd_begin_rendering(self.cmd, &rendering_info);
        }
        self.rendering = true;
        Ok(())
    }

    fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.require_rendering("Viewport")?;
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe {
            self.device.cmd_set_viewport(self.cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(self.cmd, 0, &[scissor]);
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) -> Result<()> {
        unsafe {
            self.device.cmd_push_constants(self.cmd, layout, stages, 0, data);
        }
        Ok(())
    }

    fn bind_graphics_pipeline(&mut self, pipeline: vk::Pipeline) -> Result<()> {
        unsafe {
            self.device.cmd_bind_pipeline(self.cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) -> Result<()> {
        unsafe {
            self.device.cmd_bind_vertex_buffers(self.cmd, 0, &[buffer], &[0]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, index_type: vk::IndexType) -> Result<()> {
        unsafe {
            self.device.cmd_bind_index_buffer(self.cmd, buffer, 0, index_type);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<()> {
        self.require_rendering("Draw")?;
        unsafe {
            self.device.cmd_draw_indexed(self.cmd, index_count, instance_count, 0, 0, 0);
        }
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.require_rendering("End of rendering")?;
        unsafe {
            self.device.cmd_end_rendering(self.cmd);
        }
        self.rendering = false;
        Ok(())
    }
}
