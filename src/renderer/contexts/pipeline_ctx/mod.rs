//! Graphics pipeline and static geometry of the sample

mod geometry;
mod shader;

pub use geometry::{QUAD_INDICES, QUAD_VERTICES, QuadGeometry, QuadVertex};
pub use shader::{ShaderSource, default_shader_dir};

use std::mem::size_of;
use ash::vk;
use color_eyre::Result;
use crate::renderer::host::{GpuPipeline, GraphicsPipelineDesc, RenderHost};
use crate::renderer::shader_data::PushConstant;

/// Stages that read the push constant block
pub const PUSH_CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// Pipeline drawing the vertex-colored quad into the G-buffer.
///
/// Dropping it destroys the pipeline and its layout, so the device must be
/// idle first.
pub struct RasterPipeline<H: RenderHost> {
    pipeline: H::Pipeline,
    color_format: vk::Format,
    depth_format: vk::Format,
}

impl<H: RenderHost> RasterPipeline<H> {
    pub fn build(
        host: &H,
        shader: &ShaderSource,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<Self> {
        let desc = Self::describe(shader, color_format, depth_format);
        let pipeline = host.create_graphics_pipeline(&desc)?;
        log::info!(
            "Built pipeline {} ({:?} color, {:?} depth)",
            desc.name,
            color_format,
            depth_format,
        );

        Ok(Self {
            pipeline,
            color_format,
            depth_format,
        })
    }

    pub fn describe(
        shader: &ShaderSource,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            name: shader.name.clone(),
            modules: shader.modules.clone(),
            stages: shader.stages.clone(),
            vertex_bindings: QuadVertex::binding_descriptions(),
            vertex_attributes: QuadVertex::attribute_descriptions(),
            push_constant_ranges: vec![vk::PushConstantRange {
                stage_flags: PUSH_CONSTANT_STAGES,
                offset: 0,
                size: size_of::<PushConstant>() as u32,
            }],
            color_format,
            depth_format,
            depth_compare_op: vk::CompareOp::LESS_OR_EQUAL,
        }
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline.pipeline()
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline.layout()
    }

    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::MockHost;

    fn source() -> ShaderSource {
        ShaderSource::separate("raster", vec![0x0723_0203, 1], vec![0x0723_0203, 2])
    }

    #[test]
    fn push_constant_range_covers_whole_block_for_both_stages() {
        let desc = RasterPipeline::<MockHost>::describe(
            &source(),
            vk::Format::R8G8B8A8_UNORM,
            vk::Format::D32_SFLOAT,
        );
        assert_eq!(desc.push_constant_ranges.len(), 1);
        let range = desc.push_constant_ranges[0];
        assert_eq!(range.offset, 0);
        assert_eq!(range.size, 48);
        assert_eq!(
            range.stage_flags,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn attachment_formats_follow_render_target() {
        let desc = RasterPipeline::<MockHost>::describe(
            &source(),
            vk::Format::R8G8B8A8_UNORM,
            vk::Format::D24_UNORM_S8_UINT,
        );
        assert_eq!(desc.color_format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(desc.depth_format, vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(desc.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(desc.vertex_bindings.len(), 1);
        assert_eq!(desc.vertex_attributes.len(), 2);
    }

    #[test]
    fn combined_module_is_shared_by_both_stages() {
        let combined = ShaderSource::combined("raster", vec![0x0723_0203]);
        let desc = RasterPipeline::<MockHost>::describe(
            &combined,
            vk::Format::R8G8B8A8_UNORM,
            vk::Format::D32_SFLOAT,
        );
        assert_eq!(desc.modules.len(), 1);
        assert_eq!(desc.stages.len(), 2);
        assert!(desc.stages.iter().all(|s| s.module == 0));
    }

    #[test]
    fn build_and_drop_release_pipeline() {
        let host = MockHost::default();
        let pipeline = RasterPipeline::build(
            &host,
            &source(),
            vk::Format::R8G8B8A8_UNORM,
            vk::Format::D32_SFLOAT,
        )
        .unwrap();
        assert_eq!(host.state.live_pipelines.get(), 1);
        assert_ne!(pipeline.pipeline(), vk::Pipeline::null());
        assert_ne!(pipeline.layout(), vk::PipelineLayout::null());

        drop(pipeline);
        assert_eq!(host.state.live_pipelines.get(), 0);
    }
}
