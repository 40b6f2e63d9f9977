use color_eyre::Result;
use color_eyre::eyre::eyre;
use glam::Vec2;
use crate::renderer::contexts::pipeline_ctx::{PUSH_CONSTANT_STAGES, QuadGeometry, RasterPipeline};
use crate::renderer::contexts::resource_ctx::GBuffer;
use crate::renderer::host::{FrameRecorder, GpuBuffer, RenderHost};
use crate::renderer::shader_data::{PushConstant, SharedLayout};

/// Mouse coordinate meaning "nothing picked".
///
/// Only unambiguous while viewport coordinates are never negative.
pub const NO_PICK: Vec2 = Vec2::new(-1.0, -1.0);

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const CLEAR_DEPTH: f32 = 1.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub pressed: bool,
    /// Position in window coordinates
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No render target
    Idle,
    Ready,
    /// Between begin and end of the rendering pass
    Rendering,
}

/// Records the per-frame draw of the quad
pub struct FrameLoop {
    push_constant: PushConstant,
    state: FrameState,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            push_constant: PushConstant {
                mouse_coord: NO_PICK,
                ..Default::default()
            },
            state: FrameState::Idle,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn push_constant(&self) -> &PushConstant {
        &self.push_constant
    }

    /// Drop back to Idle while the render target is being rebuilt
    pub fn suspend(&mut self) {
        if self.state == FrameState::Ready {
            self.state = FrameState::Idle;
        }
    }

    /// Enter Ready once the render target has been (re)built
    pub fn resume(&mut self) {
        if self.state == FrameState::Idle {
            self.state = FrameState::Ready;
        }
    }

    /// Store the pointer position relative to the viewport, or [`NO_PICK`]
    /// when no button is held
    pub fn update_pointer(&mut self, pointer: &PointerState, viewport_origin: Vec2) {
        self.push_constant.mouse_coord = if pointer.pressed {
            pointer.position - viewport_origin
        } else {
            NO_PICK
        };
    }

    /// Record one frame into `recorder`.
    ///
    /// Returns `false` without recording anything when there is no render
    /// target yet.
    pub fn record<H: RenderHost, R: FrameRecorder>(
        &mut self,
        recorder: &mut R,
        gbuffer: &GBuffer<H>,
        pipeline: &RasterPipeline<H>,
        geometry: &QuadGeometry<H>,
    ) -> Result<bool> {
        if self.state == FrameState::Rendering {
            return Err(eyre!("Frame recorded while a rendering pass is still open"));
        }
        let Some(attachments) = gbuffer.attachments(CLEAR_COLOR, CLEAR_DEPTH) else {
            self.state = FrameState::Idle;
            return Ok(false);
        };

        self.state = FrameState::Rendering;
        recorder.begin_rendering(&attachments)?;
        recorder.set_viewport_and_scissor(attachments.extent)?;
        recorder.push_constants(pipeline.layout(), PUSH_CONSTANT_STAGES, self.push_constant.as_bytes())?;
        recorder.bind_graphics_pipeline(pipeline.pipeline())?;
        recorder.bind_vertex_buffer(geometry.vertex_buffer().handle())?;
        recorder.bind_index_buffer(geometry.index_buffer().handle(), QuadGeometry::<H>::INDEX_TYPE)?;
        recorder.draw_indexed(geometry.index_count(), 1)?;
        recorder.end_rendering()?;
        self.state = FrameState::Ready;

        log::trace!(
            "Recorded frame {} at {:?}",
            self.push_constant.frame,
            self.push_constant.mouse_coord,
        );
        self.push_constant.frame = self.push_constant.frame.wrapping_add(1);
        Ok(true)
    }
}
