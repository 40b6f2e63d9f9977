use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::{OptionExt, eyre};
use glam::Vec2;
use crate::renderer::contexts::frame_ctx::{FrameLoop, PointerState};
use crate::renderer::contexts::pipeline_ctx::{QuadGeometry, RasterPipeline, ShaderSource};
use crate::renderer::contexts::resource_ctx::{self, DisplayHandle, GBuffer};
use crate::renderer::host::{FrameRecorder, RenderHost};
use crate::renderer::shader_data::PushConstant;

/// GPU objects that exist between attach and detach
struct Attached<H: RenderHost> {
    pipeline: RasterPipeline<H>,
    geometry: QuadGeometry<H>,
    gbuffer: GBuffer<H>,
}

/// The quad sample: a pipeline, its geometry and the G-buffer it draws into
pub struct ShaderPrintfSample<H: RenderHost> {
    shader: ShaderSource,
    attached: Option<Attached<H>>,
    frame: FrameLoop,
}

impl<H: RenderHost> ShaderPrintfSample<H> {
    pub fn new(shader: ShaderSource) -> Self {
        Self {
            shader,
            attached: None,
            frame: FrameLoop::new(),
        }
    }

    /// Build the pipeline and upload the quad. The G-buffer stays empty until
    /// the first [`ShaderPrintfSample::on_resize`].
    pub fn on_attach(&mut self, host: &H) -> Result<()> {
        if self.attached.is_some() {
            return Err(eyre!("Sample is already attached"));
        }

        let depth_format = resource_ctx::select_depth_format(host)?;
        log::info!("Using depth format {:?}", depth_format);
        let pipeline = RasterPipeline::build(host, &self.shader, resource_ctx::COLOR_FORMAT, depth_format)?;
        let geometry = QuadGeometry::upload(host)?;
        let gbuffer = GBuffer::new(resource_ctx::COLOR_FORMAT, depth_format);

        self.frame = FrameLoop::new();
        self.attached = Some(Attached {
            pipeline,
            geometry,
            gbuffer,
        });
        Ok(())
    }

    pub fn on_resize(&mut self, host: &H, width: u32, height: u32) -> Result<()> {
        let attached = self
            .attached
            .as_mut()
            .ok_or_eyre("Resize before the sample was attached")?;

        host.wait_device_idle()?;
        self.frame.suspend();
        attached.gbuffer.create_or_resize(host, width, height)?;
        self.frame.resume();
        Ok(())
    }

    /// Record this frame's draw. Returns `false` when nothing was recorded.
    pub fn on_render<R: FrameRecorder>(
        &mut self,
        recorder: &mut R,
        pointer: &PointerState,
        viewport_origin: Vec2,
    ) -> Result<bool> {
        let Some(attached) = self.attached.as_ref() else {
            return Ok(false);
        };

        self.frame.update_pointer(pointer, viewport_origin);
        self.frame.record(
            recorder,
            &attached.gbuffer,
            &attached.pipeline,
            &attached.geometry,
        )
    }

    /// Release everything created since attach, after the device went idle
    pub fn on_detach(&mut self, host: &H) -> Result<()> {
        let Some(attached) = self.attached.take() else {
            return Ok(());
        };

        host.wait_device_idle()?;
        let Attached {
            pipeline,
            geometry,
            mut gbuffer,
        } = attached;
        drop(pipeline);
        drop(geometry);
        gbuffer.destroy();
        self.frame.suspend();
        log::info!("Sample detached");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn gbuffer(&self) -> Option<&GBuffer<H>> {
        self.attached.as_ref().map(|a| &a.gbuffer)
    }

    pub fn pipeline(&self) -> Option<&RasterPipeline<H>> {
        self.attached.as_ref().map(|a| &a.pipeline)
    }

    pub fn display_handle(&self) -> Option<DisplayHandle> {
        self.gbuffer().and_then(GBuffer::display_handle)
    }

    pub fn viewport_extent(&self) -> Option<vk::Extent2D> {
        self.gbuffer().and_then(GBuffer::extent)
    }

    pub fn push_constant(&self) -> &PushConstant {
        self.frame.push_constant()
    }

    pub fn frame(&self) -> &FrameLoop {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::contexts::frame_ctx::{FrameState, NO_PICK};
    use crate::renderer::testing::{Command, MockHost, MockRecorder};

    fn sample() -> ShaderPrintfSample<MockHost> {
        ShaderPrintfSample::new(ShaderSource::separate(
            "raster",
            vec![0x0723_0203, 1],
            vec![0x0723_0203, 2],
        ))
    }

    #[derive(Debug, PartialEq)]
    struct Snapshot {
        color_format: vk::Format,
        depth_format: vk::Format,
        extent: Option<vk::Extent2D>,
        live_images: usize,
        live_buffers: usize,
        live_pipelines: usize,
        frame_state: FrameState,
        frame: i32,
        mouse_coord: Vec2,
    }

    fn snapshot(sample: &ShaderPrintfSample<MockHost>, host: &MockHost) -> Snapshot {
        let pipeline = sample.pipeline().unwrap();
        Snapshot {
            color_format: pipeline.color_format(),
            depth_format: pipeline.depth_format(),
            extent: sample.viewport_extent(),
            live_images: host.state.live_images.get(),
            live_buffers: host.state.live_buffers.get(),
            live_pipelines: host.state.live_pipelines.get(),
            frame_state: sample.frame().state(),
            frame: sample.push_constant().frame,
            mouse_coord: sample.push_constant().mouse_coord,
        }
    }

    #[test]
    fn attach_detach_attach_restores_initial_state() {
        let host = MockHost::default();
        let mut sample = sample();

        sample.on_attach(&host).unwrap();
        let first = snapshot(&sample, &host);
        let first_pipeline = sample.pipeline().unwrap().pipeline();
        sample.on_resize(&host, 800, 600).unwrap();
        sample
            .on_render(&mut MockRecorder::default(), &PointerState::default(), Vec2::ZERO)
            .unwrap();

        sample.on_detach(&host).unwrap();
        assert!(!sample.is_attached());
        assert_eq!(host.state.live_objects(), 0);

        sample.on_attach(&host).unwrap();
        assert_eq!(snapshot(&sample, &host), first);
        assert_ne!(sample.pipeline().unwrap().pipeline(), first_pipeline);
    }

    #[test]
    fn resize_render_resize_render() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();

        sample.on_resize(&host, 800, 600).unwrap();
        let mut first = MockRecorder::default();
        let pressed = PointerState {
            pressed: true,
            position: Vec2::new(410.0, 310.0),
        };
        assert!(sample.on_render(&mut first, &pressed, Vec2::new(10.0, 10.0)).unwrap());
        assert_eq!(sample.push_constant().mouse_coord, Vec2::new(400.0, 300.0));

        sample.on_resize(&host, 400, 300).unwrap();
        assert_eq!(sample.viewport_extent(), Some(vk::Extent2D { width: 400, height: 300 }));
        assert_eq!(host.state.live_images.get(), 2);

        let mut second = MockRecorder::default();
        assert!(sample.on_render(&mut second, &PointerState::default(), Vec2::ZERO).unwrap());
        assert_eq!(sample.push_constant().mouse_coord, NO_PICK);

        for (recorder, extent) in [(&first, (800, 600)), (&second, (400, 300))] {
            let extent = vk::Extent2D {
                width: extent.0,
                height: extent.1,
            };
            let Some(Command::BeginRendering(att)) = recorder.commands.first() else {
                panic!("frame did not begin a rendering pass");
            };
            assert_eq!(att.extent, extent);
            assert!(recorder.commands.contains(&Command::SetViewportAndScissor(extent)));
            assert!(recorder.commands.contains(&Command::DrawIndexed {
                index_count: 6,
                instance_count: 1,
            }));
            assert_eq!(recorder.commands.last(), Some(&Command::EndRendering));
        }
    }

    #[test]
    fn ready_once_target_and_pipeline_exist() {
        let mut host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();
        assert_eq!(sample.frame().state(), FrameState::Idle);

        sample.on_resize(&host, 800, 600).unwrap();
        assert_eq!(sample.frame().state(), FrameState::Ready);

        host.image_limit = Some(0);
        assert!(sample.on_resize(&host, 400, 300).is_err());
        assert_eq!(sample.frame().state(), FrameState::Idle);

        host.image_limit = None;
        sample.on_resize(&host, 400, 300).unwrap();
        assert_eq!(sample.frame().state(), FrameState::Ready);

        sample.on_detach(&host).unwrap();
        assert_eq!(sample.frame().state(), FrameState::Idle);
    }

    #[test]
    fn resize_waits_for_idle_device() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();

        let before = host.state.idle_waits.get();
        sample.on_resize(&host, 64, 64).unwrap();
        assert_eq!(host.state.idle_waits.get(), before + 1);
    }

    #[test]
    fn render_before_first_resize_is_a_no_op() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();

        let mut recorder = MockRecorder::default();
        assert!(!sample.on_render(&mut recorder, &PointerState::default(), Vec2::ZERO).unwrap());
        assert!(recorder.commands.is_empty());
        assert!(sample.display_handle().is_none());
    }

    #[test]
    fn attach_fails_without_depth_format() {
        let host = MockHost::with_depth_formats(&[]);
        let mut sample = sample();
        assert!(sample.on_attach(&host).is_err());
        assert!(!sample.is_attached());
        assert_eq!(host.state.live_objects(), 0);
    }

    #[test]
    fn double_attach_is_rejected() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();
        assert!(sample.on_attach(&host).is_err());
        assert_eq!(host.state.live_pipelines.get(), 1);
    }

    #[test]
    fn detach_without_attach_is_safe() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_detach(&host).unwrap();
        assert!(sample.on_resize(&host, 10, 10).is_err());
    }

    #[test]
    fn display_handle_goes_stale_after_resize() {
        let host = MockHost::default();
        let mut sample = sample();
        sample.on_attach(&host).unwrap();
        sample.on_resize(&host, 100, 100).unwrap();
        let handle = sample.display_handle().unwrap();

        sample.on_resize(&host, 200, 100).unwrap();
        assert!(!sample.gbuffer().unwrap().is_current(&handle));
        assert_eq!(sample.display_handle().unwrap().extent.width, 200);
    }
}
