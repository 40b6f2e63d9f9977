use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::host::{GpuImage, ImageCreateInfo, RenderHost, RenderingAttachments};

/// Read-only view of the current color target, for whoever displays it.
///
/// A handle stops being valid as soon as the G-buffer is resized or destroyed;
/// check it with [`GBuffer::is_current`] before using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayHandle {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
    generation: u64,
}

struct Targets<I> {
    color: I,
    depth: I,
    extent: vk::Extent2D,
}

/// Offscreen color + depth pair the sample renders into
pub struct GBuffer<H: RenderHost> {
    color_format: vk::Format,
    depth_format: vk::Format,
    targets: Option<Targets<H::Image>>,
    generation: u64,
}

impl<H: RenderHost> GBuffer<H> {
    pub const COLOR_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
        vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw()
            | vk::ImageUsageFlags::SAMPLED.as_raw()
            | vk::ImageUsageFlags::TRANSFER_SRC.as_raw(),
    );

    pub fn new(color_format: vk::Format, depth_format: vk::Format) -> Self {
        Self {
            color_format,
            depth_format,
            targets: None,
            generation: 0,
        }
    }

    /// Replace the current pair with a new one of the given size.
    ///
    /// The old images are released first. If either new image cannot be
    /// created the G-buffer is left empty.
    pub fn create_or_resize(&mut self, host: &H, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(eyre!("G-buffer extent must be positive, got {}x{}", width, height));
        }
        self.destroy();

        let extent = vk::Extent2D { width, height };
        let color = host.create_image(&ImageCreateInfo {
            format: self.color_format,
            extent,
            usage: Self::COLOR_USAGE,
            aspect: vk::ImageAspectFlags::COLOR,
            name: "G-buffer color",
        })?;
        let depth = host.create_image(&ImageCreateInfo {
            format: self.depth_format,
            extent,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            aspect: vk::ImageAspectFlags::DEPTH,
            name: "G-buffer depth",
        })?;

        self.generation += 1;
        self.targets = Some(Targets { color, depth, extent });
        log::debug!("G-buffer created at {}x{}", width, height);
        Ok(())
    }

    pub fn destroy(&mut self) {
        if self.targets.take().is_some() {
            self.generation += 1;
            log::debug!("G-buffer destroyed");
        }
    }

    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.targets.as_ref().map(|t| t.extent)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_none()
    }

    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn color_image(&self) -> Option<&H::Image> {
        self.targets.as_ref().map(|t| &t.color)
    }

    pub fn depth_image(&self) -> Option<&H::Image> {
        self.targets.as_ref().map(|t| &t.depth)
    }

    pub fn display_handle(&self) -> Option<DisplayHandle> {
        self.targets.as_ref().map(|t| DisplayHandle {
            image: t.color.handle(),
            view: t.color.view(),
            extent: t.extent,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, handle: &DisplayHandle) -> bool {
        self.targets.is_some() && handle.generation == self.generation
    }

    pub fn attachments(&self, clear_color: [f32; 4], clear_depth: f32) -> Option<RenderingAttachments> {
        self.targets.as_ref().map(|t| RenderingAttachments {
            color_image: t.color.handle(),
            color_view: t.color.view(),
            depth_image: t.depth.handle(),
            depth_view: t.depth.view(),
            depth_format: self.depth_format,
            extent: t.extent,
            clear_color,
            clear_depth,
        })
    }
}
