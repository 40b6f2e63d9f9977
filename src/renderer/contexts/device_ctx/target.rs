use std::sync::Arc;
use ash::vk;
use color_eyre::eyre::OptionExt;
use color_eyre::Result;
use winit::window::Window;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::device_ctx::instance::RenderInstance;
use crate::renderer::contexts::device_ctx::swapchain::Swapchain;

/// Window surface, destroyed on drop
pub struct Surface {
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    pub fn new(surface: vk::SurfaceKHR, surface_loader: ash::khr::surface::Instance) -> Self {
        Self {
            surface,
            surface_loader,
        }
    }

    pub fn supports_present(&self, device: vk::PhysicalDevice, family_index: u32) -> bool {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(device, family_index, self.surface)
                .unwrap_or(false)
        }
    }

    pub fn capabilities(&self, device: vk::PhysicalDevice) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(device, self.surface)?
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Presentation target of the renderer, encapsulating the window, surface, and swapchain
pub struct RenderTarget {
    pub window: Arc<Window>,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,

    // Declared before the surface it was created from
    pub swapchain: Swapchain,
    pub surface: Surface,
}

impl RenderTarget {
    pub fn new(
        window: Arc<Window>,
        surface: Surface,
        vsync: bool,
        ins: &RenderInstance,
        dev: &RenderDevice,
    ) -> Result<Self> {
        let surface_formats = unsafe {
            surface.surface_loader
                .get_physical_device_surface_formats(dev.physical, surface.surface)?
        };
        let surface_present_modes = unsafe {
            surface.surface_loader
                .get_physical_device_surface_present_modes(dev.physical, surface.surface)?
        };

        let surface_format = choose_surface_format(&surface_formats)
            .ok_or_eyre("No suitable surface format found")?;
        let present_mode = choose_present_mode(&surface_present_modes, vsync);

        let swapchain = Swapchain::new(
            &surface,
            surface_format,
            present_mode,
            window_extent(&window),
            vk::SwapchainKHR::null(),
            ins,
            dev,
        )?;

        Ok(Self {
            window,
            surface_format,
            present_mode,
            swapchain,
            surface,
        })
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Recreate the swapchain for the current window size. The device must be
    /// idle.
    pub fn resize(
        &mut self,
        ins: &RenderInstance,
        dev: &RenderDevice,
    ) -> Result<()> {
        let swapchain = Swapchain::new(
            &self.surface,
            self.surface_format,
            self.present_mode,
            window_extent(&self.window),
            self.swapchain.swapchain,
            ins,
            dev,
        )?;
        // Retires and destroys the old one
        self.swapchain = swapchain;
        Ok(())
    }
}

pub fn window_extent(window: &Window) -> vk::Extent2D {
    let size = window.inner_size();
    vk::Extent2D {
        width: size.width,
        height: size.height,
    }
}

/// Prefer an 8-bit UNORM format so the G-buffer blit needs no conversion,
/// otherwise take the first one offered
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|format| {
            matches!(format.format, vk::Format::B8G8R8A8_UNORM | vk::Format::R8G8B8A8_UNORM)
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// FIFO is always available and is the vsync mode
pub fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn unorm_surface_format_is_preferred() {
        let formats = [format(vk::Format::B8G8R8A8_SRGB), format(vk::Format::B8G8R8A8_UNORM)];
        assert_eq!(choose_surface_format(&formats).map(|f| f.format), Some(vk::Format::B8G8R8A8_UNORM));
    }

    #[test]
    fn first_surface_format_is_the_fallback() {
        let formats = [format(vk::Format::A2B10G10R10_UNORM_PACK32), format(vk::Format::B8G8R8A8_SRGB)];
        assert_eq!(
            choose_surface_format(&formats).map(|f| f.format),
            Some(vk::Format::A2B10G10R10_UNORM_PACK32),
        );
        assert!(choose_surface_format(&[]).is_none());
    }

    #[rstest]
    #[case(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX], true, vk::PresentModeKHR::FIFO)]
    #[case(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX], false, vk::PresentModeKHR::MAILBOX)]
    #[case(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO], false, vk::PresentModeKHR::IMMEDIATE)]
    #[case(&[vk::PresentModeKHR::FIFO], false, vk::PresentModeKHR::FIFO)]
    fn present_mode_follows_vsync(
        #[case] modes: &[vk::PresentModeKHR],
        #[case] vsync: bool,
        #[case] expected: vk::PresentModeKHR,
    ) {
        assert_eq!(choose_present_mode(modes, vsync), expected);
    }
}
