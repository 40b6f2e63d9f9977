mod gbuffer;

pub use gbuffer::{DisplayHandle, GBuffer};

use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::host::RenderHost;

pub const COLOR_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Pick the first depth format the device can render to
pub fn select_depth_format<H: RenderHost>(host: &H) -> Result<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|format| host.supports_depth_format(*format))
        .ok_or_else(|| eyre!("None of the depth formats {:?} are supported", DEPTH_FORMAT_CANDIDATES))
}

/// Aspects a layout transition of a depth image has to cover
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D32_SFLOAT_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D16_UNORM_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}
