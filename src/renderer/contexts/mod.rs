//! Contexts split the renderer by responsibility. Only the device context
//! talks to Vulkan directly; the others are generic over [`RenderHost`].
//!
//! [`RenderHost`]: crate::renderer::host::RenderHost

pub mod device_ctx;
pub mod frame_ctx;
pub mod pipeline_ctx;
pub mod resource_ctx;
