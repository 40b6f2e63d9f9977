//! RAII wrappers around the Vulkan objects the device context hands out.
//! Each one frees its memory and handles on drop.

pub mod buffer;
pub mod image;
pub mod pipeline;
pub mod shader;
