use std::path::PathBuf;
use clap::Parser;
use crate::renderer::contexts::pipeline_ctx::default_shader_dir;
use crate::renderer::debug_printf::PrintfLayerSettings;

/// Contains configuration options for the renderer like the resolution, vsync, and other settings
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shader-printf",
    about = "Draws a quad and routes debugPrintfEXT output from its fragment shader into the log",
    long_about = "Draws a vertex-colored quad into an offscreen G-buffer and shows it in a window.\n\n\
        Hold the left mouse button over the quad: the fragment under the cursor prints its\n\
        coordinates and color with debugPrintfEXT. The validation layer hands the text back\n\
        to the application, which logs it under the `shader_printf` target and shows the\n\
        latest line in the window title.\n\n\
        EXAMPLES:\n\
          RUST_LOG=info shader-printf\n\
          shader-printf --no-vsync --frames 100",
    version
)]
pub struct RenderConfig {
    /// Initial window width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Wait for vertical blank when presenting (default).
    #[arg(long, conflicts_with = "no_vsync")]
    pub vsync: bool,

    /// Present as fast as possible (may cause tearing).
    #[arg(long, conflicts_with = "vsync")]
    pub no_vsync: bool,

    /// Directory holding the precompiled SPIR-V shaders.
    #[arg(long, default_value_os_t = default_shader_dir())]
    pub shader_dir: PathBuf,

    /// Base name of the shader: NAME.spv, or NAME.vert.spv + NAME.frag.spv.
    #[arg(long, default_value = "raster")]
    pub shader: String,

    /// Keep running without shader printf when the validation layer is missing.
    #[arg(long)]
    pub printf_optional: bool,

    /// Bytes the validation layer reserves for printf output per submission.
    #[arg(long, default_value = "1024", value_parser = clap::value_parser!(i32).range(1..))]
    pub printf_buffer_size: i32,

    /// Exit after rendering N frames.
    #[arg(long)]
    pub frames: Option<u64>,
}

impl RenderConfig {
    pub fn vsync(&self) -> bool {
        self.vsync || !self.no_vsync
    }

    pub fn printf_settings(&self) -> PrintfLayerSettings {
        PrintfLayerSettings {
            buffer_size: self.printf_buffer_size,
            ..Default::default()
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::parse_from(["shader-printf"])
    }
}
