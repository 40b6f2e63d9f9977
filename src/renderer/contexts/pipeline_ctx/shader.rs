use std::ffi::{CStr, CString};
use std::fs::File;
use std::path::{Path, PathBuf};
use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use crate::renderer::host::ShaderStageDesc;

/// Precompiled SPIR-V for the vertex and fragment stages.
///
/// Toolchains either emit one module holding both stages under named entry
/// points (`NAME.spv`), or one module per stage using `main`
/// (`NAME.vert.spv` + `NAME.frag.spv`). The combined form wins when both exist.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub name: String,
    pub modules: Vec<Vec<u32>>,
    pub stages: Vec<ShaderStageDesc>,
}

impl ShaderSource {
    pub const COMBINED_VERTEX_ENTRY: &'static CStr = c"vertexMain";
    pub const COMBINED_FRAGMENT_ENTRY: &'static CStr = c"fragmentMain";
    pub const DEFAULT_ENTRY: &'static CStr = c"main";

    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let combined = dir.join(format!("{}.spv", name));
        if combined.is_file() {
            log::info!("Loading combined shader module {}", combined.display());
            return Ok(Self::combined(name, read_spirv(&combined)?));
        }

        let vert = dir.join(format!("{}.vert.spv", name));
        let frag = dir.join(format!("{}.frag.spv", name));
        if !vert.is_file() || !frag.is_file() {
            return Err(eyre!(
                "No SPIR-V found for shader {:?} in {} (expected {}.spv or {}.vert.spv + {}.frag.spv)",
                name,
                dir.display(),
                name,
                name,
                name,
            ));
        }
        log::info!("Loading shader modules {} and {}", vert.display(), frag.display());
        Ok(Self::separate(name, read_spirv(&vert)?, read_spirv(&frag)?))
    }

    pub fn combined(name: &str, code: Vec<u32>) -> Self {
        Self {
            name: name.to_string(),
            modules: vec![code],
            stages: vec![
                stage(vk::ShaderStageFlags::VERTEX, 0, Self::COMBINED_VERTEX_ENTRY),
                stage(vk::ShaderStageFlags::FRAGMENT, 0, Self::COMBINED_FRAGMENT_ENTRY),
            ],
        }
    }

    pub fn separate(name: &str, vertex: Vec<u32>, fragment: Vec<u32>) -> Self {
        Self {
            name: name.to_string(),
            modules: vec![vertex, fragment],
            stages: vec![
                stage(vk::ShaderStageFlags::VERTEX, 0, Self::DEFAULT_ENTRY),
                stage(vk::ShaderStageFlags::FRAGMENT, 1, Self::DEFAULT_ENTRY),
            ],
        }
    }
}

/// `shaders-built/` next to the manifest, where `build.rs` writes its output
pub fn default_shader_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders-built")
}

fn stage(stage: vk::ShaderStageFlags, module: usize, entry_point: &CStr) -> ShaderStageDesc {
    ShaderStageDesc {
        stage,
        module,
        entry_point: CString::from(entry_point),
    }
}

fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    ash::util::read_spv(&mut file).wrap_err_with(|| format!("{} is not valid SPIR-V", path.display()))
}
