use color_eyre::Result;
use color_eyre::eyre::{eyre, OptionExt};
use shaderc::{CompileOptions, Compiler, EnvVersion, ResolvedInclude, ShaderKind, TargetEnv};
use std::{env, fs, path::Path};

/// One structure of `shaders/device_host.rs`, as written in the source
struct SharedStruct {
    name: &'static str,
    fields: Vec<(&'static str, &'static str)>,
}

macro_rules! shared_structs {
    ($(
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident : $ty:ident),* $(,)?
        }
    )*) => {
        fn shared_structs() -> Vec<SharedStruct> {
            vec![$(
                SharedStruct {
                    name: stringify!($name),
                    fields: vec![$((stringify!($field), stringify!($ty)),)*],
                },
            )*]
        }
    };
}

include!("shaders/device_host.rs");

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=shaders");

    let header = generate_glsl_header()?;
    let out_dir = env::var("OUT_DIR")?;
    fs::write(Path::new(&out_dir).join("device_host.glsl"), &header)?;

    compile_shaders(&header)?;

    Ok(())
}

fn glsl_type(ty: &str, declared: &[&str]) -> Result<String> {
    let glsl = match ty {
        "i32" => "int",
        "u32" => "uint",
        "f32" => "float",
        "Vec2" => "vec2",
        "Vec3" => "vec3",
        "Vec4" => "vec4",
        "Mat4" => "mat4",
        "DeviceAddress" => "uint64_t",
        other if declared.contains(&other) => other,
        other => return Err(eyre!("Type {} has no GLSL equivalent", other)),
    };
    Ok(glsl.to_string())
}

/// Expand the shared structures into a GLSL header for scalar block layout
fn generate_glsl_header() -> Result<String> {
    let mut header = String::new();
    header.push_str("// Generated by build.rs from shaders/device_host.rs, do not edit\n");
    header.push_str("#ifndef DEVICE_HOST_GLSL\n#define DEVICE_HOST_GLSL\n\n");
    header.push_str("#extension GL_EXT_scalar_block_layout : require\n");
    header.push_str("#extension GL_EXT_shader_explicit_arithmetic_types_int64 : require\n\n");

    let mut declared: Vec<&str> = Vec::new();
    for s in shared_structs() {
        header.push_str(&format!("struct {} {{\n", s.name));
        for (field, ty) in &s.fields {
            header.push_str(&format!("  {} {};\n", glsl_type(ty, &declared)?, field));
        }
        header.push_str("};\n\n");
        declared.push(s.name);
    }

    header.push_str("#endif // DEVICE_HOST_GLSL\n");
    Ok(header)
}

fn compile_shaders(header: &str) -> Result<()> {

    let cargo_manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
    let shaders_in_dir = Path::new(&cargo_manifest_dir).join("shaders");
    let shaders_out_dir = Path::new(&cargo_manifest_dir).join("shaders-built");
    fs::create_dir_all(&shaders_out_dir)?;

    let compiler = Compiler::new().ok_or_eyre("Failed to create shaderc compiler")?;
    let mut options = CompileOptions::new().ok_or_eyre("Failed to create shaderc options")?;
    options.set_target_env(TargetEnv::Vulkan, EnvVersion::Vulkan1_3 as u32);
    options.set_generate_debug_info();
    let header = header.to_string();
    options.set_include_callback(move |name, _ty, _source, _depth| {
        if name == "device_host.glsl" {
            Ok(ResolvedInclude {
                resolved_name: name.to_string(),
                content: header.clone(),
            })
        } else {
            Err(format!("Unknown include: {}", name))
        }
    });

    for entry in fs::read_dir(shaders_in_dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let shader_kind = match ext {
            "vert" => ShaderKind::Vertex,
            "frag" => ShaderKind::Fragment,
            _ => continue,
        };

        let file_name = path
            .file_name()
            .ok_or_eyre("Shader file has no name")?
            .to_str()
            .ok_or_eyre("Shader file name is not valid UTF-8")?;
        let source = fs::read_to_string(&path)?;
        let artifact = compiler.compile_into_spirv(
            &source,
            shader_kind,
            file_name,
            "main",
            Some(&options),
        )?;
        if artifact.get_num_warnings() > 0 {
            println!("cargo:warning={}", artifact.get_warning_messages());
        }

        // raster.vert -> raster.vert.spv
        let output_filepath = shaders_out_dir.join(format!("{}.spv", file_name));
        fs::write(output_filepath, artifact.as_binary_u8())?;
    }

    Ok(())
}
