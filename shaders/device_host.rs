// Host/device shared structures.
//
// This file is the single source of truth for the layout of every structure
// the shaders and the host exchange. It is expanded twice: by
// `src/renderer/shader_data.rs` into `#[repr(C)]` Rust structs, and by
// `build.rs` into `shaders-built/device_host.glsl`. Only field types known to
// both expansions may be used: i32, u32, f32, Vec2, Vec3, Vec4, Mat4,
// DeviceAddress and structs declared earlier in this block.

shared_structs! {
    /// Point light, the radius is measured on the XZ plane
    Light {
        position: Vec3,
        intensity: f32,
        radius: f32,
        _pad0: f32,
    }

    /// Per-draw parameters pushed to both the vertex and fragment stage
    PushConstant {
        max_depth: i32,
        frame: i32,
        firefly_clamp_threshold: f32,
        max_samples: i32,
        light: Light,
        mouse_coord: Vec2,
    }

    /// Camera matrices, written once per frame
    FrameInfo {
        proj: Mat4,
        view: Mat4,
        proj_inv: Mat4,
        view_inv: Mat4,
        cam_pos: Vec3,
        _pad0: f32,
    }

    Material {
        albedo: Vec3,
        roughness: f32,
        metallic: f32,
        _pad0: f32,
        _pad1: f32,
        _pad2: f32,
    }

    /// Vertex of a primitive mesh, read through `PrimMeshInfo::vertex_address`
    Vertex {
        position: Vec3,
        normal: Vec3,
        t: Vec2,
    }

    PrimMeshInfo {
        vertex_address: DeviceAddress,
        index_address: DeviceAddress,
    }

    InstanceInfo {
        transform: Mat4,
        material_id: i32,
        _pad0: i32,
        _pad1: i32,
        _pad2: i32,
    }

    SceneDescription {
        material_address: DeviceAddress,
        inst_info_address: DeviceAddress,
        prim_info_address: DeviceAddress,
        light: Light,
    }
}
