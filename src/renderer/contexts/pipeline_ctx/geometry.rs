use std::mem::{offset_of, size_of};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use color_eyre::Result;
use glam::{Vec2, Vec3};
use crate::renderer::host::{GpuBuffer, RenderHost};
use crate::renderer::shader_data::PrimMeshInfo;

/// Vertex layout of the quad, as read by `raster.vert`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: Vec2,
    pub color: Vec3,
}

impl QuadVertex {
    pub fn binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, color) as u32,
            },
        ]
    }
}

pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: Vec2::new(-0.5, -0.5), color: Vec3::new(1.0, 0.0, 0.0) },
    QuadVertex { pos: Vec2::new(0.5, -0.5), color: Vec3::new(0.0, 1.0, 0.0) },
    QuadVertex { pos: Vec2::new(0.5, 0.5), color: Vec3::new(0.0, 0.0, 1.0) },
    QuadVertex { pos: Vec2::new(-0.5, 0.5), color: Vec3::new(1.0, 1.0, 1.0) },
];

pub const QUAD_INDICES: [u16; 6] = [0, 2, 1, 2, 0, 3];

/// Vertex and index buffers of the quad, immutable once uploaded
pub struct QuadGeometry<H: RenderHost> {
    vertices: H::Buffer,
    indices: H::Buffer,
}

impl<H: RenderHost> QuadGeometry<H> {
    pub const INDEX_TYPE: vk::IndexType = vk::IndexType::UINT16;

    /// Upload both buffers with one temporary command buffer and wait for it
    pub fn upload(host: &H) -> Result<Self> {
        let cmd = host.create_temp_command_buffer()?;
        let geometry = match Self::record_upload(host, cmd) {
            Ok(geometry) => geometry,
            Err(e) => {
                host.discard_temp_command_buffer(cmd);
                return Err(e);
            }
        };
        host.submit_and_wait(cmd)?;
        log::debug!("Quad geometry uploaded");

        Ok(geometry)
    }

    fn record_upload(host: &H, cmd: vk::CommandBuffer) -> Result<Self> {
        let usage = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let vertices = host.upload_buffer(
            cmd,
            bytemuck::cast_slice(&QUAD_VERTICES),
            vk::BufferUsageFlags::VERTEX_BUFFER | usage,
            "Quad vertices",
        )?;
        let indices = host.upload_buffer(
            cmd,
            bytemuck::cast_slice(&QUAD_INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER | usage,
            "Quad indices",
        )?;
        Ok(Self { vertices, indices })
    }

    pub fn vertex_buffer(&self) -> &H::Buffer {
        &self.vertices
    }

    pub fn index_buffer(&self) -> &H::Buffer {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        QUAD_INDICES.len() as u32
    }

    /// Device addresses of the two buffers, valid for as long as `self` lives
    pub fn mesh_info(&self) -> PrimMeshInfo {
        PrimMeshInfo {
            vertex_address: self.vertices.device_address(),
            index_address: self.indices.device_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::MockHost;

    #[test]
    fn vertex_attributes_follow_struct_layout() {
        assert_eq!(size_of::<QuadVertex>(), 20);
        let bindings = QuadVertex::binding_descriptions();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].stride, 20);

        let attrs = QuadVertex::attribute_descriptions();
        assert_eq!(attrs.len(), 2);
        assert_eq!((attrs[0].location, attrs[0].offset), (0, 0));
        assert_eq!(attrs[0].format, vk::Format::R32G32_SFLOAT);
        assert_eq!((attrs[1].location, attrs[1].offset), (1, 8));
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
    }

    #[test]
    fn indices_form_two_triangles_over_all_vertices() {
        assert_eq!(QUAD_INDICES.len(), 6);
        for v in 0..QUAD_VERTICES.len() as u16 {
            assert!(QUAD_INDICES.contains(&v));
        }
    }

    #[test]
    fn upload_submits_once_and_waits() {
        let host = MockHost::default();
        let geometry = QuadGeometry::upload(&host).unwrap();

        assert_eq!(host.state.submits.get(), 1);
        assert_eq!(host.state.pending_uploads.get(), 0);
        assert!(host.state.open_command_buffer.get().is_none());
        assert_eq!(geometry.vertex_buffer().data, bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES));
        assert_eq!(geometry.index_buffer().data, bytemuck::cast_slice::<_, u8>(&QUAD_INDICES));
        assert!(geometry.vertex_buffer().usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(geometry.index_buffer().usage.contains(vk::BufferUsageFlags::INDEX_BUFFER));
        assert_eq!(geometry.index_count(), 6);
    }

    #[test]
    fn failed_upload_frees_the_command_buffer() {
        let host = MockHost::default();
        host.upload_limit.set(Some(1));

        assert!(QuadGeometry::upload(&host).is_err());
        assert!(host.state.open_command_buffer.get().is_none());
        assert_eq!(host.state.pending_uploads.get(), 0);
        assert_eq!(host.state.live_buffers.get(), 0);
        assert_eq!(host.state.submits.get(), 0);

        host.upload_limit.set(None);
        let geometry = QuadGeometry::upload(&host).unwrap();
        assert_eq!(host.state.submits.get(), 1);
        assert_eq!(geometry.index_count(), 6);
    }

    #[test]
    fn mesh_info_points_at_both_buffers() {
        let host = MockHost::default();
        let geometry = QuadGeometry::upload(&host).unwrap();
        let info = geometry.mesh_info();

        assert_eq!(info.vertex_address, geometry.vertex_buffer().device_address());
        assert_eq!(info.index_address, geometry.index_buffer().device_address());
        assert_ne!(info.vertex_address, info.index_address);
    }

    #[test]
    fn dropping_geometry_releases_buffers() {
        let host = MockHost::default();
        let geometry = QuadGeometry::upload(&host).unwrap();
        assert_eq!(host.state.live_buffers.get(), 2);
        drop(geometry);
        assert_eq!(host.state.live_buffers.get(), 0);
    }
}
