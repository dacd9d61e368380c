//! Renderable chunk meshes

mod builder;

pub use builder::MeshBuilder;

use bytemuck::{Pod, Zeroable};

use crate::math::Aabb;

/// Interleaved vertex: world-space position and per-vertex normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// A triangle mesh for one chunk.
///
/// Vertices are already in world space; no per-chunk transform is needed.
/// Each chunk owns its mesh exclusively — replacing a chunk drops the old
/// buffers immediately.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// World-space bounds of the vertex positions.
    ///
    /// Returns `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| v.position.into()))
    }
}
