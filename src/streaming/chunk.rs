//! Chunk identity and materialized chunk state

use glam::{Vec2, Vec3};

use crate::math::Aabb;
use crate::mesh::Mesh;

/// Integer coordinate identifying a chunk on the 2D chunk grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert a world-space XZ position to the containing chunk coordinate.
    pub fn from_world_pos(pos: Vec2, chunk_world_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_world_size).floor() as i32,
            y: (pos.y / chunk_world_size).floor() as i32,
        }
    }

    /// World-space XZ origin (minimum corner) of this chunk.
    pub fn world_origin(&self, chunk_world_size: f32) -> Vec2 {
        Vec2::new(
            self.x as f32 * chunk_world_size,
            self.y as f32 * chunk_world_size,
        )
    }

    /// World-space bounds of this chunk's footprint, spanning the full
    /// elevation range.
    pub fn world_bounds(&self, chunk_world_size: f32, max_height: f32) -> Aabb {
        let origin = self.world_origin(chunk_world_size);
        Aabb::new(
            Vec3::new(origin.x, 0.0, origin.y),
            Vec3::new(
                origin.x + chunk_world_size,
                max_height,
                origin.y + chunk_world_size,
            ),
        )
    }
}

/// A materialized terrain chunk.
///
/// The mesh is owned exclusively by its chunk: a rebuild or eviction drops
/// the buffers synchronously, no deferred cleanup.
#[derive(Debug)]
pub struct Chunk {
    /// Coordinate of this chunk on the chunk grid
    pub coord: ChunkCoord,
    /// LOD level this chunk is currently meshed at (0 = finest)
    pub lod: u32,
    /// The renderable mesh, world-space
    pub mesh: Mesh,
    /// Set once the mesh is installed
    pub loaded: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, lod: u32, mesh: Mesh) -> Self {
        Self {
            coord,
            lod,
            mesh,
            loaded: true,
        }
    }
}
