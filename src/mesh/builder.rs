//! Chunk mesh construction from heightmap slices

use glam::Vec3;

use crate::config::TerrainConfig;
use crate::core::{Error, Result};
use crate::heightmap::HeightmapLevel;
use crate::streaming::chunk::ChunkCoord;

use super::{Mesh, Vertex};

/// Builds the mesh for one chunk at one LOD from a pyramid level slice.
///
/// Chunks of different LOD stay anchored to the same global origin: a
/// vertex at grid step `i` lands at base-grid cell `i * 2^lod`, so a
/// coarser LOD only thins the sampling density inside an unchanged
/// world-space footprint. Vertex indices are shared across interior cell
/// boundaries; boundaries *between* chunks are not vertex-shared, so
/// cross-chunk normal seams are accepted.
pub struct MeshBuilder {
    chunk_width: u32,
    base_cell_size: f32,
    levels_of_detail: u32,
}

impl MeshBuilder {
    pub fn new(config: &TerrainConfig) -> Self {
        Self {
            chunk_width: config.chunk_width(),
            base_cell_size: config.base_cell_size(),
            levels_of_detail: config.mesh.levels_of_detail,
        }
    }

    /// Build the mesh for `coord` at `lod`, sampling heights from `level`.
    ///
    /// Produces exactly `(k+1)^2` vertices and `6*k^2` indices for
    /// `k = chunk_width / 2^lod`. All buffers are freshly allocated and
    /// owned by the returned mesh.
    pub fn build(&self, coord: ChunkCoord, lod: u32, level: &HeightmapLevel) -> Result<Mesh> {
        if lod >= self.levels_of_detail {
            return Err(Error::Internal(format!(
                "mesh build requested for LOD {lod}, only {} levels exist",
                self.levels_of_detail
            )));
        }
        let k = (self.chunk_width >> lod) as usize;
        let verts_per_side = k + 1;
        let max_cell = level.size() - 1;
        if coord.x < 0
            || coord.y < 0
            || coord.x as usize * k + k > max_cell
            || coord.y as usize * k + k > max_cell
        {
            return Err(Error::Internal(format!(
                "chunk ({}, {}) outside heightmap level of size {}",
                coord.x,
                coord.y,
                level.size()
            )));
        }
        let slice_x = coord.x as usize * k;
        let slice_y = coord.y as usize * k;

        let step = self.base_cell_size * (1u32 << lod) as f32;
        let origin_x = (coord.x * self.chunk_width as i32) as f32 * self.base_cell_size;
        let origin_z = (coord.y * self.chunk_width as i32) as f32 * self.base_cell_size;

        let mut vertices = Vec::with_capacity(verts_per_side * verts_per_side);
        for j in 0..verts_per_side {
            for i in 0..verts_per_side {
                let height = level.get(slice_x + i, slice_y + j);
                vertices.push(Vertex {
                    position: [
                        origin_x + i as f32 * step,
                        height,
                        origin_z + j as f32 * step,
                    ],
                    normal: [0.0; 3],
                });
            }
        }

        // Two triangles per cell, counter-clockwise seen from +Y, sharing
        // vertex indices at interior boundaries.
        let mut indices = Vec::with_capacity(k * k * 6);
        for j in 0..k {
            for i in 0..k {
                let v00 = (j * verts_per_side + i) as u32;
                let v10 = v00 + 1;
                let v01 = v00 + verts_per_side as u32;
                let v11 = v01 + 1;
                indices.extend_from_slice(&[v00, v01, v10, v10, v01, v11]);
            }
        }

        compute_normals(&mut vertices, &indices);
        Ok(Mesh { vertices, indices })
    }
}

/// Per-vertex normals accumulated from the face normals of every triangle
/// touching the vertex, then normalized.
fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        let n = (p1 - p0).cross(p2 - p0);
        if n.length_squared() > f32::EPSILON {
            let n = n.normalize();
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }
    }
    for (vertex, n) in vertices.iter_mut().zip(accum) {
        let n = n.normalize_or_zero();
        vertex.normal = if n == Vec3::ZERO {
            [0.0, 1.0, 0.0]
        } else {
            n.into()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;

    fn test_config() -> TerrainConfig {
        let mut config = TerrainConfig::default();
        config.mesh.detail_factor = 4;
        config.mesh.levels_of_detail = 3;
        config.mesh.terrain_width = 64.0;
        config.chunk.chunk_size_factor = 2;
        config.validate().unwrap();
        config
    }

    fn flat_level(size: usize, height: f32) -> HeightmapLevel {
        HeightmapLevel::new(size, vec![height; size * size])
    }

    #[test]
    fn test_mesh_sizing() {
        // detail_factor=4, chunk_size_factor=2, lod=1: k = 4/2 = 2,
        // 9 vertices and 24 indices.
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let level = flat_level(config.level_size(1), 1.0);
        let mesh = builder.build(ChunkCoord::new(0, 0), 1, &level).unwrap();
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.indices.len(), 24);
    }

    #[test]
    fn test_sizing_guarantee_all_lods() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        for lod in 0..config.mesh.levels_of_detail {
            let k = config.cells_per_chunk(lod) as usize;
            let level = flat_level(config.level_size(lod), 0.0);
            let mesh = builder.build(ChunkCoord::new(1, 1), lod, &level).unwrap();
            assert_eq!(mesh.vertex_count(), (k + 1) * (k + 1));
            assert_eq!(mesh.indices.len(), 6 * k * k);
        }
    }

    #[test]
    fn test_footprint_anchored_across_lods() {
        // The chunk's world-space corners must coincide at every LOD.
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let coord = ChunkCoord::new(2, 1);

        let corners_at = |lod: u32| -> Vec<[f32; 3]> {
            let k = config.cells_per_chunk(lod) as usize;
            let level = flat_level(config.level_size(lod), 3.0);
            let mesh = builder.build(coord, lod, &level).unwrap();
            let vps = k + 1;
            [0, k, k * vps, k * vps + k]
                .iter()
                .map(|&i| mesh.vertices[i].position)
                .collect()
        };

        let fine = corners_at(0);
        for lod in 1..config.mesh.levels_of_detail {
            assert_eq!(corners_at(lod), fine, "LOD {lod} shifted the footprint");
        }
    }

    #[test]
    fn test_world_positions_and_heights() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);

        // Level 0 slice for chunk (1, 0): cells 4..8 on x.
        let size = config.level_size(0);
        let mut data = vec![0.0f32; size * size];
        for x in 0..size {
            for y in 0..size {
                data[x * size + y] = (x * 100 + y) as f32;
            }
        }
        let level = HeightmapLevel::new(size, data);
        let mesh = builder.build(ChunkCoord::new(1, 0), 0, &level).unwrap();

        // base_cell_size = 64/16 = 4. First vertex sits at x=16, z=0 and
        // samples grid cell (4, 0).
        assert_eq!(mesh.vertices[0].position, [16.0, 400.0, 0.0]);
        // Vertex (i=1, j=2) sits one cell right, two cells down.
        let vps = config.cells_per_chunk(0) as usize + 1;
        assert_eq!(mesh.vertices[2 * vps + 1].position, [20.0, 502.0, 8.0]);
    }

    #[test]
    fn test_flat_mesh_normals_point_up() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let level = flat_level(config.level_size(0), 7.5);
        let mesh = builder.build(ChunkCoord::new(0, 0), 0, &level).unwrap();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_normals_unit_length_on_rough_terrain() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let size = config.level_size(0);
        let data: Vec<f32> = (0..size * size)
            .map(|i| ((i * 37 + 11) % 13) as f32)
            .collect();
        let level = HeightmapLevel::new(size, data);
        let mesh = builder.build(ChunkCoord::new(3, 3), 0, &level).unwrap();
        for v in &mesh.vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4, "normal length {len}");
            // Terrain is a height field: normals always face upward.
            assert!(v.normal[1] > 0.0);
        }
    }

    #[test]
    fn test_indices_in_range_and_winding_consistent() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let level = flat_level(config.level_size(1), 2.0);
        let mesh = builder.build(ChunkCoord::new(1, 2), 1, &level).unwrap();
        for tri in mesh.indices.chunks_exact(3) {
            for &i in tri {
                assert!((i as usize) < mesh.vertex_count());
            }
            // Counter-clockwise from above: +Y face normal.
            let p0 = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let p1 = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let p2 = Vec3::from(mesh.vertices[tri[2] as usize].position);
            assert!((p1 - p0).cross(p2 - p0).y > 0.0);
        }
    }

    #[test]
    fn test_lod_out_of_range_is_internal_error() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let level = flat_level(config.level_size(0), 0.0);
        let err = builder
            .build(ChunkCoord::new(0, 0), config.mesh.levels_of_detail, &level)
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_chunk_outside_level_is_internal_error() {
        let config = test_config();
        let builder = MeshBuilder::new(&config);
        let level = flat_level(config.level_size(0), 0.0);
        // max_chunk_coord = 4 for this config.
        let err = builder.build(ChunkCoord::new(4, 0), 0, &level).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        let err = builder.build(ChunkCoord::new(0, -1), 0, &level).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
