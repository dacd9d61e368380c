//! Viewer-driven chunk materialization
//!
//! Each tick the manager scans the square window around the viewer chunk,
//! assigns every in-bounds coordinate a LOD by ring distance, and rebuilds
//! whatever is missing or meshed at the wrong LOD. Builds fan out over a
//! rayon pool against the shared immutable pyramid; results are committed
//! to the chunk map in a single-threaded phase, so the most recently
//! requested LOD per coordinate is always the one that ends up installed.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::config::{EvictionPolicy, TerrainConfig};
use crate::core::{Error, Result};
use crate::heightmap::{HeightmapEngine, HeightmapPyramid};
use crate::mesh::{Mesh, MeshBuilder};

use super::chunk::{Chunk, ChunkCoord};
use super::lod::lod_for_offset;

/// What one call to [`ChunkManager::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Chunks materialized for the first time
    pub created: usize,
    /// Chunks rebuilt because their LOD changed
    pub rebuilt: usize,
    /// Chunks removed by the eviction policy
    pub evicted: usize,
}

impl UpdateStats {
    /// True when the tick changed nothing.
    pub fn is_idle(&self) -> bool {
        self.created == 0 && self.rebuilt == 0 && self.evicted == 0
    }
}

/// Owns the materialized chunk set and drives creation/rebuild/eviction.
pub struct ChunkManager {
    config: TerrainConfig,
    pyramid: HeightmapPyramid,
    builder: MeshBuilder,
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl ChunkManager {
    /// Validate the configuration and build the heightmap pyramid.
    ///
    /// The pyramid is generated once here; it is immutable afterwards and
    /// shared read-only by every mesh build.
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;
        let pyramid = HeightmapEngine::new(config.mesh, config.heightmap).generate();
        log::info!(
            "heightmap pyramid ready: {} levels, {} vertices, seed {}",
            pyramid.level_count(),
            pyramid.total_vertex_count(),
            config.heightmap.random_seed,
        );
        Ok(Self {
            builder: MeshBuilder::new(&config),
            config,
            pyramid,
            chunks: HashMap::new(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn pyramid(&self) -> &HeightmapPyramid {
        &self.pyramid
    }

    /// The currently materialized chunks, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// The chunk coordinate containing the viewer's XZ position.
    pub fn viewer_chunk(&self, viewer_pos: Vec3) -> ChunkCoord {
        ChunkCoord::from_world_pos(
            Vec2::new(viewer_pos.x, viewer_pos.z),
            self.config.chunk_world_size(),
        )
    }

    /// Re-evaluate the chunk window around the viewer position.
    ///
    /// Scans the full window every tick; coordinates outside the terrain
    /// bounds are skipped, coordinates whose materialized LOD already
    /// matches are left untouched.
    pub fn update(&mut self, viewer_pos: Vec3) -> Result<UpdateStats> {
        let center = self.viewer_chunk(viewer_pos);
        let radius = self.config.chunk.chunks_to_calculate;
        let max_coord = self.config.max_chunk_coord();
        let levels = self.config.mesh.levels_of_detail;
        let level_width = self.config.chunk.level_width;

        // Phase 1: scan the window, collect coordinates needing work.
        let mut dirty: Vec<(ChunkCoord, u32)> = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let coord = ChunkCoord::new(center.x + dx, center.y + dy);
                if coord.x < 0 || coord.y < 0 || coord.x >= max_coord || coord.y >= max_coord {
                    continue;
                }
                let lod = lod_for_offset(dx, dy, level_width, levels);
                match self.chunks.get(&coord) {
                    Some(chunk) if chunk.lod == lod => {}
                    _ => dirty.push((coord, lod)),
                }
            }
        }

        // Phase 2: build meshes in parallel against the shared pyramid.
        let built: Vec<(ChunkCoord, u32, Mesh)> = dirty
            .par_iter()
            .map(|&(coord, lod)| {
                let level = self.pyramid.level(lod).ok_or_else(|| {
                    Error::Internal(format!("no pyramid level for LOD {lod}"))
                })?;
                let mesh = self.builder.build(coord, lod, level)?;
                Ok((coord, lod, mesh))
            })
            .collect::<Result<_>>()?;

        // Phase 3: single-threaded commit. Replacing a chunk drops its old
        // mesh here, before the tick returns.
        let mut stats = UpdateStats::default();
        for (coord, lod, mesh) in built {
            if self.chunks.insert(coord, Chunk::new(coord, lod, mesh)).is_some() {
                stats.rebuilt += 1;
            } else {
                stats.created += 1;
            }
        }

        // Phase 4: eviction.
        if let EvictionPolicy::OutsideWindow { hysteresis } = self.config.chunk.eviction {
            let keep = radius + hysteresis;
            let before = self.chunks.len();
            self.chunks.retain(|coord, _| {
                (coord.x - center.x).abs() <= keep && (coord.y - center.y).abs() <= keep
            });
            stats.evicted = before - self.chunks.len();
        }

        if !stats.is_idle() {
            log::debug!(
                "chunk update at ({}, {}): {} created, {} rebuilt, {} evicted, {} loaded",
                center.x,
                center.y,
                stats.created,
                stats.rebuilt,
                stats.evicted,
                self.chunks.len(),
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 33x33 base grid, 4-cell chunks, 8x8 chunk grid, 3 LOD levels.
    fn test_config() -> TerrainConfig {
        let mut config = TerrainConfig::default();
        config.mesh.detail_factor = 5;
        config.mesh.levels_of_detail = 3;
        config.mesh.terrain_width = 128.0;
        config.mesh.max_height = 20.0;
        config.chunk.chunk_size_factor = 2;
        config.chunk.chunks_to_calculate = 2;
        config.chunk.level_width = 1;
        config.chunk.eviction = EvictionPolicy::Never;
        config
    }

    /// World-space center of a chunk for this config (chunk size 16).
    fn chunk_center(x: i32, y: i32) -> Vec3 {
        Vec3::new(x as f32 * 16.0 + 8.0, 0.0, y as f32 * 16.0 + 8.0)
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = test_config();
        config.chunk.chunks_to_calculate = 0;
        assert!(matches!(
            ChunkManager::new(config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_first_tick_materializes_window() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        let stats = manager.update(chunk_center(4, 4)).unwrap();

        // Full 5x5 window fits inside the 8x8 chunk grid.
        assert_eq!(stats.created, 25);
        assert_eq!(stats.rebuilt, 0);
        assert_eq!(manager.loaded_count(), 25);

        // Center chunk at finest LOD, corner of the window coarser.
        assert_eq!(manager.chunk(ChunkCoord::new(4, 4)).unwrap().lod, 0);
        assert_eq!(
            manager.chunk(ChunkCoord::new(6, 6)).unwrap().lod,
            lod_for_offset(2, 2, 1, 3)
        );
    }

    #[test]
    fn test_window_clipped_at_terrain_bounds() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        manager.update(chunk_center(0, 0)).unwrap();

        // Only the 3x3 in-bounds quadrant materializes.
        assert_eq!(manager.loaded_count(), 9);
        for chunk in manager.chunks() {
            assert!(chunk.coord.x >= 0 && chunk.coord.y >= 0);
        }
        assert!(manager.chunk(ChunkCoord::new(-1, 0)).is_none());
    }

    #[test]
    fn test_far_edge_clipped() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        manager.update(chunk_center(7, 7)).unwrap();
        assert_eq!(manager.loaded_count(), 9);
        for chunk in manager.chunks() {
            assert!(chunk.coord.x < 8 && chunk.coord.y < 8);
        }
    }

    #[test]
    fn test_repeat_tick_is_idle() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        manager.update(chunk_center(4, 4)).unwrap();
        let stats = manager.update(chunk_center(4, 4)).unwrap();
        assert!(stats.is_idle());
    }

    #[test]
    fn test_lod_change_rebuilds_with_new_mesh() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        manager.update(chunk_center(2, 2)).unwrap();

        let coord = ChunkCoord::new(4, 2);
        let before = manager.chunk(coord).unwrap();
        assert_eq!(before.lod, lod_for_offset(2, 0, 1, 3));
        let before_verts = before.mesh.vertex_count();

        // Move the viewer onto the chunk: it becomes LOD 0.
        let stats = manager.update(chunk_center(4, 2)).unwrap();
        assert!(stats.rebuilt >= 1);

        let after = manager.chunk(coord).unwrap();
        assert_eq!(after.lod, 0);
        assert_ne!(after.mesh.vertex_count(), before_verts);

        // Vertex count matches the new LOD exactly: k=4 at LOD 0.
        assert_eq!(after.mesh.vertex_count(), 25);
        assert_eq!(after.mesh.indices.len(), 6 * 16);
    }

    #[test]
    fn test_never_evict_retains_chunks_outside_window() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        manager.update(chunk_center(1, 1)).unwrap();
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_some());

        manager.update(chunk_center(6, 6)).unwrap();
        // (0, 0) is far outside the window but still loaded.
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_some());
    }

    #[test]
    fn test_outside_window_eviction() {
        let mut config = test_config();
        config.chunk.eviction = EvictionPolicy::OutsideWindow { hysteresis: 0 };
        let mut manager = ChunkManager::new(config).unwrap();

        manager.update(chunk_center(1, 1)).unwrap();
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_some());

        let stats = manager.update(chunk_center(6, 6)).unwrap();
        assert!(stats.evicted > 0);
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_none());

        // Everything still loaded is inside the keep band.
        for chunk in manager.chunks() {
            assert!((chunk.coord.x - 6).abs() <= 2 && (chunk.coord.y - 6).abs() <= 2);
        }
    }

    #[test]
    fn test_hysteresis_keeps_border_chunks() {
        let mut config = test_config();
        config.chunk.eviction = EvictionPolicy::OutsideWindow { hysteresis: 2 };
        let mut manager = ChunkManager::new(config).unwrap();

        manager.update(chunk_center(2, 2)).unwrap();
        // Step one chunk over: (0, 0) is now at Chebyshev distance 3,
        // outside the window (radius 2) but inside the keep band (4).
        let stats = manager.update(chunk_center(3, 3)).unwrap();
        assert_eq!(stats.evicted, 0);
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_some());
    }

    #[test]
    fn test_lod_assignments_follow_rings() {
        let mut manager = ChunkManager::new(test_config()).unwrap();
        let center = ChunkCoord::new(4, 4);
        manager.update(chunk_center(center.x, center.y)).unwrap();

        for chunk in manager.chunks() {
            let dx = chunk.coord.x - center.x;
            let dy = chunk.coord.y - center.y;
            assert_eq!(chunk.lod, lod_for_offset(dx, dy, 1, 3));
        }
    }

    #[test]
    fn test_identical_seeds_build_identical_pyramids() {
        let a = ChunkManager::new(test_config()).unwrap();
        let b = ChunkManager::new(test_config()).unwrap();
        assert_eq!(a.pyramid(), b.pyramid());
    }
}
