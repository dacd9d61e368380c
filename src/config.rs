//! Terrain configuration bundle and derived quantities.
//!
//! Every derived quantity (chunk width, per-level sizes, world-space scale
//! multipliers, flat-array offsets) is computed here and nowhere else, so the
//! heightmap engine, mesh builder and chunk manager always agree on them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// What happens to chunks that leave the active window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Chunks are kept forever once materialized. Matches the historical
    /// behavior this engine replaces; memory grows with every area visited.
    Never,
    /// Remove chunks whose Chebyshev distance from the viewer chunk exceeds
    /// `chunks_to_calculate + hysteresis`. The hysteresis band avoids
    /// evict/rebuild churn at the window edge.
    OutsideWindow { hysteresis: i32 },
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::OutsideWindow { hysteresis: 2 }
    }
}

/// Clamp applied to the random offset inside diamond-square.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetClamp {
    /// Clamp the signed offset into `[0, max_height]`, discarding its
    /// negative half. This reproduces the historical generator: surfaces
    /// only ever rise above local averages. Kept as the default so existing
    /// seeds keep their look.
    #[default]
    ZeroFloor,
    /// Keep the offset in `[-roughness, +roughness]`.
    Signed,
}

/// Chunk grid and streaming-window parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkParameters {
    /// Chunk side length is `2^chunk_size_factor` base-grid cells. Range [1, 8].
    pub chunk_size_factor: u32,
    /// Radius of the square chunk window around the viewer. Range [1, 50].
    pub chunks_to_calculate: i32,
    /// Width in chunks of each concentric LOD ring. Range [1, 6].
    pub level_width: i32,
    /// Eviction policy for chunks leaving the window.
    pub eviction: EvictionPolicy,
}

impl Default for ChunkParameters {
    fn default() -> Self {
        Self {
            chunk_size_factor: 4,
            chunks_to_calculate: 6,
            level_width: 2,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Terrain extent and resolution parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainMeshVariables {
    /// The base grid has `2^detail_factor` cells per side. Range [1, 16].
    pub detail_factor: u32,
    /// Number of pyramid levels, level 0 finest. Range [1, 5].
    pub levels_of_detail: u32,
    /// World-space width of the whole terrain, in meters.
    pub terrain_width: f32,
    /// Elevation ceiling; all heights land in `[0, max_height]`.
    pub max_height: f32,
}

impl Default for TerrainMeshVariables {
    fn default() -> Self {
        Self {
            detail_factor: 8,
            levels_of_detail: 4,
            terrain_width: 1024.0,
            max_height: 80.0,
        }
    }
}

/// Fractal noise parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainHeightmapVariables {
    /// Roughness amplitude at the top of the subdivision, in height units.
    pub base_noise: f32,
    /// Seed for the generator's private PRNG stream.
    pub random_seed: u64,
    /// Offset clamp policy (see [`OffsetClamp`]).
    pub offset_clamp: OffsetClamp,
}

impl Default for TerrainHeightmapVariables {
    fn default() -> Self {
        Self {
            base_noise: 30.0,
            random_seed: 12345,
            offset_clamp: OffsetClamp::default(),
        }
    }
}

/// The full configuration bundle supplied at startup.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub chunk: ChunkParameters,
    pub mesh: TerrainMeshVariables,
    pub heightmap: TerrainHeightmapVariables,
}

impl TerrainConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all parameter ranges and cross-field constraints.
    ///
    /// Runs before any generation starts; a failure here is the only way
    /// configuration problems surface.
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunk;
        let m = &self.mesh;

        if !(1..=8).contains(&c.chunk_size_factor) {
            return Err(config_err(format!(
                "chunk_size_factor {} outside [1, 8]",
                c.chunk_size_factor
            )));
        }
        if !(1..=50).contains(&c.chunks_to_calculate) {
            return Err(config_err(format!(
                "chunks_to_calculate {} outside [1, 50]",
                c.chunks_to_calculate
            )));
        }
        if !(1..=6).contains(&c.level_width) {
            return Err(config_err(format!(
                "level_width {} outside [1, 6]",
                c.level_width
            )));
        }
        if let EvictionPolicy::OutsideWindow { hysteresis } = c.eviction {
            if hysteresis < 0 {
                return Err(config_err(format!("eviction hysteresis {hysteresis} negative")));
            }
        }
        if !(1..=16).contains(&m.detail_factor) {
            return Err(config_err(format!(
                "detail_factor {} outside [1, 16]",
                m.detail_factor
            )));
        }
        if !(1..=5).contains(&m.levels_of_detail) {
            return Err(config_err(format!(
                "levels_of_detail {} outside [1, 5]",
                m.levels_of_detail
            )));
        }
        if !(m.terrain_width > 0.0) || !m.terrain_width.is_finite() {
            return Err(config_err(format!(
                "terrain_width {} must be finite and positive",
                m.terrain_width
            )));
        }
        if !(m.max_height >= 0.0) || !m.max_height.is_finite() {
            return Err(config_err(format!(
                "max_height {} must be finite and non-negative",
                m.max_height
            )));
        }
        if !self.heightmap.base_noise.is_finite() {
            return Err(config_err(format!(
                "base_noise {} must be finite",
                self.heightmap.base_noise
            )));
        }
        // The chunk grid must tile the base grid.
        if c.chunk_size_factor > m.detail_factor {
            return Err(config_err(format!(
                "chunk_size_factor {} exceeds detail_factor {}",
                c.chunk_size_factor, m.detail_factor
            )));
        }
        // The coarsest level must still leave at least one cell per chunk.
        if m.levels_of_detail - 1 > c.chunk_size_factor {
            return Err(config_err(format!(
                "levels_of_detail {} too deep for chunk_size_factor {}",
                m.levels_of_detail, c.chunk_size_factor
            )));
        }
        Ok(())
    }

    /// Cells per side of the base (level 0) grid: `2^detail_factor`.
    pub fn mesh_detail(&self) -> u32 {
        1 << self.mesh.detail_factor
    }

    /// Vertices per side of the base grid: `2^detail_factor + 1`.
    pub fn base_size(&self) -> usize {
        self.mesh_detail() as usize + 1
    }

    /// Base-grid cells per chunk side: `2^chunk_size_factor`.
    pub fn chunk_width(&self) -> u32 {
        1 << self.chunk.chunk_size_factor
    }

    /// Exclusive upper bound of valid chunk coordinates on both axes.
    pub fn max_chunk_coord(&self) -> i32 {
        1 << (self.mesh.detail_factor - self.chunk.chunk_size_factor)
    }

    /// World-space size of one base-grid cell.
    pub fn base_cell_size(&self) -> f32 {
        self.mesh.terrain_width / self.mesh_detail() as f32
    }

    /// World-space size of one chunk.
    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_width() as f32 * self.base_cell_size()
    }

    /// World-space cell size at the given pyramid level.
    pub fn width_multiplier(&self, level: u32) -> f32 {
        self.base_cell_size() * (1u32 << level) as f32
    }

    /// Vertices per side of the given pyramid level.
    pub fn level_size(&self, level: u32) -> usize {
        (self.mesh_detail() >> level) as usize + 1
    }

    /// Total vertex count of the given pyramid level.
    pub fn level_vertex_count(&self, level: u32) -> usize {
        let side = self.level_size(level);
        side * side
    }

    /// Offset of the given level inside the flattened level-packed array.
    pub fn level_offset(&self, level: u32) -> usize {
        (0..level).map(|l| self.level_vertex_count(l)).sum()
    }

    /// Vertex count across all pyramid levels.
    pub fn total_vertex_count(&self) -> usize {
        (0..self.mesh.levels_of_detail)
            .map(|l| self.level_vertex_count(l))
            .sum()
    }

    /// Cells per chunk side at the given LOD: `chunk_width / 2^lod`.
    pub fn cells_per_chunk(&self, lod: u32) -> u32 {
        self.chunk_width() >> lod
    }
}

fn config_err(message: String) -> Error {
    Error::Configuration(message)
}
