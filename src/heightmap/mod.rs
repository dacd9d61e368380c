//! Fractal heightmap synthesis and the multi-resolution pyramid

mod engine;

pub use engine::HeightmapEngine;

/// One immutable square elevation grid.
///
/// Side length is `(base_size - 1) / 2^level + 1` vertices. Values are
/// stored row-major with the x index first: `data[x * size + y]`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapLevel {
    size: usize,
    data: Vec<f32>,
}

impl HeightmapLevel {
    /// Wrap a raw grid. `data.len()` must equal `size * size`.
    pub fn new(size: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), size * size);
        Self { size, data }
    }

    /// Vertices per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Elevation at grid position (x, y). Panics when out of range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[x * self.size + y]
    }

    /// The raw row-major values.
    pub fn values(&self) -> &[f32] {
        &self.data
    }
}

/// The full set of precomputed heightmap levels, level 0 finest.
///
/// Built once by [`HeightmapEngine::generate`], then treated as read-only
/// and shared freely across any number of readers.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapPyramid {
    levels: Vec<HeightmapLevel>,
}

impl HeightmapPyramid {
    pub(crate) fn new(levels: Vec<HeightmapLevel>) -> Self {
        Self { levels }
    }

    /// The level for the given LOD, or `None` if out of range.
    pub fn level(&self, lod: u32) -> Option<&HeightmapLevel> {
        self.levels.get(lod as usize)
    }

    /// Number of levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total vertex count across all levels.
    pub fn total_vertex_count(&self) -> usize {
        self.levels.iter().map(|l| l.values().len()).sum()
    }

    /// All levels packed into one flat array, level 0 first.
    ///
    /// Level `l` starts at the flat-array offset from
    /// [`crate::config::TerrainConfig::level_offset`]. Cast to bytes with
    /// `bytemuck::cast_slice` for GPU upload.
    pub fn flatten(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.total_vertex_count());
        for level in &self.levels {
            flat.extend_from_slice(level.values());
        }
        flat
    }
}
