//! Diamond-square fractal subdivision
//!
//! Generates the finest grid by recursive subdivision with a seeded PRNG,
//! then derives every coarser level by subsampling. Coarser levels are never
//! regenerated, so `level[i][x, y] == level0[x * 2^i, y * 2^i]` holds
//! exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{OffsetClamp, TerrainHeightmapVariables, TerrainMeshVariables};

use super::{HeightmapLevel, HeightmapPyramid};

/// Deterministic fractal heightmap generator.
///
/// Identical parameters and seed always produce a bit-identical pyramid:
/// the PRNG is private and seeded, and subdivision visits squares in a fixed
/// order. The recursion writes each grid point exactly once; a parallel
/// "written" bitmap guards boundary points shared between sibling squares.
pub struct HeightmapEngine {
    mesh: TerrainMeshVariables,
    noise: TerrainHeightmapVariables,
}

impl HeightmapEngine {
    pub fn new(mesh: TerrainMeshVariables, noise: TerrainHeightmapVariables) -> Self {
        Self { mesh, noise }
    }

    /// Generate the full pyramid.
    pub fn generate(&self) -> HeightmapPyramid {
        let detail = 1usize << self.mesh.detail_factor;
        let size = detail + 1;
        let mut grid = vec![0.0f32; size * size];
        let mut written = vec![false; size * size];
        let mut rng = ChaCha8Rng::seed_from_u64(self.noise.random_seed);

        // Seed the four corners with independent draws in [0, max_height].
        for (x, y) in [(0, 0), (0, size - 1), (size - 1, 0), (size - 1, size - 1)] {
            grid[x * size + y] = rng.random::<f32>() * self.mesh.max_height;
            written[x * size + y] = true;
        }

        self.subdivide(
            &mut grid,
            &mut written,
            size,
            0,
            0,
            detail,
            self.noise.base_noise,
            &mut rng,
        );

        let mut levels = Vec::with_capacity(self.mesh.levels_of_detail as usize);
        levels.push(HeightmapLevel::new(size, grid));
        for level in 1..self.mesh.levels_of_detail {
            levels.push(subsample(&levels[0], level));
        }
        HeightmapPyramid::new(levels)
    }

    /// Subdivide the square with top-left corner (x, y) and side `width`.
    ///
    /// `width` is a power of two. Midpoints of this square double as corners
    /// of its four children, so every write checks the bitmap first.
    #[allow(clippy::too_many_arguments)]
    fn subdivide(
        &self,
        grid: &mut [f32],
        written: &mut [bool],
        size: usize,
        x: usize,
        y: usize,
        width: usize,
        roughness: f32,
        rng: &mut ChaCha8Rng,
    ) {
        if width <= 1 {
            return;
        }
        let half = width / 2;
        let (cx, cy) = (x + half, y + half);

        // Diamond step: center from the four corners.
        if !written[cx * size + cy] {
            let avg = (grid[x * size + y]
                + grid[(x + width) * size + y]
                + grid[x * size + y + width]
                + grid[(x + width) * size + y + width])
                / 4.0;
            grid[cx * size + cy] = self.displace(avg, roughness, rng);
            written[cx * size + cy] = true;
        }

        // Square step: each edge midpoint from its two adjacent corners and
        // the center.
        let center = grid[cx * size + cy];
        let edges = [
            (cx, y, grid[x * size + y], grid[(x + width) * size + y]),
            (x, cy, grid[x * size + y], grid[x * size + y + width]),
            (
                x + width,
                cy,
                grid[(x + width) * size + y],
                grid[(x + width) * size + y + width],
            ),
            (
                cx,
                y + width,
                grid[x * size + y + width],
                grid[(x + width) * size + y + width],
            ),
        ];
        for (ex, ey, a, b) in edges {
            if !written[ex * size + ey] {
                let avg = (a + b + center) / 3.0;
                grid[ex * size + ey] = self.displace(avg, roughness, rng);
                written[ex * size + ey] = true;
            }
        }

        // Recurse into the four children, each with freshly jittered
        // roughness, halved. Draw order is fixed for determinism.
        for (child_x, child_y) in [(x, y), (cx, y), (x, cy), (cx, cy)] {
            let child_roughness = jittered(roughness, rng) / 2.0;
            self.subdivide(
                grid, written, size, child_x, child_y, half, child_roughness, rng,
            );
        }
    }

    /// Average plus a random offset, clamped into `[0, max_height]`.
    fn displace(&self, avg: f32, roughness: f32, rng: &mut ChaCha8Rng) -> f32 {
        (avg + self.random_offset(roughness, rng)).clamp(0.0, self.mesh.max_height)
    }

    /// A signed draw scaled by roughness, clamped per the configured policy.
    fn random_offset(&self, roughness: f32, rng: &mut ChaCha8Rng) -> f32 {
        let raw = (rng.random::<f32>() * 2.0 - 1.0) * roughness;
        match self.noise.offset_clamp {
            OffsetClamp::ZeroFloor => raw.clamp(0.0, self.mesh.max_height),
            OffsetClamp::Signed => raw.clamp(-roughness.abs(), roughness.abs()),
        }
    }
}

/// Roughness perturbed by a jitter in ±1/8 of itself.
fn jittered(roughness: f32, rng: &mut ChaCha8Rng) -> f32 {
    (rng.random::<f32>() * 2.0 - 1.0) * (roughness / 8.0) + roughness
}

/// Subsample level 0 at stride `2^level`.
fn subsample(base: &HeightmapLevel, level: u32) -> HeightmapLevel {
    let stride = 1usize << level;
    let size = (base.size() - 1) / stride + 1;
    let mut data = Vec::with_capacity(size * size);
    for x in 0..size {
        for y in 0..size {
            data.push(base.get(x * stride, y * stride));
        }
    }
    HeightmapLevel::new(size, data)
}
