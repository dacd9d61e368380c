//! Viewer-driven chunk streaming and LOD management

pub mod chunk;
pub mod lod;
pub mod manager;

pub use chunk::{Chunk, ChunkCoord};
pub use lod::lod_for_offset;
pub use manager::{ChunkManager, UpdateStats};
