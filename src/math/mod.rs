//! Math utilities for terrain geometry

pub mod aabb;

pub use aabb::Aabb;
