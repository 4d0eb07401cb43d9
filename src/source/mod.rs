// Copyright @yucwang 2026

pub mod memory;
pub mod vol_container;

use crate::math::constants::{Float, Int, Vector3i};

/// A single scalar voxel grid held by a source container.
///
/// Coordinates are arbitrary signed integers; anything outside the active
/// set evaluates to the background value of 0.
pub trait GridSource {
    /// Inclusive integer bounding box of the active voxels, or `None` when
    /// the grid holds no active voxel at all.
    fn active_bounds(&self) -> Option<(Vector3i, Vector3i)>;

    fn value_at(&self, i: Int, j: Int, k: Int) -> Float;
}

/// A source volume container: one or more named grids read from one place.
pub trait GridContainer {
    fn grid_names(&self) -> Vec<String>;

    fn read_grid(&self, name: &str) -> Result<Box<dyn GridSource>, String>;
}
