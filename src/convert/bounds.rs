// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector3f, Vector3i};
use crate::source::GridSource;

// Sentinel corner magnitude, larger than any plausible voxel coordinate.
const BOUND_LIMIT: Float = 5000.0;

/// Accumulates an axis-aligned voxel-space bounding box across one or more
/// source grids. Starts out inverted (min > max) and stays that way until
/// the first grid with active voxels is merged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridBounds {
    pub min: Vector3f,
    pub max: Vector3f,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            min: Vector3f::new(BOUND_LIMIT, BOUND_LIMIT, BOUND_LIMIT),
            max: Vector3f::new(-BOUND_LIMIT, -BOUND_LIMIT, -BOUND_LIMIT),
        }
    }
}

impl GridBounds {
    /// Widens the accumulator by the grid's active-voxel bounding box.
    /// Merging is commutative and associative; a grid without active voxels
    /// leaves the accumulator untouched.
    pub fn merge_grid(&mut self, grid: &dyn GridSource) {
        let (grid_min, grid_max) = match grid.active_bounds() {
            Some(bounds) => bounds,
            None => return,
        };

        for idx in 0..3 {
            self.min[idx] = self.min[idx].min(grid_min[idx] as Float);
            self.max[idx] = self.max[idx].max(grid_max[idx] as Float);
        }
    }

    pub fn is_valid(&self) -> bool {
        for idx in 0..3 {
            if self.min[idx] > self.max[idx] {
                return false;
            }
        }
        true
    }

    pub fn floor_min(&self) -> Vector3i {
        self.min.map(|v| v.floor() as i32)
    }

    pub fn floor_max(&self) -> Vector3i {
        self.max.map(|v| v.floor() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemoryGrid;

    fn grid_with_box(min: Vector3i, max: Vector3i) -> MemoryGrid {
        let res_x = (max[0] - min[0] + 1) as usize;
        let res_y = (max[1] - min[1] + 1) as usize;
        let res_z = (max[2] - min[2] + 1) as usize;
        let mut grid = MemoryGrid::new(min, res_x, res_y, res_z);
        grid.set(min[0], min[1], min[2], 1.0);
        grid.set(max[0], max[1], max[2], 1.0);
        grid
    }

    #[test]
    fn default_bounds_are_invalid() {
        let bounds = GridBounds::default();
        assert!(!bounds.is_valid());
    }

    #[test]
    fn single_merge_takes_grid_box() {
        let grid = grid_with_box(Vector3i::new(-2, 0, 3), Vector3i::new(4, 5, 7));
        let mut bounds = GridBounds::default();
        bounds.merge_grid(&grid);

        assert!(bounds.is_valid());
        assert_eq!(bounds.floor_min(), Vector3i::new(-2, 0, 3));
        assert_eq!(bounds.floor_max(), Vector3i::new(4, 5, 7));
    }

    #[test]
    fn merge_is_order_independent() {
        let a = grid_with_box(Vector3i::new(-5, 1, 0), Vector3i::new(2, 3, 9));
        let b = grid_with_box(Vector3i::new(0, -4, 2), Vector3i::new(8, 2, 4));

        let mut ab = GridBounds::default();
        ab.merge_grid(&a);
        ab.merge_grid(&b);

        let mut ba = GridBounds::default();
        ba.merge_grid(&b);
        ba.merge_grid(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.floor_min(), Vector3i::new(-5, -4, 0));
        assert_eq!(ab.floor_max(), Vector3i::new(8, 3, 9));
    }

    #[test]
    fn empty_grid_leaves_accumulator_unchanged() {
        let empty = MemoryGrid::new(Vector3i::new(0, 0, 0), 4, 4, 4);
        let mut bounds = GridBounds::default();
        bounds.merge_grid(&empty);
        assert!(!bounds.is_valid());

        let grid = grid_with_box(Vector3i::new(1, 1, 1), Vector3i::new(2, 2, 2));
        bounds.merge_grid(&grid);
        bounds.merge_grid(&empty);
        assert_eq!(bounds.floor_min(), Vector3i::new(1, 1, 1));
        assert_eq!(bounds.floor_max(), Vector3i::new(2, 2, 2));
    }
}
