// Copyright @yucwang 2026

use crate::math::constants::{Float, Int, Vector3i};
use crate::source::{GridContainer, GridSource};

/// An in-memory scalar grid anchored at an arbitrary (possibly negative)
/// minimum coordinate. Useful for building volumes programmatically and for
/// exercising the converter without touching the filesystem.
#[derive(Clone)]
pub struct MemoryGrid {
    origin: Vector3i,
    xres: usize,
    yres: usize,
    zres: usize,
    data: Vec<Float>,
}

impl MemoryGrid {
    pub fn new(origin: Vector3i, xres: usize, yres: usize, zres: usize) -> Self {
        Self {
            origin,
            xres,
            yres,
            zres,
            data: vec![0.0; xres * yres * zres],
        }
    }

    /// Stores a value at a world coordinate. Coordinates outside the grid's
    /// extent are ignored.
    pub fn set(&mut self, i: Int, j: Int, k: Int, value: Float) {
        if let Some(index) = self.index_of(i, j, k) {
            self.data[index] = value;
        }
    }

    fn index_of(&self, i: Int, j: Int, k: Int) -> Option<usize> {
        let x = i - self.origin[0];
        let y = j - self.origin[1];
        let z = k - self.origin[2];
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.xres || y >= self.yres || z >= self.zres {
            return None;
        }
        Some(x + y * self.xres + z * self.xres * self.yres)
    }
}

impl GridSource for MemoryGrid {
    fn active_bounds(&self) -> Option<(Vector3i, Vector3i)> {
        let mut min = Vector3i::new(Int::MAX, Int::MAX, Int::MAX);
        let mut max = Vector3i::new(Int::MIN, Int::MIN, Int::MIN);
        let mut any = false;

        for z in 0..self.zres {
            for y in 0..self.yres {
                for x in 0..self.xres {
                    if self.data[x + y * self.xres + z * self.xres * self.yres] == 0.0 {
                        continue;
                    }
                    any = true;
                    let p = Vector3i::new(
                        x as Int + self.origin[0],
                        y as Int + self.origin[1],
                        z as Int + self.origin[2],
                    );
                    for idx in 0..3 {
                        min[idx] = min[idx].min(p[idx]);
                        max[idx] = max[idx].max(p[idx]);
                    }
                }
            }
        }

        if any {
            Some((min, max))
        } else {
            None
        }
    }

    fn value_at(&self, i: Int, j: Int, k: Int) -> Float {
        match self.index_of(i, j, k) {
            Some(index) => self.data[index],
            None => 0.0,
        }
    }
}

/// An in-memory multi-grid container.
pub struct MemoryContainer {
    grids: Vec<(String, MemoryGrid)>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self { grids: Vec::new() }
    }

    pub fn insert(&mut self, name: &str, grid: MemoryGrid) {
        self.grids.push((name.to_string(), grid));
    }
}

impl Default for MemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl GridContainer for MemoryContainer {
    fn grid_names(&self) -> Vec<String> {
        self.grids.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_grid(&self, name: &str) -> Result<Box<dyn GridSource>, String> {
        self.grids
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, grid)| Box::new(grid.clone()) as Box<dyn GridSource>)
            .ok_or_else(|| format!("no grid named {} in this container", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_grid_negative_origin() {
        let mut grid = MemoryGrid::new(Vector3i::new(-3, -2, -1), 4, 4, 4);
        grid.set(-3, -2, -1, 1.0);
        grid.set(0, 1, 2, 2.0);

        assert_eq!(grid.value_at(-3, -2, -1), 1.0);
        assert_eq!(grid.value_at(0, 1, 2), 2.0);
        assert_eq!(grid.value_at(5, 5, 5), 0.0);

        let (bmin, bmax) = grid.active_bounds().expect("active bounds");
        assert_eq!(bmin, Vector3i::new(-3, -2, -1));
        assert_eq!(bmax, Vector3i::new(0, 1, 2));
    }

    #[test]
    fn empty_memory_grid_has_no_bounds() {
        let grid = MemoryGrid::new(Vector3i::new(0, 0, 0), 2, 2, 2);
        assert!(grid.active_bounds().is_none());
    }
}
