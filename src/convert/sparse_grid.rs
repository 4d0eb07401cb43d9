// Copyright @yucwang 2026

use crate::io::sample::Sample;
use crate::math::constants::{Float, UInt};

/// One cubic block of the sparse grid. The backing array is only allocated
/// once a non-zero value lands inside the block; blocks covering empty space
/// cost nothing beyond their dimensions.
pub struct SparseSubCell<S> {
    res_x: UInt,
    res_y: UInt,
    res_z: UInt,
    res_xy: UInt,
    data: Option<Vec<S>>,
}

impl<S: Sample> SparseSubCell<S> {
    fn new(res_x: UInt, res_y: UInt, res_z: UInt) -> Self {
        Self {
            res_x,
            res_y,
            res_z,
            res_xy: res_x * res_y,
            data: None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn allocate_if_needed(&mut self) {
        if self.data.is_none() {
            let size = (self.res_xy * self.res_z) as usize;
            self.data = Some(vec![S::default(); size]);
        }
    }

    // local coordinates within the cell; assumes the data is allocated
    fn set_voxel_value(&mut self, i: UInt, j: UInt, k: UInt, value: S) {
        let overall_index = (i + j * self.res_x + k * self.res_xy) as usize;
        if let Some(data) = self.data.as_mut() {
            data[overall_index] = value;
        }
    }

    pub fn voxel_value(&self, i: UInt, j: UInt, k: UInt) -> Float {
        match self.data.as_ref() {
            Some(data) => data[(i + j * self.res_x + k * self.res_xy) as usize].to_float(),
            None => 0.0,
        }
    }

    pub fn res_x(&self) -> UInt {
        self.res_x
    }

    pub fn res_y(&self) -> UInt {
        self.res_y
    }

    pub fn res_z(&self) -> UInt {
        self.res_z
    }

    pub fn res_xy(&self) -> UInt {
        self.res_xy
    }

    pub fn voxel_count(&self) -> usize {
        (self.res_xy * self.res_z) as usize
    }

    pub fn raw_data(&self) -> Option<&[S]> {
        self.data.as_deref()
    }

    fn free_memory(&mut self) {
        self.data = None;
    }
}

/// A block-partitioned 3D index over a dense voxel-resolution volume.
///
/// Every block exists up front so lookups stay a flat index computation,
/// but a block only allocates its payload when a non-zero value is written
/// into it. Blocks are laid out i-fastest, then j, then k; the tail block
/// on each axis is clipped to the remaining resolution.
pub struct SparseGrid<S> {
    cells: Vec<SparseSubCell<S>>,

    overall_res_x: UInt,
    overall_res_y: UInt,
    overall_res_z: UInt,

    // the cell size is the same in all 3 dimensions
    cell_size: UInt,

    cell_count_x: UInt,
    cell_count_y: UInt,
    cell_count_z: UInt,
    cell_count_xy: UInt,
}

impl<S: Sample> SparseGrid<S> {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            overall_res_x: 0,
            overall_res_y: 0,
            overall_res_z: 0,
            cell_size: 0,
            cell_count_x: 0,
            cell_count_y: 0,
            cell_count_z: 0,
            cell_count_xy: 0,
        }
    }

    pub fn resize_grid(
        &mut self,
        overall_res_x: UInt,
        overall_res_y: UInt,
        overall_res_z: UInt,
        cell_size: UInt,
    ) {
        self.cells.clear();

        self.overall_res_x = overall_res_x;
        self.overall_res_y = overall_res_y;
        self.overall_res_z = overall_res_z;

        self.cell_size = cell_size;

        self.cell_count_x = overall_res_x / cell_size + (overall_res_x % cell_size > 0) as UInt;
        self.cell_count_y = overall_res_y / cell_size + (overall_res_y % cell_size > 0) as UInt;
        self.cell_count_z = overall_res_z / cell_size + (overall_res_z % cell_size > 0) as UInt;
        self.cell_count_xy = self.cell_count_x * self.cell_count_y;

        for k in 0..self.cell_count_z {
            let cell_size_z = cell_size.min(overall_res_z - k * cell_size);
            for j in 0..self.cell_count_y {
                let cell_size_y = cell_size.min(overall_res_y - j * cell_size);
                for i in 0..self.cell_count_x {
                    let cell_size_x = cell_size.min(overall_res_x - i * cell_size);
                    self.cells
                        .push(SparseSubCell::new(cell_size_x, cell_size_y, cell_size_z));
                }
            }
        }
    }

    /// Frees every cell's payload without discarding the cell layout, so the
    /// grid can be refilled for the next output grid of the same resolution.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.free_memory();
        }
    }

    /// Writes one voxel at a grid-global coordinate. Zero values are never
    /// stored: zero is the implicit background, and a block touched only by
    /// zeros must stay unallocated. Coordinates must lie within the overall
    /// resolution set by `resize_grid`.
    pub fn set_voxel_value(&mut self, i: UInt, j: UInt, k: UInt, value: Float) {
        if value == 0.0 {
            return;
        }

        let cell_index_i = i / self.cell_size;
        let cell_voxel_i = i - cell_index_i * self.cell_size;

        let cell_index_j = j / self.cell_size;
        let cell_voxel_j = j - cell_index_j * self.cell_size;

        let cell_index_k = k / self.cell_size;
        let cell_voxel_k = k - cell_index_k * self.cell_size;

        let cell_index =
            (cell_index_i + cell_index_j * self.cell_count_x + cell_index_k * self.cell_count_xy)
                as usize;

        let cell = &mut self.cells[cell_index];
        cell.allocate_if_needed();
        cell.set_voxel_value(cell_voxel_i, cell_voxel_j, cell_voxel_k, S::from_float(value));
    }

    /// Checked read-back of a voxel; unallocated blocks read as 0.
    pub fn voxel_value(&self, i: UInt, j: UInt, k: UInt) -> Float {
        if i >= self.overall_res_x || j >= self.overall_res_y || k >= self.overall_res_z {
            return 0.0;
        }

        let cell_index_i = i / self.cell_size;
        let cell_index_j = j / self.cell_size;
        let cell_index_k = k / self.cell_size;

        let cell_index =
            (cell_index_i + cell_index_j * self.cell_count_x + cell_index_k * self.cell_count_xy)
                as usize;

        self.cells[cell_index].voxel_value(
            i - cell_index_i * self.cell_size,
            j - cell_index_j * self.cell_size,
            k - cell_index_k * self.cell_size,
        )
    }

    pub fn cells(&self) -> &[SparseSubCell<S>] {
        &self.cells
    }

    pub fn cell_size(&self) -> UInt {
        self.cell_size
    }

    pub fn cell_count_x(&self) -> UInt {
        self.cell_count_x
    }

    pub fn cell_count_y(&self) -> UInt {
        self.cell_count_y
    }

    pub fn cell_count_z(&self) -> UInt {
        self.cell_count_z
    }
}

impl<S: Sample> Default for SparseGrid<S> {
    fn default() -> Self {
        Self::new()
    }
}
