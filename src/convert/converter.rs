// Copyright @yucwang 2026

use crate::convert::bounds::GridBounds;
use crate::convert::sparse_grid::SparseGrid;
use crate::io::fvv::{self, FvvHeader};
use crate::io::sample::Sample;
use crate::math::constants::Float;
use crate::math::constants::Vector3f;
use crate::source::vol_container::VolContainer;
use crate::source::{GridContainer, GridSource};
use half::f16;
use indicatif::{ProgressBar, ProgressStyle};

/// Converts source voxel volumes into FVV files.
///
/// One converter value holds the output options; each `convert_*` call owns
/// its bounds accumulator and transient buffers, so calls are independent.
pub struct VolumeConverter {
    size_multiplier: Float,
    value_multiplier: Float,
    sub_cell_size: u16,

    store_as_half: bool,
    use_sparse_grids: bool,
}

impl VolumeConverter {
    pub fn new() -> Self {
        Self {
            size_multiplier: 2.0,
            value_multiplier: 1.0,
            sub_cell_size: 32,
            store_as_half: false,
            use_sparse_grids: false,
        }
    }

    pub fn set_size_multiplier(&mut self, size_multiplier: Float) {
        self.size_multiplier = size_multiplier;
    }

    pub fn set_value_multiplier(&mut self, value_multiplier: Float) {
        self.value_multiplier = value_multiplier;
    }

    pub fn set_store_as_half(&mut self, store_as_half: bool) {
        self.store_as_half = store_as_half;
    }

    pub fn set_use_sparse_grids(&mut self, use_sparse: bool) {
        self.use_sparse_grids = use_sparse;
    }

    pub fn set_sub_cell_size(&mut self, sub_cell_size: u16) {
        self.sub_cell_size = sub_cell_size;
    }

    pub fn convert_single(&self, src_path: &str, dst_path: &str) -> Result<(), String> {
        let container = VolContainer::open(src_path)?;
        self.convert_container(&container, dst_path)
    }

    /// Converts every exportable grid of an already-open container.
    pub fn convert_container(
        &self,
        container: &dyn GridContainer,
        dst_path: &str,
    ) -> Result<(), String> {
        let mut bounds = GridBounds::default();
        self.merge_container_bounds(container, &mut bounds);
        self.save_container(container, &bounds, dst_path)
    }

    /// Two-pass sequence conversion: the first pass merges the bounds of
    /// every grid in every frame, so all written frames share one
    /// resolution and extent; the second re-opens each frame and
    /// serializes it against the shared box. Frames that fail to open are
    /// logged and skipped in both passes.
    pub fn convert_sequence(
        &self,
        src_pattern: &str,
        dst_pattern: &str,
        start_frame: u32,
        end_frame: u32,
    ) -> Result<(), String> {
        if end_frame < start_frame {
            return Err(format!(
                "invalid frame range: {}..{}",
                start_frame, end_frame
            ));
        }
        let frame_count = (end_frame - start_frame + 1) as u64;

        let mut bounds = GridBounds::default();

        let progress = ProgressBar::new(frame_count);
        progress.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames (bounds)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        for frame in start_frame..=end_frame {
            let src_path = frame_file_name(src_pattern, frame)?;
            match VolContainer::open(&src_path) {
                Ok(container) => self.merge_container_bounds(&container, &mut bounds),
                Err(e) => log::warn!("skipping frame {}: {}", frame, e),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        if !bounds.is_valid() {
            return Err("no active voxels in any frame of the sequence".to_string());
        }

        let progress = ProgressBar::new(frame_count);
        progress.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames (write)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        for frame in start_frame..=end_frame {
            let src_path = frame_file_name(src_pattern, frame)?;
            let dst_path = frame_file_name(dst_pattern, frame)?;
            match VolContainer::open(&src_path) {
                Ok(container) => {
                    log::info!("Converting frame {}...", frame);
                    if let Err(e) = self.save_container(&container, &bounds, &dst_path) {
                        log::error!("frame {}: {}", frame, e);
                    }
                }
                Err(e) => log::warn!("skipping frame {}: {}", frame, e),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(())
    }

    // Every grid participates in the bounds, including ones that won't be
    // exported, so exported grids from one container line up spatially.
    fn merge_container_bounds(&self, container: &dyn GridContainer, bounds: &mut GridBounds) {
        for name in container.grid_names() {
            match container.read_grid(&name) {
                Ok(grid) => bounds.merge_grid(grid.as_ref()),
                Err(e) => log::warn!("skipping grid {}: {}", name, e),
            }
        }
    }

    fn save_container(
        &self,
        container: &dyn GridContainer,
        bounds: &GridBounds,
        dst_path: &str,
    ) -> Result<(), String> {
        if !bounds.is_valid() {
            return Err(format!(
                "no active voxels in any source grid, refusing to write {}",
                dst_path
            ));
        }

        let names = container.grid_names();

        // a single grid goes straight to the destination path
        if names.len() == 1 {
            log::info!("Converting single grid: {}...", names[0]);
            let grid = container.read_grid(&names[0])?;
            return self.save_grid(grid.as_ref(), bounds, dst_path);
        }

        let dot_pos = dst_path.rfind('.').ok_or_else(|| {
            format!(
                "destination path {} needs an extension to name multiple grids",
                dst_path
            )
        })?;
        let stem = &dst_path[..dot_pos];
        let ext = &dst_path[dot_pos..];

        // one failed grid doesn't stop the others; the first failure is
        // still reported to the caller
        let mut first_error = None;

        for name in &names {
            let save_path = match name.as_str() {
                "density" => format!("{}_den{}", stem, ext),
                "temperature" => format!("{}_temp{}", stem, ext),
                _ => continue,
            };

            log::info!("Converting grid: {}...", name);
            let result = container
                .read_grid(name)
                .and_then(|grid| self.save_grid(grid.as_ref(), bounds, &save_path));
            if let Err(e) = result {
                log::error!("grid {}: {}", name, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn save_grid(
        &self,
        grid: &dyn GridSource,
        bounds: &GridBounds,
        path: &str,
    ) -> Result<(), String> {
        if self.store_as_half {
            self.save_grid_as::<f16>(grid, bounds, path)
        } else {
            self.save_grid_as::<f32>(grid, bounds, path)
        }
    }

    fn save_grid_as<S: Sample>(
        &self,
        grid: &dyn GridSource,
        bounds: &GridBounds,
        path: &str,
    ) -> Result<(), String> {
        if self.use_sparse_grids && self.sub_cell_size == 0 {
            return Err("sparse output needs a non-zero sub-cell size".to_string());
        }

        let min = bounds.floor_min();
        let max = bounds.floor_max();

        let res_x = (max[0] - min[0] + 1) as u32;
        let res_y = (max[1] - min[1] + 1) as u32;
        let res_z = (max[2] - min[2] + 1) as u32;
        let res = (res_x, res_y, res_z);

        // fixed-aspect output-space box, symmetric around the origin
        let mut extent = Vector3f::new(res_x as Float, res_y as Float, res_z as Float);
        extent.normalize_mut();
        extent *= self.size_multiplier;
        let bb_min = -extent;
        let bb_max = extent;

        if !self.use_sparse_grids {
            let total_voxels = res_x as usize * res_y as usize * res_z as usize;
            let mut voxels = vec![S::default(); total_voxels];

            let mut write_index = 0usize;
            for k in min[2]..=max[2] {
                for j in min[1]..=max[1] {
                    for i in min[0]..=max[0] {
                        let value = grid.value_at(i, j, k) * self.value_multiplier;
                        voxels[write_index] = S::from_float(value);
                        write_index += 1;
                    }
                }
            }

            fvv::write_dense(path, &FvvHeader::dense::<S>(res, bb_min, bb_max), &voxels)
        } else {
            let mut sparse = SparseGrid::<S>::new();
            sparse.resize_grid(res_x, res_y, res_z, self.sub_cell_size as u32);

            // sparse indexing is relative to the bounding box, not to the
            // source grid's own coordinates
            for (k_index, k) in (min[2]..=max[2]).enumerate() {
                for (j_index, j) in (min[1]..=max[1]).enumerate() {
                    for (i_index, i) in (min[0]..=max[0]).enumerate() {
                        let value = grid.value_at(i, j, k) * self.value_multiplier;
                        sparse.set_voxel_value(
                            i_index as u32,
                            j_index as u32,
                            k_index as u32,
                            value,
                        );
                    }
                }
            }

            fvv::write_sparse(
                path,
                &FvvHeader::sparse::<S>(self.sub_cell_size, res, bb_min, bb_max),
                &sparse,
            )
        }
    }
}

impl Default for VolumeConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the first run of `#` characters with the zero-padded frame
/// number; the pad width is the run length.
pub fn frame_file_name(pattern: &str, frame: u32) -> Result<String, String> {
    let start = pattern
        .find('#')
        .ok_or_else(|| format!("path pattern {} has no # frame placeholder", pattern))?;
    let run = pattern[start..].bytes().take_while(|b| *b == b'#').count();

    Ok(format!(
        "{}{:0width$}{}",
        &pattern[..start],
        frame,
        &pattern[start + run..],
        width = run
    ))
}
