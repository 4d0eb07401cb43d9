// Copyright @yucwang 2026

use crate::math::constants::{Float, Int, Vector3i};
use crate::source::{GridContainer, GridSource};
use std::fs;
use std::path::{Path, PathBuf};

/// A scalar grid loaded from a Mitsuba-style binary `.vol` file.
///
/// Only encoding 1 (32-bit float) with a single channel is accepted; the
/// converter has no use for vector-valued grids.
pub struct VolGrid {
    data: Vec<Float>,
    xres: usize,
    yres: usize,
    zres: usize,
    active_bounds: Option<(Vector3i, Vector3i)>,
}

impl VolGrid {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let bytes = fs::read(path).map_err(|e| format!("failed to read {}: {}", path, e))?;
        let mut cursor = 4usize;

        if bytes.len() < 4 {
            return Err("vol file too small".to_string());
        }
        if &bytes[0..3] != b"VOL" {
            return Err("invalid vol header".to_string());
        }
        let version = bytes[3];
        if version != 3 {
            return Err(format!("unsupported vol version: {}", version));
        }

        let encoding = read_i32(&bytes, &mut cursor)?;
        let xres = read_i32(&bytes, &mut cursor)?;
        let yres = read_i32(&bytes, &mut cursor)?;
        let zres = read_i32(&bytes, &mut cursor)?;
        let channels = read_i32(&bytes, &mut cursor)?;

        if encoding != 1 {
            return Err(format!("unsupported vol encoding: {}", encoding));
        }
        if xres <= 0 || yres <= 0 || zres <= 0 {
            return Err("vol dimensions must be positive".to_string());
        }
        if channels != 1 {
            return Err(format!("expected a scalar grid, got {} channels", channels));
        }

        // world-space box; the converter works in voxel space and ignores it
        for _ in 0..6 {
            read_f32(&bytes, &mut cursor)?;
        }

        let xres = xres as usize;
        let yres = yres as usize;
        let zres = zres as usize;
        let total = xres
            .checked_mul(yres)
            .and_then(|v| v.checked_mul(zres))
            .ok_or_else(|| "vol dimensions overflow".to_string())?;
        let mut data = vec![0.0 as Float; total];

        for z in 0..zres {
            for y in 0..yres {
                for x in 0..xres {
                    let v = read_f32(&bytes, &mut cursor)?;
                    data[x + y * xres + z * xres * yres] = v;
                }
            }
        }

        let active_bounds = scan_active_bounds(&data, xres, yres, zres);

        Ok(Self {
            data,
            xres,
            yres,
            zres,
            active_bounds,
        })
    }

    fn fetch(&self, x: usize, y: usize, z: usize) -> Float {
        self.data[x + y * self.xres + z * self.xres * self.yres]
    }
}

impl GridSource for VolGrid {
    fn active_bounds(&self) -> Option<(Vector3i, Vector3i)> {
        self.active_bounds
    }

    fn value_at(&self, i: Int, j: Int, k: Int) -> Float {
        if i < 0 || j < 0 || k < 0 {
            return 0.0;
        }
        let (x, y, z) = (i as usize, j as usize, k as usize);
        if x >= self.xres || y >= self.yres || z >= self.zres {
            return 0.0;
        }
        self.fetch(x, y, z)
    }
}

// The file format stores every voxel; the active set is whatever is non-zero.
fn scan_active_bounds(
    data: &[Float],
    xres: usize,
    yres: usize,
    zres: usize,
) -> Option<(Vector3i, Vector3i)> {
    let mut min = Vector3i::new(Int::MAX, Int::MAX, Int::MAX);
    let mut max = Vector3i::new(Int::MIN, Int::MIN, Int::MIN);
    let mut any = false;

    for z in 0..zres {
        for y in 0..yres {
            for x in 0..xres {
                if data[x + y * xres + z * xres * yres] == 0.0 {
                    continue;
                }
                any = true;
                let p = Vector3i::new(x as Int, y as Int, z as Int);
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

/// A source container on disk: either a single `.vol` file (one grid, named
/// after the file stem) or a directory of `.vol` files (one grid each).
pub struct VolContainer {
    grids: Vec<(String, PathBuf)>,
}

impl VolContainer {
    pub fn open(path: &str) -> Result<Self, String> {
        let meta =
            fs::metadata(path).map_err(|e| format!("can't open volume source {}: {}", path, e))?;

        let mut grids = Vec::new();

        if meta.is_dir() {
            let entries =
                fs::read_dir(path).map_err(|e| format!("can't read directory {}: {}", path, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| format!("can't read directory {}: {}", path, e))?;
                let file_path = entry.path();
                if file_path.extension().and_then(|e| e.to_str()) != Some("vol") {
                    continue;
                }
                if let Some(name) = grid_name_of(&file_path) {
                    grids.push((name, file_path));
                }
            }
            grids.sort_by(|a, b| a.0.cmp(&b.0));
        } else if let Some(name) = grid_name_of(Path::new(path)) {
            grids.push((name, PathBuf::from(path)));
        }

        if grids.is_empty() {
            return Err(format!("no volume grids found in {}", path));
        }

        Ok(Self { grids })
    }
}

impl GridContainer for VolContainer {
    fn grid_names(&self) -> Vec<String> {
        self.grids.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_grid(&self, name: &str) -> Result<Box<dyn GridSource>, String> {
        let path = self
            .grids
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
            .ok_or_else(|| format!("no grid named {} in this container", name))?;
        let path = path
            .to_str()
            .ok_or_else(|| format!("non-utf8 path for grid {}", name))?;
        Ok(Box::new(VolGrid::from_file(path)?))
    }
}

fn grid_name_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

fn read_i32(bytes: &[u8], cursor: &mut usize) -> Result<i32, String> {
    if *cursor + 4 > bytes.len() {
        return Err("unexpected eof while reading i32".to_string());
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*cursor..*cursor + 4]);
    *cursor += 4;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32(bytes: &[u8], cursor: &mut usize) -> Result<Float, String> {
    if *cursor + 4 > bytes.len() {
        return Err("unexpected eof while reading f32".to_string());
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*cursor..*cursor + 4]);
    *cursor += 4;
    Ok(Float::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_vol(path: &PathBuf, data: &[f32], xres: i32, yres: i32, zres: i32) {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"VOL");
        bytes.push(3u8);
        bytes.extend_from_slice(&1i32.to_le_bytes()); // encoding
        bytes.extend_from_slice(&xres.to_le_bytes());
        bytes.extend_from_slice(&yres.to_le_bytes());
        bytes.extend_from_slice(&zres.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes()); // channels
        for v in [0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(path, bytes).expect("write vol");
    }

    #[test]
    fn vol_grid_values_and_bounds() {
        let mut path = std::env::temp_dir();
        path.push("vol_grid_values_and_bounds.vol");
        // 3x2x2, non-zero values only at x in 1..=2, y == 1, z == 0
        let mut data = vec![0.0f32; 12];
        data[1 + 1 * 3] = 4.0;
        data[2 + 1 * 3] = 8.0;
        write_test_vol(&path, &data, 3, 2, 2);

        let grid = VolGrid::from_file(path.to_str().unwrap()).expect("load vol");
        let (bmin, bmax) = grid.active_bounds().expect("active bounds");
        assert_eq!(bmin, Vector3i::new(1, 1, 0));
        assert_eq!(bmax, Vector3i::new(2, 1, 0));

        assert_eq!(grid.value_at(1, 1, 0), 4.0);
        assert_eq!(grid.value_at(2, 1, 0), 8.0);
        assert_eq!(grid.value_at(0, 0, 0), 0.0);
        // outside the stored extent falls back to background
        assert_eq!(grid.value_at(-1, 0, 0), 0.0);
        assert_eq!(grid.value_at(3, 0, 0), 0.0);
    }

    #[test]
    fn vol_grid_all_zero_has_no_bounds() {
        let mut path = std::env::temp_dir();
        path.push("vol_grid_all_zero.vol");
        write_test_vol(&path, &[0.0f32; 8], 2, 2, 2);

        let grid = VolGrid::from_file(path.to_str().unwrap()).expect("load vol");
        assert!(grid.active_bounds().is_none());
    }

    #[test]
    fn vol_grid_rejects_bad_magic() {
        let mut path = std::env::temp_dir();
        path.push("vol_grid_bad_magic.vol");
        std::fs::write(&path, b"NOTAVOLFILE").expect("write file");
        assert!(VolGrid::from_file(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn single_file_container_is_named_after_stem() {
        let mut path = std::env::temp_dir();
        path.push("flow.vol");
        write_test_vol(&path, &[1.0f32; 8], 2, 2, 2);

        let container = VolContainer::open(path.to_str().unwrap()).expect("open container");
        assert_eq!(container.grid_names(), vec!["flow".to_string()]);
        let grid = container.read_grid("flow").expect("read grid");
        assert_eq!(grid.value_at(0, 0, 0), 1.0);
    }

    #[test]
    fn directory_container_lists_each_vol_file() {
        let mut dir = std::env::temp_dir();
        dir.push("vol_container_dir_test");
        std::fs::create_dir_all(&dir).expect("create dir");
        write_test_vol(&dir.join("density.vol"), &[1.0f32; 8], 2, 2, 2);
        write_test_vol(&dir.join("temperature.vol"), &[2.0f32; 8], 2, 2, 2);

        let container = VolContainer::open(dir.to_str().unwrap()).expect("open container");
        assert_eq!(
            container.grid_names(),
            vec!["density".to_string(), "temperature".to_string()]
        );
        assert!(container.read_grid("velocity").is_err());
    }
}
