// Copyright @yucwang 2026

//! Writer and reader for the flat voxel volume (FVV) format.
//!
//! Version 2 layout, all fields little-endian:
//! version u8, data_type u8 (0 = f32, 1 = f16), grid_type u8 (0 = dense,
//! 1 = sparse), sub_cell_size u16 (sparse only), res u32 x3, bb_min f32 x3,
//! bb_max f32 x3, then the payload. Dense payloads store every voxel with X
//! fastest; sparse payloads store one marker byte per block in block order,
//! followed by the block's raw samples when the marker is 1. Block
//! dimensions are never stored; they are re-derived from the resolution,
//! the sub-cell size and the block's position. Version 1 files predate the
//! grid_type/sub_cell_size fields and are always dense.

use crate::convert::sparse_grid::SparseGrid;
use crate::io::sample::Sample;
use crate::math::constants::{Float, Vector3f};
use half::f16;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

pub const FORMAT_VERSION: u8 = 2;

pub const DATA_TYPE_FLOAT: u8 = 0;
pub const DATA_TYPE_HALF: u8 = 1;

pub const GRID_TYPE_DENSE: u8 = 0;
pub const GRID_TYPE_SPARSE: u8 = 1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FvvHeader {
    pub version: u8,
    pub data_type: u8,
    pub grid_type: u8,
    /// Block edge length; only meaningful when `grid_type` is sparse.
    pub sub_cell_size: u16,
    pub res_x: u32,
    pub res_y: u32,
    pub res_z: u32,
    pub bb_min: Vector3f,
    pub bb_max: Vector3f,
}

impl FvvHeader {
    pub fn dense<S: Sample>(res: (u32, u32, u32), bb_min: Vector3f, bb_max: Vector3f) -> Self {
        Self {
            version: FORMAT_VERSION,
            data_type: S::DATA_TYPE_ID,
            grid_type: GRID_TYPE_DENSE,
            sub_cell_size: 0,
            res_x: res.0,
            res_y: res.1,
            res_z: res.2,
            bb_min,
            bb_max,
        }
    }

    pub fn sparse<S: Sample>(
        sub_cell_size: u16,
        res: (u32, u32, u32),
        bb_min: Vector3f,
        bb_max: Vector3f,
    ) -> Self {
        Self {
            version: FORMAT_VERSION,
            data_type: S::DATA_TYPE_ID,
            grid_type: GRID_TYPE_SPARSE,
            sub_cell_size,
            res_x: res.0,
            res_y: res.1,
            res_z: res.2,
            bb_min,
            bb_max,
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.res_x as usize * self.res_y as usize * self.res_z as usize
    }
}

pub fn write_dense<S: Sample>(path: &str, header: &FvvHeader, voxels: &[S]) -> Result<(), String> {
    let file =
        File::create(path).map_err(|e| format!("couldn't open file {} for writing: {}", path, e))?;
    let mut writer = BufWriter::new(file);

    let result = write_header(&mut writer, header).and_then(|_| {
        for value in voxels {
            value.write_le(&mut writer)?;
        }
        writer.flush()
    });

    result.map_err(|e| format!("failed to write {}: {}", path, e))
}

pub fn write_sparse<S: Sample>(
    path: &str,
    header: &FvvHeader,
    grid: &SparseGrid<S>,
) -> Result<(), String> {
    let file =
        File::create(path).map_err(|e| format!("couldn't open file {} for writing: {}", path, e))?;
    let mut writer = BufWriter::new(file);

    // one marker byte per block; empty blocks contribute nothing further,
    // and block lengths are recoverable from the header alone
    let result = write_header(&mut writer, header).and_then(|_| {
        for cell in grid.cells() {
            match cell.raw_data() {
                None => writer.write_all(&[0u8])?,
                Some(data) => {
                    writer.write_all(&[1u8])?;
                    for value in data {
                        value.write_le(&mut writer)?;
                    }
                }
            }
        }
        writer.flush()
    });

    result.map_err(|e| format!("failed to write {}: {}", path, e))
}

fn write_header<W: Write>(writer: &mut W, header: &FvvHeader) -> io::Result<()> {
    writer.write_all(&[header.version, header.data_type, header.grid_type])?;
    if header.grid_type == GRID_TYPE_SPARSE {
        writer.write_all(&header.sub_cell_size.to_le_bytes())?;
    }
    for res in [header.res_x, header.res_y, header.res_z] {
        writer.write_all(&res.to_le_bytes())?;
    }
    for idx in 0..3 {
        writer.write_all(&header.bb_min[idx].to_le_bytes())?;
    }
    for idx in 0..3 {
        writer.write_all(&header.bb_max[idx].to_le_bytes())?;
    }
    Ok(())
}

/// An FVV file read back into memory. Sparse payloads are reconstructed
/// into a dense voxel array on load.
pub struct FvvVolume {
    pub header: FvvHeader,
    voxels: Vec<Float>,
}

impl FvvVolume {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let bytes = fs::read(path).map_err(|e| format!("failed to read {}: {}", path, e))?;
        let mut cursor = 0usize;

        let version = read_u8(&bytes, &mut cursor)?;
        let header = match version {
            1 => {
                let data_type = read_u8(&bytes, &mut cursor)?;
                let res = read_resolution(&bytes, &mut cursor)?;
                let (bb_min, bb_max) = read_bbox(&bytes, &mut cursor)?;
                FvvHeader {
                    version,
                    data_type,
                    grid_type: GRID_TYPE_DENSE,
                    sub_cell_size: 0,
                    res_x: res.0,
                    res_y: res.1,
                    res_z: res.2,
                    bb_min,
                    bb_max,
                }
            }
            2 => {
                let data_type = read_u8(&bytes, &mut cursor)?;
                let grid_type = read_u8(&bytes, &mut cursor)?;
                let sub_cell_size = if grid_type == GRID_TYPE_SPARSE {
                    read_u16(&bytes, &mut cursor)?
                } else {
                    0
                };
                let res = read_resolution(&bytes, &mut cursor)?;
                let (bb_min, bb_max) = read_bbox(&bytes, &mut cursor)?;
                FvvHeader {
                    version,
                    data_type,
                    grid_type,
                    sub_cell_size,
                    res_x: res.0,
                    res_y: res.1,
                    res_z: res.2,
                    bb_min,
                    bb_max,
                }
            }
            other => return Err(format!("unsupported fvv version: {}", other)),
        };

        if header.grid_type > GRID_TYPE_SPARSE {
            return Err(format!("unsupported fvv grid type: {}", header.grid_type));
        }
        if header.grid_type == GRID_TYPE_SPARSE && header.sub_cell_size == 0 {
            return Err("sparse fvv file with zero sub-cell size".to_string());
        }

        let voxels = match (header.grid_type, header.data_type) {
            (GRID_TYPE_DENSE, DATA_TYPE_FLOAT) => {
                read_dense_payload::<f32>(&bytes, &mut cursor, &header)?
            }
            (GRID_TYPE_DENSE, DATA_TYPE_HALF) => {
                read_dense_payload::<f16>(&bytes, &mut cursor, &header)?
            }
            (GRID_TYPE_SPARSE, DATA_TYPE_FLOAT) => {
                read_sparse_payload::<f32>(&bytes, &mut cursor, &header)?
            }
            (GRID_TYPE_SPARSE, DATA_TYPE_HALF) => {
                read_sparse_payload::<f16>(&bytes, &mut cursor, &header)?
            }
            _ => return Err(format!("unsupported fvv data type: {}", header.data_type)),
        };

        Ok(Self { header, voxels })
    }

    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Float {
        self.voxels[x + y * self.header.res_x as usize
            + z * self.header.res_x as usize * self.header.res_y as usize]
    }

    pub fn voxels(&self) -> &[Float] {
        &self.voxels
    }
}

fn read_dense_payload<S: Sample>(
    bytes: &[u8],
    cursor: &mut usize,
    header: &FvvHeader,
) -> Result<Vec<Float>, String> {
    let count = header.voxel_count();
    let mut voxels = Vec::with_capacity(count);
    for _ in 0..count {
        voxels.push(read_sample::<S>(bytes, cursor)?);
    }
    Ok(voxels)
}

fn read_sparse_payload<S: Sample>(
    bytes: &[u8],
    cursor: &mut usize,
    header: &FvvHeader,
) -> Result<Vec<Float>, String> {
    let res_x = header.res_x as usize;
    let res_y = header.res_y as usize;
    let res_z = header.res_z as usize;
    let cell = header.sub_cell_size as usize;

    let cell_count_x = (res_x + cell - 1) / cell;
    let cell_count_y = (res_y + cell - 1) / cell;
    let cell_count_z = (res_z + cell - 1) / cell;

    let mut voxels = vec![0.0 as Float; header.voxel_count()];

    for bk in 0..cell_count_z {
        let cell_z = cell.min(res_z - bk * cell);
        for bj in 0..cell_count_y {
            let cell_y = cell.min(res_y - bj * cell);
            for bi in 0..cell_count_x {
                let cell_x = cell.min(res_x - bi * cell);

                let marker = read_u8(bytes, cursor)?;
                match marker {
                    0 => {}
                    1 => {
                        for lk in 0..cell_z {
                            for lj in 0..cell_y {
                                for li in 0..cell_x {
                                    let value = read_sample::<S>(bytes, cursor)?;
                                    let gx = bi * cell + li;
                                    let gy = bj * cell + lj;
                                    let gz = bk * cell + lk;
                                    voxels[gx + gy * res_x + gz * res_x * res_y] = value;
                                }
                            }
                        }
                    }
                    other => return Err(format!("invalid sparse block marker: {}", other)),
                }
            }
        }
    }

    Ok(voxels)
}

fn read_sample<S: Sample>(bytes: &[u8], cursor: &mut usize) -> Result<Float, String> {
    if *cursor + S::BYTE_SIZE > bytes.len() {
        return Err("unexpected eof while reading voxel data".to_string());
    }
    let value = S::from_le_slice(&bytes[*cursor..*cursor + S::BYTE_SIZE]);
    *cursor += S::BYTE_SIZE;
    Ok(value.to_float())
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, String> {
    if *cursor >= bytes.len() {
        return Err("unexpected eof while reading u8".to_string());
    }
    let value = bytes[*cursor];
    *cursor += 1;
    Ok(value)
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, String> {
    if *cursor + 2 > bytes.len() {
        return Err("unexpected eof while reading u16".to_string());
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*cursor..*cursor + 2]);
    *cursor += 2;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, String> {
    if *cursor + 4 > bytes.len() {
        return Err("unexpected eof while reading u32".to_string());
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*cursor..*cursor + 4]);
    *cursor += 4;
    Ok(u32::from_le_bytes(buf))
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

fn read_resolution(bytes: &[u8], cursor: &mut usize) -> Result<(u32, u32, u32), String> {
    let res_x = read_u32(bytes, cursor)?;
    let res_y = read_u32(bytes, cursor)?;
    let res_z = read_u32(bytes, cursor)?;
    Ok((res_x, res_y, res_z))
}

fn read_bbox(bytes: &[u8], cursor: &mut usize) -> Result<(Vector3f, Vector3f), String> {
    let mut bb_min = Vector3f::zeros();
    let mut bb_max = Vector3f::zeros();
    for idx in 0..3 {
        bb_min[idx] = read_f32(bytes, cursor)?;
    }
    for idx in 0..3 {
        bb_max[idx] = read_f32(bytes, cursor)?;
    }
    Ok((bb_min, bb_max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        let mut path = std::env::temp_dir();
        path.push(name);
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn dense_float_round_trip() {
        let path = temp_path("fvv_dense_float.fvv");
        let voxels: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        let header = FvvHeader::dense::<f32>(
            (3, 2, 2),
            Vector3f::new(-1.0, -0.5, -0.25),
            Vector3f::new(1.0, 0.5, 0.25),
        );
        write_dense(&path, &header, &voxels).expect("write fvv");

        let volume = FvvVolume::from_file(&path).expect("read fvv");
        assert_eq!(volume.header, header);
        assert_eq!(volume.voxels(), voxels.as_slice());
        assert_eq!(volume.voxel(2, 1, 1), 5.5);
    }

    #[test]
    fn dense_half_round_trip() {
        let path = temp_path("fvv_dense_half.fvv");
        // values exactly representable in half precision
        let voxels: Vec<f16> = [0.0f32, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]
            .iter()
            .map(|v| f16::from_f32(*v))
            .collect();
        let header = FvvHeader::dense::<f16>(
            (2, 2, 2),
            Vector3f::new(-1.0, -1.0, -1.0),
            Vector3f::new(1.0, 1.0, 1.0),
        );
        write_dense(&path, &header, &voxels).expect("write fvv");

        let volume = FvvVolume::from_file(&path).expect("read fvv");
        assert_eq!(volume.header.data_type, DATA_TYPE_HALF);
        for (index, value) in volume.voxels().iter().enumerate() {
            assert_eq!(*value, index as Float * 0.5);
        }
    }

    #[test]
    fn sparse_reconstruction_matches_dense() {
        let dense_path = temp_path("fvv_compare_dense.fvv");
        let sparse_path = temp_path("fvv_compare_sparse.fvv");

        // 10x10x10 with a handful of scattered values, block size 4
        let res = (10u32, 10u32, 10u32);
        let mut voxels = vec![0.0f32; 1000];
        let mut grid = SparseGrid::<f32>::new();
        grid.resize_grid(res.0, res.1, res.2, 4);
        for (x, y, z, v) in [
            (0usize, 0usize, 0usize, 1.0f32),
            (9, 9, 9, 2.0),
            (5, 0, 3, 3.0),
            (3, 7, 8, 4.0),
        ] {
            voxels[x + y * 10 + z * 100] = v;
            grid.set_voxel_value(x as u32, y as u32, z as u32, v);
        }

        let bb_min = Vector3f::new(-1.0, -1.0, -1.0);
        let bb_max = Vector3f::new(1.0, 1.0, 1.0);
        write_dense(
            &dense_path,
            &FvvHeader::dense::<f32>(res, bb_min, bb_max),
            &voxels,
        )
        .expect("write dense");
        write_sparse(
            &sparse_path,
            &FvvHeader::sparse::<f32>(4, res, bb_min, bb_max),
            &grid,
        )
        .expect("write sparse");

        let dense = FvvVolume::from_file(&dense_path).expect("read dense");
        let sparse = FvvVolume::from_file(&sparse_path).expect("read sparse");

        assert_eq!(dense.header.grid_type, GRID_TYPE_DENSE);
        assert_eq!(sparse.header.grid_type, GRID_TYPE_SPARSE);
        assert_eq!(sparse.header.sub_cell_size, 4);
        assert_eq!(dense.voxels(), sparse.voxels());
    }

    #[test]
    fn empty_sparse_blocks_cost_one_byte() {
        let path = temp_path("fvv_sparse_markers.fvv");

        // 10^3 at block size 4 -> 27 blocks; a single non-zero voxel
        // allocates exactly one 4x4x4 block
        let mut grid = SparseGrid::<f32>::new();
        grid.resize_grid(10, 10, 10, 4);
        grid.set_voxel_value(1, 2, 3, 5.0);

        let header = FvvHeader::sparse::<f32>(
            4,
            (10, 10, 10),
            Vector3f::new(-1.0, -1.0, -1.0),
            Vector3f::new(1.0, 1.0, 1.0),
        );
        write_sparse(&path, &header, &grid).expect("write sparse");

        // header: 3 bytes + u16 + 3*u32 + 6*f32 = 41; payload: 27 markers
        // plus one full 64-voxel float block
        let expected_len = 41 + 27 + 64 * 4;
        let actual_len = std::fs::metadata(&path).expect("stat").len();
        assert_eq!(actual_len, expected_len as u64);

        let volume = FvvVolume::from_file(&path).expect("read sparse");
        assert_eq!(volume.voxel(1, 2, 3), 5.0);
        assert_eq!(volume.voxels().iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn version_one_files_parse_as_dense() {
        let path = temp_path("fvv_version_one.fvv");

        let mut bytes = Vec::new();
        bytes.push(1u8); // version
        bytes.push(0u8); // data type: float
        for res in [2u32, 2, 1] {
            bytes.extend_from_slice(&res.to_le_bytes());
        }
        for v in [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, bytes).expect("write v1 file");

        let volume = FvvVolume::from_file(&path).expect("read v1");
        assert_eq!(volume.header.version, 1);
        assert_eq!(volume.header.grid_type, GRID_TYPE_DENSE);
        assert_eq!(
            (volume.header.res_x, volume.header.res_y, volume.header.res_z),
            (2, 2, 1)
        );
        assert_eq!(volume.voxels(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let path = temp_path("fvv_truncated.fvv");
        let header = FvvHeader::dense::<f32>(
            (4, 4, 4),
            Vector3f::new(-1.0, -1.0, -1.0),
            Vector3f::new(1.0, 1.0, 1.0),
        );
        // payload shorter than the header promises
        write_dense(&path, &header, &[0.0f32; 8]).expect("write fvv");
        assert!(FvvVolume::from_file(&path).is_err());
    }
}
