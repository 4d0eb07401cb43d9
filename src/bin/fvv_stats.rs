use volconv::io::fvv::{FvvVolume, DATA_TYPE_HALF, GRID_TYPE_SPARSE};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <volume.fvv>", args[0]);
        std::process::exit(1);
    }

    let volume = match FvvVolume::from_file(&args[1]) {
        Ok(volume) => volume,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let header = &volume.header;
    let data_type = if header.data_type == DATA_TYPE_HALF {
        "half"
    } else {
        "float"
    };
    let grid_type = if header.grid_type == GRID_TYPE_SPARSE {
        "sparse"
    } else {
        "dense"
    };

    println!("Version: {}", header.version);
    println!("Data type: {}", data_type);
    println!("Grid type: {}", grid_type);
    if header.grid_type == GRID_TYPE_SPARSE {
        println!("Sub-cell size: {}", header.sub_cell_size);
    }
    println!(
        "Resolution: {}x{}x{} ({} voxels)",
        header.res_x,
        header.res_y,
        header.res_z,
        volume.voxels().len()
    );
    println!(
        "Bounds: ({:.6}, {:.6}, {:.6}) - ({:.6}, {:.6}, {:.6})",
        header.bb_min[0],
        header.bb_min[1],
        header.bb_min[2],
        header.bb_max[0],
        header.bb_max[1],
        header.bb_max[2]
    );

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    let mut non_zero = 0usize;

    for v in volume.voxels() {
        if *v < min {
            min = *v;
        }
        if *v > max {
            max = *v;
        }
        if *v != 0.0 {
            non_zero += 1;
        }
        sum += *v as f64;
    }

    let n = volume.voxels().len() as f64;
    println!("Min value: {:.6}", min);
    println!("Max value: {:.6}", max);
    println!("Mean value: {:.6}", sum / n);
    println!(
        "Non-zero voxels: {} ({:.2}%)",
        non_zero,
        100.0 * non_zero as f64 / n
    );
}
