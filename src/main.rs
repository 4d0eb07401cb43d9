// Copyright @yucwang 2026

#![allow(dead_code)]

mod convert;
mod io;
mod math;
mod source;

use self::convert::converter::VolumeConverter;

use std::env;

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: {} <source.vol> <dest.fvv> [--half] [--sparse] [--cell-size N] [--value-mul F] [--size-mul F] [--seq] [--start N] [--end N]",
            args[0]
        );
        std::process::exit(1);
    }

    let source_path = &args[1];
    let dest_path = &args[2];

    let mut converter = VolumeConverter::new();
    let mut sequence = false;
    let mut start_frame: u32 = 1;
    let mut end_frame: u32 = 1;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--half" => {
                converter.set_store_as_half(true);
            }
            "--sparse" => {
                converter.set_use_sparse_grids(true);
            }
            "--cell-size" => {
                i += 1;
                if let Some(v) = args.get(i).and_then(|v| v.parse::<u16>().ok()) {
                    converter.set_sub_cell_size(v);
                }
            }
            "--value-mul" => {
                i += 1;
                if let Some(v) = args.get(i).and_then(|v| v.parse::<f32>().ok()) {
                    converter.set_value_multiplier(v);
                }
            }
            "--size-mul" => {
                i += 1;
                if let Some(v) = args.get(i).and_then(|v| v.parse::<f32>().ok()) {
                    converter.set_size_multiplier(v);
                }
            }
            "--seq" => {
                sequence = true;
            }
            "--start" => {
                i += 1;
                start_frame = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(1);
            }
            "--end" => {
                i += 1;
                end_frame = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(1);
            }
            _ => {}
        }
        i += 1;
    }

    // a sequence needs a frame placeholder on both sides
    if sequence && (!source_path.contains('#') || !dest_path.contains('#')) {
        sequence = false;
    }

    let result = if sequence {
        converter.convert_sequence(source_path, dest_path, start_frame, end_frame)
    } else {
        converter.convert_single(source_path, dest_path)
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
