use std::io::Write;

use denseflow_cli::{load_image_pair, write_flow_field, PipelineError};
use denseflow_image::Image;
use denseflow_imgproc::flow::{farneback, FarnebackParams};

fn run(path1: &str, path2: &str) -> Result<(), PipelineError> {
    let (img1, img2) = load_image_pair(path1, path2)?;

    let prev = img1.cast::<f32>()?;
    let next = img2.cast::<f32>()?;

    let mut flow = Image::<f32, 2>::from_size_val(prev.size(), 0.0)?;
    farneback(&prev, &next, &mut flow, &FarnebackParams::default())?;

    let stdout = std::io::stdout();
    let mut writer = std::io::BufWriter::new(stdout.lock());
    write_flow_field(&mut writer, &flow)?;
    writer.flush()?;

    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <image1> <image2>", args[0]);
        std::process::exit(1);
    }

    if let Err(err) = run(&args[1], &args[2]) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
