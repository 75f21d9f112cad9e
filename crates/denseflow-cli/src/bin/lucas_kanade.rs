use std::io::Write;

use denseflow_cli::{
    densify, fallback_grid, load_image_pair, write_flow_field, PipelineError, DENSIFY_RADIUS,
    FALLBACK_GRID_STEP, MAX_TRACK_ERROR,
};
use denseflow_imgproc::features::good_features_to_track;
use denseflow_imgproc::flow::{lucas_kanade, LucasKanadeParams};

fn run(path1: &str, path2: &str) -> Result<(), PipelineError> {
    let (img1, img2) = load_image_pair(path1, path2)?;

    let prev = img1.cast::<f32>()?;
    let next = img2.cast::<f32>()?;

    let corners = good_features_to_track(&prev, 1000, 0.01, 10.0)?;
    let points: Vec<[f32; 2]> = if corners.is_empty() {
        log::debug!("no corners found, tracking a uniform grid instead");
        fallback_grid(prev.size(), FALLBACK_GRID_STEP)
    } else {
        corners.iter().map(|c| [c.x, c.y]).collect()
    };
    log::debug!("tracking {} candidate points", points.len());

    let tracks = lucas_kanade(&prev, &next, &points, &LucasKanadeParams::default())?;
    let flow = densify(prev.size(), &points, &tracks, MAX_TRACK_ERROR, DENSIFY_RADIUS)?;

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
