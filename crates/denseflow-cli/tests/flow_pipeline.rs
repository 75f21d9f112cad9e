use denseflow_cli::{
    densify, load_image_pair, write_flow_field, PipelineError, DENSIFY_RADIUS, MAX_TRACK_ERROR,
};
use denseflow_image::{Image, ImageSize};
use denseflow_imgproc::features::good_features_to_track;
use denseflow_imgproc::flow::{farneback, lucas_kanade, FarnebackParams, LucasKanadeParams};

fn square_image(size: usize, x0: usize, y0: usize, side: usize) -> Image<f32, 1> {
    let mut img = Image::<f32, 1>::from_size_val(
        ImageSize {
            width: size,
            height: size,
        },
        0.0,
    )
    .unwrap();
    for y in y0..(y0 + side).min(size) {
        for x in x0..(x0 + side).min(size) {
            img.set_pixel(x, y, 0, 255.0).unwrap();
        }
    }
    img
}

#[test]
fn dense_pipeline_identical_images() -> Result<(), PipelineError> {
    let tmp_dir = tempfile::tempdir()?;
    let path1 = tmp_dir.path().join("frame1.png");
    let path2 = tmp_dir.path().join("frame2.png");

    let frame = image::GrayImage::from_pixel(4, 4, image::Luma([128u8]));
    frame.save(&path1).expect("save frame1");
    frame.save(&path2).expect("save frame2");

    let (img1, img2) = load_image_pair(&path1, &path2)?;
    let prev = img1.cast::<f32>()?;
    let next = img2.cast::<f32>()?;

    let mut flow = Image::<f32, 2>::from_size_val(prev.size(), 0.0)?;
    farneback(&prev, &next, &mut flow, &FarnebackParams::default())?;

    let mut out = Vec::new();
    write_flow_field(&mut out, &flow)?;

    let text = String::from_utf8(out).expect("utf8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4 * 4 + 1);
    assert_eq!(lines[0], "4 4");
    for line in &lines[1..] {
        let mut parts = line.split(' ');
        let dx: f32 = parts.next().unwrap().parse().unwrap();
        let dy: f32 = parts.next().unwrap().parse().unwrap();
        assert!(dx.abs() < 1e-4 && dy.abs() < 1e-4, "nonzero flow: {line}");
    }

    Ok(())
}

#[test]
fn dense_pipeline_dimension_mismatch() -> Result<(), PipelineError> {
    let tmp_dir = tempfile::tempdir()?;
    let path1 = tmp_dir.path().join("frame1.png");
    let path2 = tmp_dir.path().join("frame2.png");

    image::GrayImage::new(4, 4).save(&path1).expect("save frame1");
    image::GrayImage::new(4, 5).save(&path2).expect("save frame2");

    let result = load_image_pair(&path1, &path2);
    assert!(matches!(result, Err(PipelineError::DimensionMismatch)));

    Ok(())
}

#[test]
fn sparse_pipeline_moving_square() -> Result<(), PipelineError> {
    let prev = square_image(64, 24, 24, 16);
    let next = square_image(64, 27, 26, 16);

    let corners = good_features_to_track(&prev, 1000, 0.01, 10.0)?;
    assert!(!corners.is_empty(), "no corners detected on the square");

    let points: Vec<[f32; 2]> = corners.iter().map(|c| [c.x, c.y]).collect();
    let tracks = lucas_kanade(&prev, &next, &points, &LucasKanadeParams::default())?;

    let accepted: Vec<usize> = tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.status && t.error < MAX_TRACK_ERROR)
        .map(|(i, _)| i)
        .collect();
    assert!(!accepted.is_empty(), "no tracks accepted");

    let flow = densify(prev.size(), &points, &tracks, MAX_TRACK_ERROR, DENSIFY_RADIUS)?;

    // the neighborhood of every accepted point carries roughly (3, 2)
    for &i in &accepted {
        let x = points[i][0] as usize;
        let y = points[i][1] as usize;
        let dx = flow.get_pixel(x, y, 0)?;
        let dy = flow.get_pixel(x, y, 1)?;
        assert!((dx - 3.0).abs() < 0.5, "dx at point {i}: {dx}");
        assert!((dy - 2.0).abs() < 0.5, "dy at point {i}: {dy}");
    }

    // every pixel beyond chebyshev distance 4 of all accepted points is zero
    let radius = DENSIFY_RADIUS as i64;
    for y in 0..64i64 {
        for x in 0..64i64 {
            let covered = accepted.iter().any(|&i| {
                let cx = points[i][0] as i64;
                let cy = points[i][1] as i64;
                (x - cx).abs() <= radius && (y - cy).abs() <= radius
            });
            if !covered {
                assert_eq!(flow.get_pixel(x as usize, y as usize, 0)?, 0.0);
                assert_eq!(flow.get_pixel(x as usize, y as usize, 1)?, 0.0);
            }
        }
    }

    Ok(())
}

#[test]
fn sparse_pipeline_flat_images_print_zero_field() -> Result<(), PipelineError> {
    let size = ImageSize {
        width: 16,
        height: 16,
    };
    let flat = Image::<f32, 1>::from_size_val(size, 100.0)?;

    let corners = good_features_to_track(&flat, 1000, 0.01, 10.0)?;
    assert!(corners.is_empty());

    // the fallback grid is tracked instead, every point is rejected on the
    // textureless pair and the printed field stays all zero
    let points = denseflow_cli::fallback_grid(size, denseflow_cli::FALLBACK_GRID_STEP);
    assert_eq!(points.len(), 4);

    let tracks = lucas_kanade(&flat, &flat, &points, &LucasKanadeParams::default())?;
    let flow = densify(size, &points, &tracks, MAX_TRACK_ERROR, DENSIFY_RADIUS)?;

    let mut out = Vec::new();
    write_flow_field(&mut out, &flow)?;

    let text = String::from_utf8(out).expect("utf8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 16 * 16 + 1);
    assert_eq!(lines[0], "16 16");
    assert!(lines[1..].iter().all(|line| *line == "0 0"));

    Ok(())
}
