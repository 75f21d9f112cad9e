#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use std::io::Write;
use std::path::Path;

use denseflow_image::{Image, ImageError, ImageSize};
use denseflow_imgproc::flow::TrackedPoint;
use denseflow_io::IoError;

/// Radius of the neighborhood a tracked point propagates its displacement to.
pub const DENSIFY_RADIUS: isize = 4;

/// Tracking residuals at or above this value are discarded.
pub const MAX_TRACK_ERROR: f32 = 50.0;

/// Spacing of the fallback candidate grid when no corners are found.
pub const FALLBACK_GRID_STEP: usize = 8;

/// An error type for the flow pipelines.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Error when an input image cannot be loaded.
    #[error("Could not load images. {0}")]
    LoadImage(#[from] IoError),

    /// Error when the two input images differ in size.
    #[error("Images must have the same dimensions")]
    DimensionMismatch,

    /// Error from an image operation.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error writing the flow field to the output stream.
    #[error("Failed to write the flow field. {0}")]
    Output(#[from] std::io::Error),
}

/// Load two grayscale images and validate that their dimensions match.
///
/// # Arguments
///
/// * `path1` - Path to the first image.
/// * `path2` - Path to the second image.
///
/// # Returns
///
/// The two images, converted to single channel 8-bit.
pub fn load_image_pair(
    path1: impl AsRef<Path>,
    path2: impl AsRef<Path>,
) -> Result<(Image<u8, 1>, Image<u8, 1>), PipelineError> {
    let img1 = denseflow_io::read_image_gray8(path1)?;
    let img2 = denseflow_io::read_image_gray8(path2)?;

    if img1.size() != img2.size() {
        return Err(PipelineError::DimensionMismatch);
    }

    Ok((img1, img2))
}

/// Generate a uniform grid of candidate points covering the whole image.
///
/// Used as a fallback when corner detection comes back empty; any image with
/// at least one pixel yields at least the point (0, 0).
pub fn fallback_grid(size: ImageSize, step: usize) -> Vec<[f32; 2]> {
    let mut points = Vec::new();
    for y in (0..size.height).step_by(step) {
        for x in (0..size.width).step_by(step) {
            points.push([x as f32, y as f32]);
        }
    }
    points
}

/// Densify sparse tracking results into a full flow field.
///
/// Every successfully tracked point with a residual below `max_error`
/// writes its displacement into the square neighborhood of `radius` pixels
/// around its (truncated) source coordinate, clipped to the image bounds.
/// Points are applied in input order, so later points overwrite earlier
/// ones where neighborhoods overlap. Cells no accepted point reaches stay
/// at (0, 0).
///
/// # Arguments
///
/// * `size` - Size of the flow field to synthesize.
/// * `points` - The tracked source coordinates.
/// * `tracks` - Tracking results, parallel to `points`.
/// * `max_error` - Acceptance threshold on the tracking residual.
/// * `radius` - Neighborhood radius in pixels.
pub fn densify(
    size: ImageSize,
    points: &[[f32; 2]],
    tracks: &[TrackedPoint],
    max_error: f32,
    radius: isize,
) -> Result<Image<f32, 2>, PipelineError> {
    let mut flow = Image::<f32, 2>::from_size_val(size, 0.0)?;

    let cols = size.width as isize;
    let rows = size.height as isize;
    let flow_data = flow.as_slice_mut();

    for (point, track) in points.iter().zip(tracks.iter()) {
        if !track.status || track.error >= max_error {
            continue;
        }

        let dx = track.next[0] - point[0];
        let dy = track.next[1] - point[1];

        let cx = point[0] as isize;
        let cy = point[1] as isize;
        for ny in (cy - radius).max(0)..=(cy + radius).min(rows - 1) {
            for nx in (cx - radius).max(0)..=(cx + radius).min(cols - 1) {
                let idx = (ny * cols + nx) as usize * 2;
                flow_data[idx] = dx;
                flow_data[idx + 1] = dy;
            }
        }
    }

    Ok(flow)
}

/// Write a flow field to the output stream in the line oriented text format.
///
/// The first line holds `<height> <width>`; it is followed by one
/// `<dx> <dy>` line per pixel in row-major order.
pub fn write_flow_field(writer: &mut impl Write, flow: &Image<f32, 2>) -> std::io::Result<()> {
    writeln!(writer, "{} {}", flow.height(), flow.width())?;

    for chunk in flow.as_slice().chunks_exact(2) {
        writeln!(writer, "{} {}", chunk[0], chunk[1])?;
    }

    Ok(())
}
