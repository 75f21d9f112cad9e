//! Feature detection and keypoint extraction.
//!
//! This module provides the minimum-eigenvalue (Shi-Tomasi) corner response
//! and a corner selector on top of it, used to seed sparse optical flow
//! tracking with well textured points.

use denseflow_image::{Image, ImageError};

use crate::filter::{box_blur, spatial_gradient};

/// Represents a detected corner point in an image with its position and score.
///
/// This structure stores the (x, y) coordinates of a corner point along with
/// a score that indicates the corner's strength.
#[derive(Copy, Clone, Debug)]
pub struct Corner {
    /// The x-coordinate of the corner in the image.
    pub x: f32,
    /// The y-coordinate of the corner in the image.
    pub y: f32,
    /// A measure of the corner's strength or distinctiveness.
    pub score: f32,
}

impl Corner {
    /// Creates a new corner with the specified coordinates and score.
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Corner { x, y, score }
    }
}

/// Compute the minimum eigenvalue response of an image.
///
/// For every pixel the structure tensor is accumulated over a 3x3 block and
/// the response is the smaller eigenvalue of the tensor. Large values mark
/// pixels whose neighborhood has strong gradients in two directions.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dst` - The destination image with shape (H, W).
pub fn min_eigenvalue_response(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let mut dx = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    let mut dy = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    spatial_gradient(src, &mut dx, &mut dy)?;

    // structure tensor entries, averaged over the block
    let mut tensor = Image::<f32, 3>::from_size_val(src.size(), 0.0)?;
    {
        let tensor_data = tensor.as_slice_mut();
        for (i, (&gx, &gy)) in dx.as_slice().iter().zip(dy.as_slice().iter()).enumerate() {
            tensor_data[i * 3] = gx * gx;
            tensor_data[i * 3 + 1] = gy * gy;
            tensor_data[i * 3 + 2] = gx * gy;
        }
    }
    let mut tensor_sum = Image::<f32, 3>::from_size_val(src.size(), 0.0)?;
    box_blur(&tensor, &mut tensor_sum, (3, 3))?;

    let tensor_data = tensor_sum.as_slice();
    for (i, out) in dst.as_slice_mut().iter_mut().enumerate() {
        let gxx = tensor_data[i * 3];
        let gyy = tensor_data[i * 3 + 1];
        let gxy = tensor_data[i * 3 + 2];
        let delta = gxx - gyy;
        *out = 0.5 * (gxx + gyy - (delta * delta + 4.0 * gxy * gxy).sqrt());
    }

    Ok(())
}

/// Find the strongest corners in an image.
///
/// Candidates are pixels whose minimum eigenvalue response is a local 3x3
/// maximum and exceeds `quality_level` times the best response in the image.
/// The surviving candidates are scanned in order of decreasing response and
/// accepted while they keep at least `min_distance` pixels to every corner
/// accepted before them, until `max_corners` corners are collected.
///
/// An image without any texture yields an empty vector.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `max_corners` - Upper bound on the number of returned corners.
/// * `quality_level` - Fraction of the best response a corner must reach.
/// * `min_distance` - Minimum euclidean distance between accepted corners.
pub fn good_features_to_track(
    src: &Image<f32, 1>,
    max_corners: usize,
    quality_level: f32,
    min_distance: f32,
) -> Result<Vec<Corner>, ImageError> {
    let mut response = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    min_eigenvalue_response(src, &mut response)?;

    let rows = src.rows();
    let cols = src.cols();
    let response_data = response.as_slice();

    let max_response = response_data.iter().cloned().fold(0.0f32, f32::max);
    if max_response <= 0.0 {
        return Ok(Vec::new());
    }
    let threshold = max_response * quality_level;

    // local maxima above the quality threshold
    let mut candidates = Vec::new();
    for y in 0..rows {
        for x in 0..cols {
            let val = response_data[y * cols + x];
            if val <= threshold || val <= 0.0 {
                continue;
            }
            let mut is_local_max = true;
            'nms: for ny in y.saturating_sub(1)..(y + 2).min(rows) {
                for nx in x.saturating_sub(1)..(x + 2).min(cols) {
                    if (ny, nx) != (y, x) && response_data[ny * cols + nx] > val {
                        is_local_max = false;
                        break 'nms;
                    }
                }
            }
            if is_local_max {
                candidates.push(Corner::new(x as f32, y as f32, val));
            }
        }
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    // greedy selection with minimum distance enforcement
    let min_dist_sq = min_distance * min_distance;
    let mut corners: Vec<Corner> = Vec::new();
    for candidate in candidates {
        if corners.len() >= max_corners {
            break;
        }
        let too_close = corners.iter().any(|c| {
            let dx = c.x - candidate.x;
            let dy = c.y - candidate.y;
            dx * dx + dy * dy < min_dist_sq
        });
        if !too_close {
            corners.push(candidate);
        }
    }

    Ok(corners)
}
