use denseflow_image::{Image, ImageError};
use rayon::prelude::*;

use crate::filter::spatial_gradient;
use crate::interpolation::bilinear_sample;
use crate::pyramid::build_pyramid;

/// Parameters for the pyramidal Lucas-Kanade tracker.
#[derive(Debug, Clone)]
pub struct LucasKanadeParams {
    /// Side length of the square tracking window, must be odd.
    pub win_size: usize,
    /// Number of pyramid levels above the full resolution image.
    pub max_level: usize,
    /// Maximum number of iterations per pyramid level.
    pub max_iters: usize,
    /// Stop iterating once the update falls below this length.
    pub epsilon: f32,
    /// Reject points whose normal matrix has a smaller scaled eigenvalue.
    pub min_eig_threshold: f32,
}

impl Default for LucasKanadeParams {
    fn default() -> Self {
        Self {
            win_size: 21,
            max_level: 3,
            max_iters: 30,
            epsilon: 0.01,
            min_eig_threshold: 1e-4,
        }
    }
}

/// Result of tracking a single feature point.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPoint {
    /// Estimated position of the point in the second image.
    pub next: [f32; 2],
    /// Whether the point was tracked successfully.
    pub status: bool,
    /// Mean absolute intensity residual over the window, lower is better.
    pub error: f32,
}

/// Compute sparse pyramidal Lucas-Kanade optical flow.
///
/// Each point from `points` is tracked from `prev` into `next` with a
/// coarse-to-fine Gauss-Newton iteration over a square window. Points whose
/// window lacks texture (degenerate normal matrix) or that leave the image
/// are reported with `status == false`.
///
/// # Arguments
///
/// * `prev` - Previous image (grayscale, 0-255 range).
/// * `next` - Next image, same size as `prev`.
/// * `points` - Feature points to track, in pixel coordinates of `prev`.
/// * `params` - Tracker parameters.
///
/// # Returns
///
/// One [`TrackedPoint`] per input point, in input order.
pub fn lucas_kanade(
    prev: &Image<f32, 1>,
    next: &Image<f32, 1>,
    points: &[[f32; 2]],
    params: &LucasKanadeParams,
) -> Result<Vec<TrackedPoint>, ImageError> {
    if prev.size() != next.size() {
        return Err(ImageError::InvalidImageSize(
            prev.cols(),
            prev.rows(),
            next.cols(),
            next.rows(),
        ));
    }
    assert!(params.win_size % 2 == 1, "window size must be odd");

    let prev_pyr = build_pyramid(prev, params.max_level, params.win_size)?;
    let next_pyr = build_pyramid(next, params.max_level, params.win_size)?;

    // gradients of the previous image, per pyramid level
    let mut grad_pyr = Vec::with_capacity(prev_pyr.len());
    for level in prev_pyr.iter() {
        let mut dx = Image::<f32, 1>::from_size_val(level.size(), 0.0)?;
        let mut dy = Image::<f32, 1>::from_size_val(level.size(), 0.0)?;
        spatial_gradient(level, &mut dx, &mut dy)?;
        grad_pyr.push((dx, dy));
    }

    let tracked = points
        .par_iter()
        .map(|&pt| track_point(pt, &prev_pyr, &next_pyr, &grad_pyr, params))
        .collect();

    Ok(tracked)
}

fn track_point(
    pt: [f32; 2],
    prev_pyr: &[Image<f32, 1>],
    next_pyr: &[Image<f32, 1>],
    grad_pyr: &[(Image<f32, 1>, Image<f32, 1>)],
    params: &LucasKanadeParams,
) -> TrackedPoint {
    let half_win = (params.win_size / 2) as isize;
    let num_levels = prev_pyr.len();

    let mut flow = [0.0f32, 0.0f32];
    let mut valid = true;

    for level in (0..num_levels).rev() {
        let prev = &prev_pyr[level];
        let next = &next_pyr[level];
        let (grad_x, grad_y) = &grad_pyr[level];

        let level_scale = 1.0 / (1 << level) as f32;
        let px = pt[0] * level_scale;
        let py = pt[1] * level_scale;

        // normal matrix over the window, fixed per level
        let mut gxx = 0.0f32;
        let mut gxy = 0.0f32;
        let mut gyy = 0.0f32;
        for wy in -half_win..=half_win {
            for wx in -half_win..=half_win {
                let sx = px + wx as f32;
                let sy = py + wy as f32;
                let ix = bilinear_sample(grad_x, sx, sy)[0];
                let iy = bilinear_sample(grad_y, sx, sy)[0];
                gxx += ix * ix;
                gxy += ix * iy;
                gyy += iy * iy;
            }
        }

        let det = gxx * gyy - gxy * gxy;
        let window_area = (params.win_size * params.win_size) as f32;
        let trace = gxx + gyy;
        let delta = gxx - gyy;
        let min_eig = 0.5 * (trace - (delta * delta + 4.0 * gxy * gxy).sqrt());
        if det.abs() < 1e-7 || min_eig / window_area < params.min_eig_threshold {
            valid = false;
            break;
        }
        let inv_det = 1.0 / det;

        // Gauss-Newton iterations on the displacement
        for _ in 0..params.max_iters {
            let mut bx = 0.0f32;
            let mut by = 0.0f32;
            for wy in -half_win..=half_win {
                for wx in -half_win..=half_win {
                    let sx = px + wx as f32;
                    let sy = py + wy as f32;
                    let i0 = bilinear_sample(prev, sx, sy)[0];
                    let i1 = bilinear_sample(next, sx + flow[0], sy + flow[1])[0];
                    let ix = bilinear_sample(grad_x, sx, sy)[0];
                    let iy = bilinear_sample(grad_y, sx, sy)[0];
                    let di = i0 - i1;
                    bx += di * ix;
                    by += di * iy;
                }
            }

            let dx = inv_det * (gyy * bx - gxy * by);
            let dy = inv_det * (gxx * by - gxy * bx);

            flow[0] += dx;
            flow[1] += dy;

            if dx * dx + dy * dy < params.epsilon * params.epsilon {
                break;
            }
        }

        if level > 0 {
            flow[0] *= 2.0;
            flow[1] *= 2.0;
        }
    }

    if !valid {
        return TrackedPoint {
            next: pt,
            status: false,
            error: 0.0,
        };
    }

    let next_pt = [pt[0] + flow[0], pt[1] + flow[1]];

    // points pushed outside the image are lost
    let prev_img = &prev_pyr[0];
    let (cols, rows) = (prev_img.cols() as f32, prev_img.rows() as f32);
    if next_pt[0] < 0.0 || next_pt[0] > cols - 1.0 || next_pt[1] < 0.0 || next_pt[1] > rows - 1.0 {
        return TrackedPoint {
            next: next_pt,
            status: false,
            error: 0.0,
        };
    }

    // residual over the window at the final position
    let next_img = &next_pyr[0];
    let mut residual = 0.0f32;
    let mut count = 0usize;
    for wy in -half_win..=half_win {
        for wx in -half_win..=half_win {
            let i0 = bilinear_sample(prev_img, pt[0] + wx as f32, pt[1] + wy as f32)[0];
            let i1 = bilinear_sample(next_img, next_pt[0] + wx as f32, next_pt[1] + wy as f32)[0];
            residual += (i1 - i0).abs();
            count += 1;
        }
    }

    TrackedPoint {
        next: next_pt,
        status: true,
        error: residual / count as f32,
    }
}
