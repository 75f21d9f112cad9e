use denseflow_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

use crate::filter::{box_blur, gaussian_blur};
use crate::interpolation::bilinear_sample;
use crate::pyramid::resize_bilinear;

/// Parameters for the dense polynomial expansion flow estimator.
#[derive(Debug, Clone)]
pub struct FarnebackParams {
    /// Scale between pyramid levels, below one.
    pub pyr_scale: f32,
    /// Number of pyramid levels including the full resolution one.
    pub levels: usize,
    /// Side length of the averaging window.
    pub win_size: usize,
    /// Number of refinement iterations per level.
    pub iters: usize,
    /// Radius of the pixel neighborhood used for the polynomial fit.
    pub poly_n: usize,
    /// Standard deviation of the Gaussian weighting the polynomial fit.
    pub poly_sigma: f32,
}

impl Default for FarnebackParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            win_size: 15,
            iters: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

/// Compute dense optical flow with the polynomial expansion method.
///
/// Every pixel neighborhood of both images is approximated by a quadratic
/// polynomial; the displacement between the two expansions is solved in a
/// least squares sense over a box window and refined coarse-to-fine over an
/// image pyramid. The result is one (dx, dy) vector per input pixel.
///
/// Identical inputs produce an exactly zero field.
///
/// # Arguments
///
/// * `prev` - Previous image (grayscale, 0-255 range).
/// * `next` - Next image, same size as `prev`.
/// * `flow` - Destination flow field with shape (H, W, 2).
/// * `params` - Estimator parameters.
pub fn farneback(
    prev: &Image<f32, 1>,
    next: &Image<f32, 1>,
    flow: &mut Image<f32, 2>,
    params: &FarnebackParams,
) -> Result<(), ImageError> {
    if prev.size() != next.size() {
        return Err(ImageError::InvalidImageSize(
            prev.cols(),
            prev.rows(),
            next.cols(),
            next.rows(),
        ));
    }
    if flow.size() != prev.size() {
        return Err(ImageError::InvalidImageSize(
            flow.cols(),
            flow.rows(),
            prev.cols(),
            prev.rows(),
        ));
    }

    let full_size = prev.size();
    let mut flow_level: Option<Image<f32, 2>> = None;

    for k in (0..params.levels).rev() {
        let scale = params.pyr_scale.powi(k as i32);
        let size = ImageSize {
            width: ((full_size.width as f32 * scale).round() as usize).max(1),
            height: ((full_size.height as f32 * scale).round() as usize).max(1),
        };
        if size.width < 2 || size.height < 2 {
            continue;
        }

        let i0 = scale_image(prev, size, scale)?;
        let i1 = scale_image(next, size, scale)?;

        let r0 = poly_exp(&i0, params.poly_n, params.poly_sigma)?;
        let r1 = poly_exp(&i1, params.poly_n, params.poly_sigma)?;

        let mut flow_k = match flow_level.take() {
            Some(coarser) => {
                let mut upscaled = Image::<f32, 2>::from_size_val(size, 0.0)?;
                resize_bilinear(&coarser, &mut upscaled)?;
                let gain = 1.0 / params.pyr_scale;
                upscaled.as_slice_mut().iter_mut().for_each(|v| *v *= gain);
                upscaled
            }
            None => Image::<f32, 2>::from_size_val(size, 0.0)?,
        };

        for _ in 0..params.iters {
            let m = update_matrices(&r0, &r1, &flow_k)?;
            let mut m_blur = Image::<f32, 5>::from_size_val(size, 0.0)?;
            box_blur(&m, &mut m_blur, (params.win_size, params.win_size))?;
            solve_flow(&m_blur, &mut flow_k);
        }

        flow_level = Some(flow_k);
    }

    match flow_level {
        Some(field) => flow.as_slice_mut().copy_from_slice(field.as_slice()),
        // degenerate inputs never reach a usable pyramid level
        None => flow.as_slice_mut().fill(0.0),
    }

    Ok(())
}

/// Smooth and resize one pyramid level, full resolution passes through.
fn scale_image(
    src: &Image<f32, 1>,
    size: ImageSize,
    scale: f32,
) -> Result<Image<f32, 1>, ImageError> {
    if size == src.size() {
        return Ok(src.clone());
    }

    let sigma = (1.0 / scale - 1.0) * 0.5;
    let kernel_size = (((sigma * 5.0).round() as usize) | 1).max(3);
    let mut smoothed = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    gaussian_blur(src, &mut smoothed, (kernel_size, kernel_size), (sigma, sigma))?;

    let mut scaled = Image::<f32, 1>::from_size_val(size, 0.0)?;
    resize_bilinear(&smoothed, &mut scaled)?;

    Ok(scaled)
}

/// Quadratic polynomial expansion of every pixel neighborhood.
///
/// The five output channels per pixel are the expansion coefficients
/// (bx, by, axx, ayy, axy) of `c + bx*x + by*y + axx*x^2 + ayy*y^2 + axy*x*y`
/// fitted with Gaussian weights over a (2n+1) x (2n+1) neighborhood.
fn poly_exp(src: &Image<f32, 1>, n: usize, sigma: f32) -> Result<Image<f32, 5>, ImageError> {
    let rows = src.rows();
    let cols = src.cols();

    let taps = 2 * n + 1;
    let g = crate::filter::kernels::gaussian_kernel_1d(taps, sigma);
    let mut xg = vec![0.0f32; taps];
    let mut xxg = vec![0.0f32; taps];
    for i in 0..taps {
        let x = i as f32 - n as f32;
        xg[i] = x * g[i];
        xxg[i] = x * x * g[i];
    }

    // moments of the weight function and the inverse Gram factors
    let s2 = xxg.iter().sum::<f32>();
    let s4 = xxg
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = i as f32 - n as f32;
            x * x * v
        })
        .sum::<f32>();
    let ig11 = 1.0 / s2;
    let ig33 = 1.0 / (s4 - s2 * s2);
    let ig55 = 1.0 / (s2 * s2);

    let src_data = src.as_slice();

    // vertical pass: per-column sums against g, xg and xxg
    let mut vsum = vec![0.0f32; rows * cols * 3];
    vsum.par_chunks_mut(cols * 3)
        .enumerate()
        .for_each(|(y, vrow)| {
            for x in 0..cols {
                let mut b0 = 0.0f32;
                let mut b1 = 0.0f32;
                let mut b2 = 0.0f32;
                for i in 0..taps {
                    let sy = (y + i).saturating_sub(n).min(rows - 1);
                    let val = src_data[sy * cols + x];
                    b0 += g[i] * val;
                    b1 += xg[i] * val;
                    b2 += xxg[i] * val;
                }
                vrow[x * 3] = b0;
                vrow[x * 3 + 1] = b1;
                vrow[x * 3 + 2] = b2;
            }
        });

    let mut dst = Image::<f32, 5>::from_size_val(src.size(), 0.0)?;
    dst.as_slice_mut()
        .par_chunks_mut(cols * 5)
        .enumerate()
        .for_each(|(y, drow)| {
            let vrow = &vsum[y * cols * 3..(y + 1) * cols * 3];
            for x in 0..cols {
                let mut m1 = 0.0f32; // sum g * b0
                let mut m2 = 0.0f32; // sum xg * b0
                let mut m3 = 0.0f32; // sum g * b1
                let mut m4 = 0.0f32; // sum xxg * b0
                let mut m5 = 0.0f32; // sum xg * b1
                let mut m6 = 0.0f32; // sum g * b2
                for i in 0..taps {
                    let sx = (x + i).saturating_sub(n).min(cols - 1);
                    let b0 = vrow[sx * 3];
                    let b1 = vrow[sx * 3 + 1];
                    let b2 = vrow[sx * 3 + 2];
                    m1 += g[i] * b0;
                    m2 += xg[i] * b0;
                    m3 += g[i] * b1;
                    m4 += xxg[i] * b0;
                    m5 += xg[i] * b1;
                    m6 += g[i] * b2;
                }
                drow[x * 5] = m2 * ig11; // bx
                drow[x * 5 + 1] = m3 * ig11; // by
                drow[x * 5 + 2] = (m4 - s2 * m1) * ig33; // axx
                drow[x * 5 + 3] = (m6 - s2 * m1) * ig33; // ayy
                drow[x * 5 + 4] = m5 * ig55; // axy
            }
        });

    Ok(dst)
}

/// Build the per-pixel normal equations relating the two expansions under
/// the current displacement estimate.
///
/// The five output channels are (g11, g12, g22, h1, h2) with G the 2x2
/// normal matrix and h the right hand side; averaging them over the window
/// and solving G d = h yields the updated displacement.
fn update_matrices(
    r0: &Image<f32, 5>,
    r1: &Image<f32, 5>,
    flow: &Image<f32, 2>,
) -> Result<Image<f32, 5>, ImageError> {
    let cols = r0.cols();

    let r0_data = r0.as_slice();
    let flow_data = flow.as_slice();

    let mut m = Image::<f32, 5>::from_size_val(r0.size(), 0.0)?;
    m.as_slice_mut()
        .par_chunks_mut(cols * 5)
        .enumerate()
        .for_each(|(y, mrow)| {
            for x in 0..cols {
                let idx = (y * cols + x) * 5;
                let dx = flow_data[(y * cols + x) * 2];
                let dy = flow_data[(y * cols + x) * 2 + 1];

                let r1s = bilinear_sample(r1, x as f32 + dx, y as f32 + dy);

                let axx = 0.5 * (r0_data[idx + 2] + r1s[2]);
                let ayy = 0.5 * (r0_data[idx + 3] + r1s[3]);
                // off-diagonal entry of the averaged quadratic form
                let axy = 0.25 * (r0_data[idx + 4] + r1s[4]);

                let dbx = -0.5 * (r1s[0] - r0_data[idx]) + axx * dx + axy * dy;
                let dby = -0.5 * (r1s[1] - r0_data[idx + 1]) + axy * dx + ayy * dy;

                mrow[x * 5] = axx * axx + axy * axy;
                mrow[x * 5 + 1] = axy * (axx + ayy);
                mrow[x * 5 + 2] = ayy * ayy + axy * axy;
                mrow[x * 5 + 3] = axx * dbx + axy * dby;
                mrow[x * 5 + 4] = axy * dbx + ayy * dby;
            }
        });

    Ok(m)
}

/// Solve the averaged 2x2 systems into a new displacement field.
fn solve_flow(m: &Image<f32, 5>, flow: &mut Image<f32, 2>) {
    let m_data = m.as_slice();
    flow.as_slice_mut()
        .par_chunks_mut(2)
        .enumerate()
        .for_each(|(i, out)| {
            let g11 = m_data[i * 5];
            let g12 = m_data[i * 5 + 1];
            let g22 = m_data[i * 5 + 2];
            let h1 = m_data[i * 5 + 3];
            let h2 = m_data[i * 5 + 4];

            let idet = 1.0 / (g11 * g22 - g12 * g12 + 1e-3);
            out[0] = (g22 * h1 - g12 * h2) * idet;
            out[1] = (g11 * h2 - g12 * h1) * idet;
        });
}
