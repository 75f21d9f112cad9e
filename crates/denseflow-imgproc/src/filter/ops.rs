use denseflow_image::{Image, ImageError};
use rayon::prelude::*;

use super::{kernels, separable_filter};

/// Blur an image using a box blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn box_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
) -> Result<(), ImageError> {
    let kernel_x = kernels::box_blur_kernel_1d(kernel_size.0);
    let kernel_y = kernels::box_blur_kernel_1d(kernel_size.1);
    separable_filter(src, dst, &kernel_x, &kernel_y)?;
    Ok(())
}

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `sigma` - The sigma of the gaussian kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), ImageError> {
    let kernel_x = kernels::gaussian_kernel_1d(kernel_size.0, sigma.0);
    let kernel_y = kernels::gaussian_kernel_1d(kernel_size.1, sigma.1);
    separable_filter(src, dst, &kernel_x, &kernel_y)?;
    Ok(())
}

/// Compute the first order image derivatives with a 3x3 sobel operator.
///
/// The kernels are normalized so that a linear intensity ramp responds with
/// its true slope. Border pixels are handled by replicating the edge rows
/// and columns.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dx` - The destination image for the horizontal derivative.
/// * `dy` - The destination image for the vertical derivative.
pub fn spatial_gradient(
    src: &Image<f32, 1>,
    dx: &mut Image<f32, 1>,
    dy: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    if src.size() != dx.size() || src.size() != dy.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dx.cols(),
            dx.rows(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();
    let src_data = src.as_slice();

    let (smooth, diff) = kernels::sobel_kernel_1d();

    let compute_row = |r: usize, dx_row: &mut [f32], dy_row: &mut [f32]| {
        for c in 0..cols {
            let mut gx = 0.0;
            let mut gy = 0.0;
            for ky in 0..3 {
                let y = (r + ky).saturating_sub(1).min(rows - 1);
                for kx in 0..3 {
                    let x = (c + kx).saturating_sub(1).min(cols - 1);
                    let val = src_data[y * cols + x];
                    gx += val * diff[kx] * smooth[ky];
                    gy += val * smooth[kx] * diff[ky];
                }
            }
            dx_row[c] = gx;
            dy_row[c] = gy;
        }
    };

    dx.as_slice_mut()
        .par_chunks_mut(cols)
        .zip(dy.as_slice_mut().par_chunks_mut(cols))
        .enumerate()
        .for_each(|(r, (dx_row, dy_row))| compute_row(r, dx_row, dy_row));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use denseflow_image::ImageSize;

    #[test]
    fn test_box_blur() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };
        let mut img = Image::<f32, 1>::from_size_val(size, 0.0)?;
        img.as_slice_mut()[12] = 9.0;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        box_blur(&img, &mut dst, (3, 3))?;

        assert_eq!(dst.get_pixel(2, 2, 0)?, 1.0);
        assert_eq!(dst.get_pixel(0, 0, 0)?, 0.0);

        Ok(())
    }

    #[test]
    fn test_gaussian_blur_preserves_mass() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 9,
            height: 9,
        };
        let mut img = Image::<f32, 1>::from_size_val(size, 0.0)?;
        img.as_slice_mut()[4 * 9 + 4] = 1.0;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        gaussian_blur(&img, &mut dst, (5, 5), (1.2, 1.2))?;

        let total = dst.as_slice().iter().sum::<f32>();
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-5);
        // the center keeps the largest share
        let center = dst.get_pixel(4, 4, 0)?;
        assert!(dst.as_slice().iter().all(|&v| v <= center));

        Ok(())
    }

    #[test]
    fn test_spatial_gradient_ramp() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 4,
        };
        // horizontal ramp: I(x, y) = 2x
        let mut data = Vec::new();
        for _y in 0..size.height {
            for x in 0..size.width {
                data.push(2.0 * x as f32);
            }
        }
        let img = Image::<f32, 1>::new(size, data)?;

        let mut dx = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let mut dy = Image::<f32, 1>::from_size_val(size, 0.0)?;
        spatial_gradient(&img, &mut dx, &mut dy)?;

        // interior pixels see the exact slope, borders see the replicated half
        assert_eq!(dx.get_pixel(2, 1, 0)?, 2.0);
        assert_eq!(dx.get_pixel(1, 2, 0)?, 2.0);
        assert_eq!(dy.get_pixel(2, 1, 0)?, 0.0);
        assert_eq!(dx.get_pixel(0, 0, 0)?, 1.0);

        Ok(())
    }

    #[test]
    fn test_spatial_gradient_flat() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let img = Image::<f32, 1>::from_size_val(size, 7.0)?;

        let mut dx = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let mut dy = Image::<f32, 1>::from_size_val(size, 1.0)?;
        spatial_gradient(&img, &mut dx, &mut dy)?;

        assert!(dx.as_slice().iter().all(|&v| v == 0.0));
        assert!(dy.as_slice().iter().all(|&v| v == 0.0));

        Ok(())
    }
}
