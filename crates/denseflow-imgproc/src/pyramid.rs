use crate::filter::{kernels, separable_filter};
use crate::interpolation::bilinear_sample;
use denseflow_image::{Image, ImageError, ImageSize};

/// Downsample an image to half its size.
///
/// The image is blurred with a 5-tap binomial kernel and then decimated by
/// taking every second pixel, the standard construction for the levels of a
/// Gaussian image pyramid.
///
/// # Arguments
///
/// * `src` - The source image to be downsampled.
///
/// # Returns
///
/// The downsampled image with half the width and height (rounded up).
pub fn pyrdown(src: &Image<f32, 1>) -> Result<Image<f32, 1>, ImageError> {
    let dst_size = ImageSize {
        width: src.width().div_ceil(2),
        height: src.height().div_ceil(2),
    };

    let kernel = kernels::pyramid_gaussian_kernel_1d();
    let mut blurred = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    separable_filter(src, &mut blurred, &kernel, &kernel)?;

    let blurred_data = blurred.as_slice();
    let mut dst_data = Vec::with_capacity(dst_size.width * dst_size.height);
    for y in 0..dst_size.height {
        for x in 0..dst_size.width {
            dst_data.push(blurred_data[(y * 2) * src.cols() + x * 2]);
        }
    }

    Image::new(dst_size, dst_data)
}

/// Resize an image to a new size using bilinear interpolation.
///
/// # Arguments
///
/// * `src` - The input image container.
/// * `dst` - The output image container with the target size.
pub fn resize_bilinear<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    if src.as_slice().is_empty() || dst.as_slice().is_empty() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let step = |src_dim: usize, dst_dim: usize| -> f32 {
        if dst_dim > 1 {
            (src_dim - 1) as f32 / (dst_dim - 1) as f32
        } else {
            0.0
        }
    };

    let step_x = step(src.cols(), dst.cols());
    let step_y = step(src.rows(), dst.rows());

    let cols = dst.cols();
    let dst_data = dst.as_slice_mut();
    for y in 0..dst_data.len() / (cols * C) {
        let v = y as f32 * step_y;
        for x in 0..cols {
            let u = x as f32 * step_x;
            let pixel = bilinear_sample(src, u, v);
            dst_data[(y * cols + x) * C..(y * cols + x) * C + C].copy_from_slice(&pixel);
        }
    }

    Ok(())
}

/// Build a Gaussian pyramid with the given number of levels.
///
/// Level zero is the source image itself; each following level halves the
/// previous one with [`pyrdown`]. Levels that would become smaller than
/// `min_dim` pixels in either dimension are not generated.
pub fn build_pyramid(
    src: &Image<f32, 1>,
    levels: usize,
    min_dim: usize,
) -> Result<Vec<Image<f32, 1>>, ImageError> {
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(src.clone());

    for _ in 0..levels {
        let last = match pyramid.last() {
            Some(img) => img,
            None => break,
        };
        if last.width().div_ceil(2) < min_dim || last.height().div_ceil(2) < min_dim {
            break;
        }
        let down = pyrdown(last)?;
        pyramid.push(down);
    }

    Ok(pyramid)
}
