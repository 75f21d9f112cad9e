use denseflow_image::{Image, ImageError};
use rayon::prelude::*;

/// Trait for floating point casting
pub trait FloatConversion {
    /// Convert the type to f32
    fn to_f32(&self) -> f32;
    /// Convert the type from f32
    fn from_f32(val: f32) -> Self;
}

impl FloatConversion for f32 {
    fn to_f32(&self) -> f32 {
        *self
    }

    fn from_f32(val: f32) -> Self {
        val
    }
}

impl FloatConversion for u8 {
    fn to_f32(&self) -> f32 {
        *self as f32
    }

    fn from_f32(val: f32) -> Self {
        val.clamp(0.0, 255.0) as u8
    }
}

/// Apply a separable filter to an image.
///
/// The filter is applied as a horizontal 1D convolution followed by a
/// vertical 1D convolution. Samples outside the image contribute zero.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
pub fn separable_filter<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError>
where
    T: FloatConversion + Copy + Send + Sync,
{
    if kernel_x.is_empty() || kernel_y.is_empty() {
        return Err(ImageError::InvalidKernelLength(
            kernel_x.len(),
            kernel_y.len(),
        ));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rows = src.rows();
    let cols = src.cols();

    let half_x = (kernel_x.len() / 2) as isize;
    let half_y = (kernel_y.len() / 2) as isize;

    let src_data = src.as_slice();
    let mut temp = vec![0.0f32; src_data.len()];

    // horizontal pass
    temp.par_chunks_mut(cols * C)
        .enumerate()
        .for_each(|(r, row_temp)| {
            let row_offset = r * cols * C;
            for c in 0..cols {
                let mut acc = [0.0f32; C];
                for (i, &k) in kernel_x.iter().enumerate() {
                    let x = c as isize + i as isize - half_x;
                    if x >= 0 && x < cols as isize {
                        let idx = row_offset + x as usize * C;
                        for (ch, acc_val) in acc.iter_mut().enumerate() {
                            *acc_val += src_data[idx + ch].to_f32() * k;
                        }
                    }
                }
                row_temp[c * C..(c + 1) * C].copy_from_slice(&acc);
            }
        });

    // vertical pass
    dst.as_slice_mut()
        .par_chunks_mut(cols * C)
        .enumerate()
        .for_each(|(r, row_dst)| {
            for c in 0..cols {
                let mut acc = [0.0f32; C];
                for (i, &k) in kernel_y.iter().enumerate() {
                    let y = r as isize + i as isize - half_y;
                    if y >= 0 && y < rows as isize {
                        let idx = y as usize * cols * C + c * C;
                        for (ch, acc_val) in acc.iter_mut().enumerate() {
                            *acc_val += temp[idx + ch] * k;
                        }
                    }
                }
                for (ch, &acc_val) in acc.iter().enumerate() {
                    row_dst[c * C + ch] = T::from_f32(acc_val);
                }
            }
        });

    Ok(())
}
