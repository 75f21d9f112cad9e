use denseflow_image::Image;

/// Kernel for bilinear interpolation
///
/// Coordinates outside the image are clamped to the border before sampling.
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values.
pub fn bilinear_sample<const C: usize>(image: &Image<f32, C>, u: f32, v: f32) -> [f32; C] {
    let (rows, cols) = (image.rows(), image.cols());

    let u = u.clamp(0.0, (cols - 1) as f32);
    let v = v.clamp(0.0, (rows - 1) as f32);

    let iu0 = u.trunc() as usize;
    let iv0 = v.trunc() as usize;

    let frac_u = u.fract();
    let frac_v = v.fract();

    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let base00 = (iv0 * cols + iu0) * C;
    let base01 = (iv0 * cols + iu1) * C;
    let base10 = (iv1 * cols + iu0) * C;
    let base11 = (iv1 * cols + iu1) * C;

    let data = image.as_slice();

    let mut pixel = [0.0; C];
    for k in 0..C {
        pixel[k] = data[base00 + k] * w00
            + data[base01 + k] * w01
            + data[base10 + k] * w10
            + data[base11 + k] * w11;
    }

    pixel
}

#[cfg(test)]
mod tests {
    use super::*;
    use denseflow_image::{ImageError, ImageSize};

    #[test]
    fn test_bilinear_sample_exact() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.0, 1.0, 2.0, 3.0],
        )?;

        assert_eq!(bilinear_sample(&image, 0.0, 0.0)[0], 0.0);
        assert_eq!(bilinear_sample(&image, 1.0, 0.0)[0], 1.0);
        assert_eq!(bilinear_sample(&image, 0.0, 1.0)[0], 2.0);
        assert_eq!(bilinear_sample(&image, 1.0, 1.0)[0], 3.0);

        Ok(())
    }

    #[test]
    fn test_bilinear_sample_midpoint() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.0, 1.0, 2.0, 3.0],
        )?;

        assert_eq!(bilinear_sample(&image, 0.5, 0.5)[0], 1.5);
        assert_eq!(bilinear_sample(&image, 0.5, 0.0)[0], 0.5);

        Ok(())
    }

    #[test]
    fn test_bilinear_sample_clamped() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.0, 1.0, 2.0, 3.0],
        )?;

        assert_eq!(bilinear_sample(&image, -1.0, -1.0)[0], 0.0);
        assert_eq!(bilinear_sample(&image, 5.0, 5.0)[0], 3.0);

        Ok(())
    }
}
