/// Create a box blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
///
/// # Returns
///
/// A vector of the kernel.
pub fn box_blur_kernel_1d(kernel_size: usize) -> Vec<f32> {
    vec![1.0 / kernel_size as f32; kernel_size]
}

/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector of the kernel.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Create the normalized sobel kernel pair.
///
/// The smoothing kernel and the difference kernel are scaled so that the
/// filter responds with the true derivative of a linear ramp.
///
/// # Returns
///
/// A tuple with the smoothing and difference kernels.
pub fn sobel_kernel_1d() -> (Vec<f32>, Vec<f32>) {
    let smooth = vec![0.25, 0.5, 0.25];
    let diff = vec![-0.5, 0.0, 0.5];
    (smooth, diff)
}

/// Create the binomial kernel used when downsampling pyramid levels.
pub fn pyramid_gaussian_kernel_1d() -> Vec<f32> {
    [1.0, 4.0, 6.0, 4.0, 1.0].iter().map(|&x| x / 16.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_blur_kernel_1d() {
        let kernel = box_blur_kernel_1d(5);
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (i, &k) in kernel.iter().enumerate() {
            assert_eq!(k, expected[i]);
        }
    }

    #[test]
    fn test_sobel_kernel_1d() {
        let (smooth, diff) = sobel_kernel_1d();
        assert!((smooth.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(diff, vec![-0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_pyramid_gaussian_kernel_1d() {
        let kernel = pyramid_gaussian_kernel_1d();
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }
}
