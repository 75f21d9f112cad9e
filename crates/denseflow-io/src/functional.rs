use std::path::Path;

use denseflow_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path as an 8-bit grayscale image.
///
/// The method tries to read from any image format supported by the
/// [image](https://crates.io/crates/image) crate and converts the result to
/// a single channel luma image regardless of the source channel count.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An image containing the grayscale image data.
pub fn read_image_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let file_path = file_path.as_ref().to_owned();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path));
    }

    let img = image::ImageReader::open(&file_path)?
        .with_guessed_format()?
        .decode()?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let image = Image::<u8, 1>::new(size, img.into_luma8().into_raw())?;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use crate::error::IoError;
    use crate::functional::read_image_gray8;

    #[test]
    fn read_missing_file() {
        let result = read_image_gray8("/definitely/not/here.png");
        assert!(matches!(result, Err(IoError::FileDoesNotExist(_))));
    }

    #[test]
    fn read_png_as_gray8() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gradient.png");

        // write a small rgb image and read it back as grayscale
        let mut rgb = image::RgbImage::new(4, 3);
        for (x, _y, pixel) in rgb.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 60) as u8, (x * 60) as u8, (x * 60) as u8]);
        }
        rgb.save(&file_path)?;

        let gray = read_image_gray8(&file_path)?;
        assert_eq!(gray.size().width, 4);
        assert_eq!(gray.size().height, 3);
        assert_eq!(gray.num_channels(), 1);
        assert_eq!(gray.get_pixel(0, 0, 0)?, 0);
        assert_eq!(gray.get_pixel(3, 2, 0)?, 180);

        Ok(())
    }

    #[test]
    fn read_undecodable_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("not_an_image.png");
        std::fs::write(&file_path, b"plain text, not pixels")?;

        let result = read_image_gray8(&file_path);
        assert!(result.is_err());

        Ok(())
    }
}
