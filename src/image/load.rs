//! Image loading utilities.

use std::path::Path;

use image::{DynamicImage, GenericImageView, RgbImage};

use crate::error::{Error, Result};

/// Load an image from disk as 8-bit RGB.
///
/// Grayscale sources are expanded to three identical channels and alpha is
/// dropped, so every later stage sees a 3-channel image.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = img.dimensions();
    tracing::debug!(
        "Loaded {} ({width}x{height}, {} channel(s))",
        path.display(),
        img.color().channel_count()
    );

    to_rgb(img)
}

/// Convert any decoded image to 8-bit RGB.
///
/// # Errors
///
/// Returns an error if the image has no pixels.
pub fn to_rgb(img: DynamicImage) -> Result<RgbImage> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "image has no pixels".to_string(),
        });
    }

    Ok(match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn test_grayscale_becomes_three_channels() {
        let gray = GrayImage::from_pixel(4, 3, Luma([77]));
        let rgb = to_rgb(DynamicImage::ImageLuma8(gray)).unwrap();

        assert_eq!(rgb.dimensions(), (4, 3));
        assert!(rgb.pixels().all(|p| p.0 == [77, 77, 77]));
    }

    #[test]
    fn test_alpha_is_dropped() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        let rgb = to_rgb(DynamicImage::ImageRgba8(rgba)).unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [1, 2, 3]));
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = to_rgb(DynamicImage::new_rgb8(0, 5)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDimensions { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_image("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }
}
