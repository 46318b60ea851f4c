//! Image saving utilities.

use std::path::Path;

use image::{codecs::jpeg::JpegEncoder, ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// Save an RGB image, choosing the format from the file extension.
///
/// PNG, JPEG and BMP are written; JPEG uses `quality` (1-100).
///
/// # Errors
///
/// Returns an error if the extension is not supported or the image cannot
/// be written.
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let save_err = |source: image::ImageError| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    };

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = JpegEncoder::new_with_quality(&mut output, quality);
            image.write_with_encoder(encoder).map_err(save_err)?;
        }
        "png" => image
            .save_with_format(path, ImageFormat::Png)
            .map_err(save_err)?,
        "bmp" => image
            .save_with_format(path, ImageFormat::Bmp)
            .map_err(save_err)?,
        _ => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}
