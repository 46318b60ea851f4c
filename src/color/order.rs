//! RGB <-> BGR channel reordering.
//!
//! The face restorer works on BGR frames while the rest of the crate keeps
//! images in RGB order.

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, ArrayView3, Axis};

use crate::error::{Error, Result};

use super::{ensure_color_channels, COLOR_CHANNELS};

/// 8-bit frame laid out as (height, width, [B, G, R]).
pub type BgrArray = Array3<u8>;

/// Reorder an RGB image into a BGR frame.
#[must_use]
pub fn rgb_to_bgr(image: &RgbImage) -> BgrArray {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn(
        (height as usize, width as usize, COLOR_CHANNELS),
        |(y, x, c)| {
            #[allow(clippy::cast_possible_truncation)]
            let px = image.get_pixel(x as u32, y as u32);
            px[COLOR_CHANNELS - 1 - c]
        },
    )
}

/// Reorder a BGR frame into an RGB image.
///
/// # Errors
///
/// Returns [`Error::ChannelCount`] if the frame is not 3 channels wide.
pub fn bgr_to_rgb(frame: ArrayView3<'_, u8>) -> Result<RgbImage> {
    ensure_color_channels(frame.len_of(Axis(2)))?;

    let (height, width, _) = frame.dim();
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::UnsupportedDimensions {
            width: u32::MAX,
            height: u32::MAX,
            reason: format!("{width}x{height} does not fit an image buffer"),
        });
    };

    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([frame[[y, x, 2]], frame[[y, x, 1]], frame[[y, x, 0]]])
    }))
}
