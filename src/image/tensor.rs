//! Packing RGB images into normalized NCHW tensors and back.

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Convert an RGB image to a (1, 3, H, W) tensor normalized to [-1, 1].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_to_tensor(image: &RgbImage) -> ImageTensor {
    let (w, h) = image.dimensions();
    let (width, height) = (w as usize, h as usize);

    let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, height, width));

    for y in 0..height {
        for x in 0..width {
            // Safe: x and y are bounded by the image's u32 dimensions
            let pixel = image.get_pixel(x as u32, y as u32);
            // Normalize from [0, 255] to [-1, 1]
            tensor[[0, 0, y, x]] = (f32::from(pixel[0]) / 127.5) - 1.0;
            tensor[[0, 1, y, x]] = (f32::from(pixel[1]) / 127.5) - 1.0;
            tensor[[0, 2, y, x]] = (f32::from(pixel[2]) / 127.5) - 1.0;
        }
    }

    tensor
}

/// Convert a (1, 3, H, W) tensor with values in [-1, 1] to an RGB image.
///
/// # Errors
///
/// Returns an error if the tensor is not a single 3-channel image.
pub fn tensor_to_rgb(tensor: &ImageTensor) -> Result<RgbImage> {
    let (batch, channels, height, width) = tensor.dim();
    if batch != 1 {
        return Err(Error::ShapeMismatch {
            expected: "batch of 1".to_string(),
            actual: format!("batch of {batch}"),
        });
    }
    if channels != RGB_CHANNELS {
        return Err(Error::ChannelCount {
            expected: RGB_CHANNELS,
            actual: channels,
        });
    }

    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(Error::ShapeMismatch {
            expected: "u32-sized spatial dims".to_string(),
            actual: format!("{height}x{width}"),
        });
    };

    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            denormalize(tensor[[0, 0, y, x]]),
            denormalize(tensor[[0, 1, y, x]]),
            denormalize(tensor[[0, 2, y, x]]),
        ])
    }))
}

/// Denormalize a value from [-1, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    let scaled = (value + 1.0) * 127.5;
    scaled.round().clamp(0.0, 255.0) as u8
}
