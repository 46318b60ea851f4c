//! Plain resampling of images and NCHW tensors.
//!
//! Nothing here preserves aspect ratio; callers that need letterboxing do it
//! themselves.

use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Interpolation kernel for image resizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    const fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Interpolation mode for upsampling network outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upsample {
    Nearest,
    #[default]
    Bilinear,
}

/// Resize an image to exactly `width` x `height`.
#[must_use]
pub fn resize_image(image: &RgbImage, width: u32, height: u32, kernel: Interpolation) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, kernel.filter())
}

/// Resize the spatial axes of an NCHW tensor to `height` x `width`.
///
/// Sampling uses pixel centres (align-corners off), so a 4x bilinear
/// upsample reproduces the usual framework behavior.
#[must_use]
pub fn resize_tensor(tensor: &Array4<f32>, height: usize, width: usize, mode: Upsample) -> Array4<f32> {
    let (batch, channels, in_h, in_w) = tensor.dim();
    if (in_h, in_w) == (height, width) || in_h == 0 || in_w == 0 {
        return tensor.clone();
    }

    let rows = sample_axis(in_h, height);
    let cols = sample_axis(in_w, width);

    Array4::from_shape_fn((batch, channels, height, width), |(n, c, y, x)| {
        let row = rows[y];
        let col = cols[x];
        match mode {
            Upsample::Nearest => tensor[[n, c, row.nearest, col.nearest]],
            Upsample::Bilinear => {
                let top = tensor[[n, c, row.lo, col.lo]]
                    .mul_add(1.0 - col.frac, tensor[[n, c, row.lo, col.hi]] * col.frac);
                let bottom = tensor[[n, c, row.hi, col.lo]]
                    .mul_add(1.0 - col.frac, tensor[[n, c, row.hi, col.hi]] * col.frac);
                top.mul_add(1.0 - row.frac, bottom * row.frac)
            }
        }
    })
}

/// Source neighbours of one output coordinate.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
    nearest: usize,
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn sample_axis(input: usize, output: usize) -> Vec<Tap> {
    let scale = input as f32 / output as f32;
    let last = input - 1;

    (0..output)
        .map(|i| {
            let src = (i as f32 + 0.5).mul_add(scale, -0.5).max(0.0);
            // Safe: src is non-negative and bounded by the input length
            let lo = (src.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let nearest = ((i as f32 * scale).floor() as usize).min(last);
            Tap {
                lo,
                hi,
                frac: src - lo as f32,
                nearest,
            }
        })
        .collect()
}
