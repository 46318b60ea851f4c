//! sRGB <-> CIE Lab conversion over whole images.
//!
//! Float RGB inputs are expected in `[0, 1]`; `u8` images carry `[0, 255]`
//! samples. Lab uses the D65 white point, with L in `[0, 100]` and a/b
//! roughly in `[-128, 127]`.

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, ArrayView3, Axis, Zip};
use palette::{FromColor, Lab, Srgb};

use crate::error::{Error, Result};

use super::{ensure_color_channels, COLOR_CHANNELS};

/// Lab image laid out as (height, width, [L, a, b]).
pub type LabImage = Array3<f32>;

/// Convert an RGB image with samples in `[0, 1]` to Lab.
///
/// # Errors
///
/// Returns [`Error::ChannelCount`] if the last axis is not 3 wide.
pub fn rgb_to_lab(rgb: ArrayView3<'_, f32>) -> Result<LabImage> {
    ensure_color_channels(rgb.len_of(Axis(2)))?;
    Ok(convert_to_lab(rgb))
}

/// Convert a Lab image back to RGB, clipped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::ChannelCount`] if the last axis is not 3 wide.
pub fn lab_to_rgb(lab: ArrayView3<'_, f32>) -> Result<Array3<f32>> {
    ensure_color_channels(lab.len_of(Axis(2)))?;

    let mut rgb = Array3::<f32>::zeros(lab.raw_dim());
    Zip::from(rgb.lanes_mut(Axis(2)))
        .and(lab.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let lab: Lab = Lab::new(px[0], px[1], px[2]);
            let color: Srgb = Srgb::from_color(lab);
            out[0] = clip_unit(color.red);
            out[1] = clip_unit(color.green);
            out[2] = clip_unit(color.blue);
        });

    Ok(rgb)
}

/// Convert an 8-bit RGB image to Lab.
#[must_use]
pub fn image_to_lab(image: &RgbImage) -> LabImage {
    convert_to_lab(image_to_array(image).view())
}

fn convert_to_lab(rgb: ArrayView3<'_, f32>) -> LabImage {
    let mut lab = Array3::<f32>::zeros(rgb.raw_dim());
    Zip::from(lab.lanes_mut(Axis(2)))
        .and(rgb.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let color: Lab = Lab::from_color(Srgb::new(px[0], px[1], px[2]));
            out[0] = color.l;
            out[1] = color.a;
            out[2] = color.b;
        });
    lab
}

/// Convert a Lab image to an 8-bit RGB image, clipping out-of-gamut colors.
///
/// # Errors
///
/// Returns an error if the channel count is wrong or the dimensions do not
/// fit an image buffer.
pub fn lab_to_image(lab: ArrayView3<'_, f32>) -> Result<RgbImage> {
    let rgb = lab_to_rgb(lab)?;
    array_to_image(rgb.view())
}

/// Unpack an 8-bit image into an (H, W, 3) float array in `[0, 1]`.
fn image_to_array(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn(
        (height as usize, width as usize, COLOR_CHANNELS),
        |(y, x, c)| {
            // Safe: x and y come from the image's own dimensions
            #[allow(clippy::cast_possible_truncation)]
            let px = image.get_pixel(x as u32, y as u32);
            f32::from(px[c]) / 255.0
        },
    )
}

/// Pack an (H, W, 3) float array in `[0, 1]` into an 8-bit image.
fn array_to_image(rgb: ArrayView3<'_, f32>) -> Result<RgbImage> {
    ensure_color_channels(rgb.len_of(Axis(2)))?;

    let (height, width, _) = rgb.dim();
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(Error::UnsupportedDimensions {
                width: u32::MAX,
                height: u32::MAX,
                reason: format!("{width}x{height} does not fit an image buffer"),
            })
        }
    };

    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            to_u8(rgb[[y, x, 0]]),
            to_u8(rgb[[y, x, 1]]),
            to_u8(rgb[[y, x, 2]]),
        ])
    }))
}

#[inline]
fn clip_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Scale a `[0, 1]` sample to `[0, 255]` with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f32) -> u8 {
    // Safe: clamped to [0, 255] before casting
    (clip_unit(value) * 255.0).round() as u8
}
