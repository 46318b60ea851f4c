//! Color-space and channel-order conversions.

mod lab;
mod normalize;
mod order;

pub use lab::{image_to_lab, lab_to_image, lab_to_rgb, rgb_to_lab, LabImage};
pub use normalize::ColorNormalizer;
pub use order::{bgr_to_rgb, rgb_to_bgr, BgrArray};

/// Number of channels in RGB, BGR and Lab images.
pub const COLOR_CHANNELS: usize = 3;

/// Fail fast when a buffer does not carry exactly three channels.
pub(crate) fn ensure_color_channels(actual: usize) -> crate::Result<()> {
    if actual == COLOR_CHANNELS {
        Ok(())
    } else {
        Err(crate::Error::ChannelCount {
            expected: COLOR_CHANNELS,
            actual,
        })
    }
}
