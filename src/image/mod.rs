//! Image loading, resizing, tensor packing and saving utilities.

mod load;
mod resize;
mod save;
mod tensor;

pub use load::{load_image, to_rgb};
pub use resize::{resize_image, resize_tensor, Interpolation, Upsample};
pub use save::save_image;
pub use tensor::{rgb_to_tensor, tensor_to_rgb};

use ndarray::Array4;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Values are normalized to [-1, 1] for the face-restoration model.
pub type ImageTensor = Array4<f32>;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
