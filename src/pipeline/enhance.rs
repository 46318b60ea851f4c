//! Face-restoration adapter.
//!
//! The restoration network is a black box: a BGR frame goes in, a restored
//! BGR frame (or nothing) comes out.

use ndarray::{Array4, ArrayView3, Axis};
use ort::session::Session;
use ort::value::Tensor;

use crate::color::{bgr_to_rgb, rgb_to_bgr, BgrArray, COLOR_CHANNELS};
use crate::config::{Accelerator, RestorerConfig};
use crate::error::{Error, Result};
use crate::image::{resize_image, rgb_to_tensor, tensor_to_rgb, Interpolation};
use crate::model::{ModelCache, ModelType};

use super::network::extract_array4;

/// Restores detail in BGR frames.
pub trait FaceRestorer: Send {
    /// Restore a (H, W, 3) BGR frame.
    ///
    /// `Ok(None)` means the model ran but produced no usable frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed or inference fails.
    fn restore(&mut self, frame: ArrayView3<'_, u8>) -> Result<Option<BgrArray>>;
}

/// GFPGAN-style restorer executed by ONNX Runtime.
///
/// The whole frame is fed at the model resolution with RGB values in
/// [-1, 1], and the output is resized to `upscale` times the input size.
pub struct OnnxFaceRestorer {
    session: Session,
    settings: RestorerConfig,
}

impl OnnxFaceRestorer {
    /// Load the restoration graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be resolved or loaded.
    pub fn load(
        cache: &ModelCache,
        settings: RestorerConfig,
        accelerator: Accelerator,
    ) -> Result<Self> {
        let session = cache.load_session(ModelType::FaceRestorer, &settings.model, accelerator)?;
        Ok(Self { session, settings })
    }
}

impl FaceRestorer for OnnxFaceRestorer {
    fn restore(&mut self, frame: ArrayView3<'_, u8>) -> Result<Option<BgrArray>> {
        let rgb = bgr_to_rgb(frame)?;
        let (width, height) = rgb.dimensions();
        let size = self.settings.input_size;

        let input = resize_image(&rgb, size, size, Interpolation::Bicubic);
        let input_value =
            Tensor::from_array(rgb_to_tensor(&input)).map_err(|source| Error::Inference { source })?;

        tracing::info!("Running face restorer at {size}x{size}...");
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        let Some(output) = outputs.values().next() else {
            return Ok(None);
        };
        let restored = extract_array4(&output)?;

        finish(&restored, width, height, self.settings.upscale)
    }
}

/// Turn the raw network output into a BGR frame `upscale` times the size of
/// a `width` x `height` input. Empty or non-finite output yields `None`.
fn finish(
    restored: &Array4<f32>,
    width: u32,
    height: u32,
    upscale: u32,
) -> Result<Option<BgrArray>> {
    if restored.is_empty() || restored.iter().any(|v| !v.is_finite()) {
        tracing::warn!("Face restorer produced an unusable tensor {:?}", restored.shape());
        return Ok(None);
    }

    let restored = tensor_to_rgb(restored)?;
    let out = resize_image(
        &restored,
        width.saturating_mul(upscale),
        height.saturating_mul(upscale),
        Interpolation::Lanczos3,
    );

    Ok(Some(rgb_to_bgr(&out)))
}

/// Run a restorer and turn its failure signal into an error.
pub(crate) fn restore_frame(
    restorer: &mut dyn FaceRestorer,
    frame: ArrayView3<'_, u8>,
) -> Result<BgrArray> {
    let channels = frame.len_of(Axis(2));
    if channels != COLOR_CHANNELS {
        return Err(Error::ChannelCount {
            expected: COLOR_CHANNELS,
            actual: channels,
        });
    }

    let restored = restorer
        .restore(frame)?
        .ok_or(Error::EmptyOutput {
            model: "face restorer",
        })?;

    if restored.len_of(Axis(2)) != COLOR_CHANNELS {
        return Err(Error::ChannelCount {
            expected: COLOR_CHANNELS,
            actual: restored.len_of(Axis(2)),
        });
    }
    Ok(restored)
}
