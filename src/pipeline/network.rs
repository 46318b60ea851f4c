//! The colorization graph and the seam it is driven through.

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};

/// Lightness tensor in NCHW format, shape (1, 1, H, W).
pub type LumaTensor = Array4<f32>;

/// Chrominance tensor in NCHW format, shape (1, 2, h, w).
pub type ChromaTensor = Array4<f32>;

/// A network mapping a lightness plane to a pair of chrominance planes.
///
/// The output may be at any spatial size; callers resample it.
pub trait ChromaNetwork: Send {
    /// Predict a/b channels for a (1, 1, H, W) lightness tensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the input shape is invalid or inference fails.
    fn predict(&mut self, lightness: &LumaTensor) -> Result<ChromaTensor>;
}

/// Colorization graph executed by ONNX Runtime.
pub struct OnnxColorNet {
    session: Session,
}

impl OnnxColorNet {
    /// Wrap an already loaded session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl ChromaNetwork for OnnxColorNet {
    fn predict(&mut self, lightness: &LumaTensor) -> Result<ChromaTensor> {
        check_shape(lightness, 1, "lightness input")?;

        let input_value =
            Tensor::from_array(lightness.clone()).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .values()
            .next()
            .ok_or(Error::EmptyOutput { model: "colorizer" })?;

        let chroma = extract_array4(&output)?;
        check_shape(&chroma, 2, "chrominance output")?;

        tracing::debug!("Colorizer output shape {:?}", chroma.shape());
        Ok(chroma)
    }
}

/// Require a batch of one with `channels` planes.
pub(crate) fn check_shape(tensor: &Array4<f32>, channels: usize, what: &str) -> Result<()> {
    let (batch, c, h, w) = tensor.dim();
    if batch != 1 || c != channels || h == 0 || w == 0 {
        return Err(Error::ShapeMismatch {
            expected: format!("{what} of shape (1, {channels}, H, W)"),
            actual: format!("{:?}", tensor.shape()),
        });
    }
    Ok(())
}

/// Extract a 4D array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub(crate) fn extract_array4(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 {
        return Err(Error::ShapeMismatch {
            expected: "4D tensor".to_string(),
            actual: format!("{}D tensor", dims.len()),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}
