//! Colorization: Lab preprocessing, inference at a fixed size, and
//! reconstruction at the source's native resolution.

use image::RgbImage;
use ndarray::{s, Array3, Array4, Axis};

use crate::color::{image_to_lab, lab_to_image, ColorNormalizer};
use crate::config::{Accelerator, ColorizerConfig};
use crate::error::{Error, Result};
use crate::image::{resize_image, resize_tensor, Interpolation, Upsample};
use crate::model::{ModelCache, ModelType};

use super::network::{check_shape, ChromaNetwork, ChromaTensor, LumaTensor, OnnxColorNet};

/// Lightness of one source image at two resolutions.
#[derive(Debug, Clone)]
pub struct LightnessPair {
    /// L at the source's own resolution, (1, 1, H, W).
    pub native: LumaTensor,
    /// L of the source resized to the network input, (1, 1, S, S).
    pub resized: LumaTensor,
}

/// Extract lightness at native and network resolution.
#[must_use]
pub fn preprocess(image: &RgbImage, size: u32, filter: Interpolation) -> LightnessPair {
    let resized = resize_image(image, size, size, filter);

    LightnessPair {
        native: lightness_tensor(image),
        resized: lightness_tensor(&resized),
    }
}

/// Combine native lightness with predicted chrominance and convert to RGB.
///
/// Chrominance at a different spatial size is resampled to the lightness
/// size first, so the result always matches the native resolution.
///
/// # Errors
///
/// Returns an error if either tensor has the wrong shape.
pub fn postprocess(native: &LumaTensor, chroma: &ChromaTensor, mode: Upsample) -> Result<RgbImage> {
    check_shape(native, 1, "lightness")?;
    check_shape(chroma, 2, "chrominance")?;

    let (_, _, height, width) = native.dim();
    let (_, _, ch, cw) = chroma.dim();

    let chroma = if (ch, cw) == (height, width) {
        chroma.clone()
    } else {
        tracing::debug!("Upsampling chrominance {ch}x{cw} -> {height}x{width}");
        resize_tensor(chroma, height, width, mode)
    };

    let mut lab = Array3::<f32>::zeros((height, width, 3));
    lab.slice_mut(s![.., .., 0]).assign(&native.slice(s![0, 0, .., ..]));
    lab.slice_mut(s![.., .., 1..])
        .assign(&chroma.index_axis(Axis(0), 0).permuted_axes([1, 2, 0]));

    lab_to_image(lab.view())
}

fn lightness_tensor(image: &RgbImage) -> LumaTensor {
    let lab = image_to_lab(image);
    let (height, width, _) = lab.dim();
    Array4::from_shape_fn((1, 1, height, width), |(_, _, y, x)| lab[[y, x, 0]])
}

/// Colorizes images with a chrominance network.
pub struct Colorizer {
    network: Box<dyn ChromaNetwork>,
    settings: ColorizerConfig,
    normalizer: ColorNormalizer,
}

impl Colorizer {
    /// Build a colorizer around any network.
    #[must_use]
    pub fn new(network: Box<dyn ChromaNetwork>, settings: ColorizerConfig) -> Self {
        Self {
            network,
            settings,
            normalizer: ColorNormalizer::default(),
        }
    }

    /// Load the ONNX colorization graph.
    ///
    /// Missing or unreadable weights fail here rather than at inference.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be resolved or loaded.
    pub fn load(
        cache: &ModelCache,
        settings: ColorizerConfig,
        accelerator: Accelerator,
    ) -> Result<Self> {
        let session = cache.load_session(ModelType::Colorizer, &settings.model, accelerator)?;
        Ok(Self::new(Box::new(OnnxColorNet::new(session)), settings))
    }

    /// Colorize an image. The result has the input's dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or returns a malformed tensor.
    pub fn colorize(&mut self, image: &RgbImage) -> Result<RgbImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::UnsupportedDimensions {
                width,
                height,
                reason: "image has no pixels".to_string(),
            });
        }

        let pair = preprocess(image, self.settings.input_size, self.settings.resize_filter);

        let input = if self.settings.normalize {
            self.normalizer.normalize_l(&pair.resized)
        } else {
            pair.resized
        };

        tracing::info!("Running colorizer at {0}x{0}...", self.settings.input_size);
        let chroma = self.network.predict(&input)?;

        let chroma = if self.settings.normalize {
            self.normalizer.denormalize_ab(&chroma)
        } else {
            chroma
        };

        postprocess(&pair.native, &chroma, self.settings.upsample)
    }
}
