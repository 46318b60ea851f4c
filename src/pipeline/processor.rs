//! Orchestration of the three processing operations over one loaded image.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{DynamicImage, RgbImage};

use crate::color::{bgr_to_rgb, rgb_to_bgr};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::{load_image, save_image, to_rgb};
use crate::model::ModelCache;

use super::colorize::Colorizer;
use super::enhance::{restore_frame, FaceRestorer, OnnxFaceRestorer};
use super::worker::CancelToken;

const COLORIZATION: &str = "colorization";
const ENHANCEMENT: &str = "enhancement";

/// The processing operations offered on a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Face restoration only.
    Enhance,
    /// Colorization only.
    Colorize,
    /// Colorization followed by face restoration.
    ColorizeEnhance,
}

impl Operation {
    /// Every operation, in menu order.
    pub const ALL: [Self; 3] = [Self::Enhance, Self::Colorize, Self::ColorizeEnhance];

    const fn needs_colorizer(self) -> bool {
        matches!(self, Self::Colorize | Self::ColorizeEnhance)
    }

    const fn needs_restorer(self) -> bool {
        matches!(self, Self::Enhance | Self::ColorizeEnhance)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enhance => "enhance",
            Self::Colorize => "colorize",
            Self::ColorizeEnhance => "colorize-enhance",
        })
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "enhance" => Ok(Self::Enhance),
            "colorize" => Ok(Self::Colorize),
            "colorize-enhance" | "colorize_enhance" => Ok(Self::ColorizeEnhance),
            other => Err(Error::InvalidParameter {
                name: "operation".to_string(),
                reason: format!("unknown operation {other:?}"),
            }),
        }
    }
}

/// A subsystem that either loaded or recorded why it could not.
enum Feature<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Feature<T> {
    fn from_result(name: &'static str, result: Result<T>) -> Self {
        match result {
            Ok(value) => {
                tracing::info!("{name} ready");
                Self::Ready(value)
            }
            Err(err) => {
                tracing::error!("{name} disabled: {err}");
                Self::Unavailable(err.to_string())
            }
        }
    }

    fn get_mut(&mut self, name: &'static str) -> Result<&mut T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Unavailable(reason) => Err(Error::FeatureUnavailable {
                feature: name,
                reason: reason.clone(),
            }),
        }
    }

    fn ensure(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Ready(_) => Ok(()),
            Self::Unavailable(reason) => Err(Error::FeatureUnavailable {
                feature: name,
                reason: reason.clone(),
            }),
        }
    }

    fn missing() -> Self {
        Self::Unavailable("not configured".to_string())
    }

    fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// The image currently loaded for processing.
#[derive(Debug, Clone)]
pub struct Source {
    /// Where the image was read from, if it came from disk.
    pub path: Option<PathBuf>,
    /// The image as 8-bit RGB.
    pub image: RgbImage,
}

/// Holds the models and the session state: one source image and the latest
/// processed result.
pub struct Processor {
    config: Config,
    colorizer: Feature<Colorizer>,
    restorer: Feature<Box<dyn FaceRestorer>>,
    source: Option<Source>,
    processed: Option<RgbImage>,
}

impl Processor {
    /// Create a processor and load both models.
    ///
    /// A model that fails to load disables only the operations that need it;
    /// the failure is logged here, once.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing processor with config: {config:?}");

        let (colorizer, restorer) = match ModelCache::new(config.cache_dir.as_deref()) {
            Ok(cache) => {
                let colorizer = Feature::from_result(
                    COLORIZATION,
                    Colorizer::load(&cache, config.colorizer.clone(), config.accelerator),
                );
                let restorer = Feature::from_result(
                    ENHANCEMENT,
                    OnnxFaceRestorer::load(&cache, config.restorer.clone(), config.accelerator)
                        .map(|r| Box::new(r) as Box<dyn FaceRestorer>),
                );
                (colorizer, restorer)
            }
            Err(err) => {
                tracing::error!("model cache unavailable: {err}");
                (
                    Feature::Unavailable(err.to_string()),
                    Feature::Unavailable(err.to_string()),
                )
            }
        };

        Ok(Self {
            config,
            colorizer,
            restorer,
            source: None,
            processed: None,
        })
    }

    /// Create a processor from already built components.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_components(
        config: Config,
        colorizer: Option<Colorizer>,
        restorer: Option<Box<dyn FaceRestorer>>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            colorizer: colorizer.map_or_else(Feature::missing, Feature::Ready),
            restorer: restorer.map_or_else(Feature::missing, Feature::Ready),
            source: None,
            processed: None,
        })
    }

    /// Whether every model `operation` needs is loaded.
    #[must_use]
    pub fn is_available(&self, operation: Operation) -> bool {
        (!operation.needs_colorizer() || self.colorizer.is_ready())
            && (!operation.needs_restorer() || self.restorer.is_ready())
    }

    /// Check that every model `operation` needs is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeatureUnavailable`] carrying the load failure of the
    /// first missing model.
    pub fn ensure_available(&self, operation: Operation) -> Result<()> {
        if operation.needs_colorizer() {
            self.colorizer.ensure(COLORIZATION)?;
        }
        if operation.needs_restorer() {
            self.restorer.ensure(ENHANCEMENT)?;
        }
        Ok(())
    }

    /// Load a new source image from disk.
    ///
    /// On failure the previous source and result are kept. On success any
    /// previous result is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&RgbImage> {
        let path = path.as_ref();
        let image = load_image(path)?;

        tracing::info!("Loaded {}", path.display());
        Ok(self.replace_source(Some(path.to_path_buf()), image))
    }

    /// Use an in-memory image as the new source.
    ///
    /// # Errors
    ///
    /// Returns an error if the image has no pixels.
    pub fn load_dynamic(&mut self, image: DynamicImage) -> Result<&RgbImage> {
        let image = to_rgb(image)?;
        Ok(self.replace_source(None, image))
    }

    fn replace_source(&mut self, path: Option<PathBuf>, image: RgbImage) -> &RgbImage {
        self.processed = None;
        &self.source.insert(Source { path, image }).image
    }

    /// The loaded source, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// The latest processed image, if any.
    #[must_use]
    pub const fn processed(&self) -> Option<&RgbImage> {
        self.processed.as_ref()
    }

    /// Run `operation` on the loaded image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImageLoaded`] without touching any state when no
    /// image is loaded. Other failures keep the previous result.
    pub fn process(&mut self, operation: Operation) -> Result<&RgbImage> {
        self.process_with_cancel(operation, &CancelToken::new())
    }

    /// Run `operation`, checking `cancel` before each stage.
    ///
    /// # Errors
    ///
    /// As [`Processor::process`], plus [`Error::Cancelled`] when the token
    /// fires between stages.
    pub fn process_with_cancel(
        &mut self,
        operation: Operation,
        cancel: &CancelToken,
    ) -> Result<&RgbImage> {
        let source = &self.source.as_ref().ok_or(Error::NoImageLoaded)?.image;

        tracing::info!("Processing: {operation}");
        cancel.check()?;

        let result = match operation {
            Operation::Enhance => {
                let restorer = self.restorer.get_mut(ENHANCEMENT)?;
                enhance_rgb(&mut **restorer, source)?
            }
            Operation::Colorize => self.colorizer.get_mut(COLORIZATION)?.colorize(source)?,
            Operation::ColorizeEnhance => {
                let colorizer = self.colorizer.get_mut(COLORIZATION)?;
                let restorer = self.restorer.get_mut(ENHANCEMENT)?;
                let colorized = colorizer.colorize(source)?;
                cancel.check()?;
                enhance_rgb(&mut **restorer, &colorized)?
            }
        };

        tracing::info!("{operation} complete");
        Ok(self.processed.insert(result))
    }

    /// Save the latest result, format chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResult`] if nothing has been processed yet, or an
    /// error if writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.processed.as_ref().ok_or(Error::NoResult)?;
        save_image(image, path.as_ref(), self.config.output_quality)?;
        tracing::info!("Image saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Drop the loaded image and any result.
    pub fn reset(&mut self) {
        self.source = None;
        self.processed = None;
        tracing::info!("Processor reset");
    }
}

/// Run an RGB image through a BGR restorer and back.
fn enhance_rgb(restorer: &mut dyn FaceRestorer, image: &RgbImage) -> Result<RgbImage> {
    let frame = rgb_to_bgr(image);
    let restored = restore_frame(restorer, frame.view())?;
    bgr_to_rgb(restored.view())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse_and_display() {
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
        assert_eq!(
            "Colorize_Enhance".parse::<Operation>().unwrap(),
            Operation::ColorizeEnhance
        );
        assert!("sharpen".parse::<Operation>().is_err());
    }

    #[test]
    fn test_unconfigured_features() {
        let mut processor = Processor::with_components(Config::default(), None, None).unwrap();
        for op in Operation::ALL {
            assert!(!processor.is_available(op));
        }

        processor.load_dynamic(DynamicImage::new_rgb8(4, 4)).unwrap();
        let err = processor.ensure_available(Operation::Enhance).unwrap_err();
        assert!(matches!(
            err,
            Error::FeatureUnavailable {
                feature: "enhancement",
                ..
            }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::Initialization);

        let err = processor.process(Operation::Colorize).unwrap_err();
        assert!(matches!(
            err,
            Error::FeatureUnavailable {
                feature: "colorization",
                ..
            }
        ));
        assert!(processor.processed().is_none());
    }

    #[test]
    fn test_missing_weights_disable_features_at_startup() {
        let dir = std::env::temp_dir().join(format!("chromalift-proc-{}", std::process::id()));
        let config = Config {
            cache_dir: Some(dir.clone()),
            ..Config::default()
        };

        let processor = Processor::new(config).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        for op in Operation::ALL {
            assert!(!processor.is_available(op));
        }
        match processor.ensure_available(Operation::Colorize) {
            Err(Error::FeatureUnavailable { feature, reason }) => {
                assert_eq!(feature, "colorization");
                assert!(reason.contains("not found"), "{reason}");
            }
            other => panic!("expected FeatureUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            output_quality: 0,
            ..Config::default()
        };
        assert!(Processor::with_components(config, None, None).is_err());
    }
}
