//! Configuration for the colorization and restoration pipelines.
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "colorizer": { "model": { "path": "models/colorizer.onnx" } },
//!   "accelerator": "cpu"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{Interpolation, Upsample};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Colorization network settings.
    pub colorizer: ColorizerConfig,

    /// Face-restoration network settings.
    pub restorer: RestorerConfig,

    /// Which execution provider to run the models on.
    pub accelerator: Accelerator,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,

    /// Directory for cached model weights. Defaults to the platform cache dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            colorizer: ColorizerConfig::default(),
            restorer: RestorerConfig::default(),
            accelerator: Accelerator::Auto,
            output_quality: 95,
            cache_dir: None,
        }
    }
}

/// Where a model's weights come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// File name inside the cache directory.
    #[serde(default)]
    pub file_name: String,

    /// Explicit local path; when set it must exist.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Download location used when the cache has no copy.
    #[serde(default)]
    pub url: Option<String>,

    /// Expected SHA-256 of the weights, as hex. Checked on download and on
    /// every cache hit.
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ModelSpec {
    /// A spec resolved only through the cache directory.
    #[must_use]
    pub fn cached(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            path: None,
            url: None,
            sha256: None,
        }
    }
}

/// Colorization network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizerConfig {
    pub model: ModelSpec,

    /// Square resolution the network runs at.
    pub input_size: u32,

    /// Kernel used to shrink the source to `input_size`.
    pub resize_filter: Interpolation,

    /// Kernel used to bring the predicted chrominance back to native size.
    pub upsample: Upsample,

    /// Normalize lightness before the graph and rescale chrominance after.
    ///
    /// The default suits exports of the bare network trunk. An export of the
    /// full colorizer forward pass already centers L and scales ab inside the
    /// graph, so leaving this on would apply both steps twice; set it to
    /// `false` for such graphs.
    pub normalize: bool,
}

impl Default for ColorizerConfig {
    fn default() -> Self {
        Self {
            model: ModelSpec::cached("colorizer.onnx"),
            input_size: 256,
            resize_filter: Interpolation::Bicubic,
            upsample: Upsample::Bilinear,
            normalize: true,
        }
    }
}

/// Face-restoration network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorerConfig {
    pub model: ModelSpec,

    /// Square resolution the network runs at.
    pub input_size: u32,

    /// Output scale relative to the input image.
    pub upscale: u32,
}

impl Default for RestorerConfig {
    fn default() -> Self {
        Self {
            model: ModelSpec::cached("gfpgan_v1.3.onnx"),
            input_size: 512,
            upscale: 2,
        }
    }
}

/// Execution provider selection. CPU is always kept as a fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    /// Use CUDA when the runtime has it, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl Config {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.colorizer.input_size == 0 {
            return Err(Error::InvalidParameter {
                name: "colorizer.input_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.restorer.input_size == 0 {
            return Err(Error::InvalidParameter {
                name: "restorer.input_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if !(1..=8).contains(&self.restorer.upscale) {
            return Err(Error::InvalidParameter {
                name: "restorer.upscale".to_string(),
                reason: "must be between 1 and 8".to_string(),
            });
        }

        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::InvalidParameter {
                name: "output_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        for spec in [&self.colorizer.model, &self.restorer.model] {
            if spec.file_name.is_empty() && spec.path.is_none() {
                return Err(Error::InvalidParameter {
                    name: "model.file_name".to_string(),
                    reason: "needs a file name or an explicit path".to_string(),
                });
            }
        }

        Ok(())
    }
}
