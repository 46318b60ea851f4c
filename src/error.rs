//! Custom error types for chromalift.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the chromalift library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The output file extension names a format we do not write.
    #[error("unsupported output format for {path}: expected png, jpg, jpeg or bmp")]
    UnsupportedFormat { path: PathBuf },

    /// An image or plane has the wrong number of channels.
    #[error("expected {expected} channels, got {actual}")]
    ChannelCount { expected: usize, actual: usize },

    /// Image dimensions are not supported.
    #[error("unsupported image dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Model weights do not match their published digest.
    #[error("checksum mismatch for {name}: expected sha256 {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Model weights are neither on disk nor downloadable.
    #[error("model weights {name} not found at {path}")]
    ModelMissing { name: String, path: PathBuf },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A model ran but produced nothing usable.
    #[error("{model} returned no result")]
    EmptyOutput { model: &'static str },

    /// A subsystem failed to initialize and cannot serve requests.
    #[error("{feature} is unavailable: {reason}")]
    FeatureUnavailable {
        feature: &'static str,
        reason: String,
    },

    /// A processing operation was requested without a source image.
    #[error("no image loaded")]
    NoImageLoaded,

    /// Saving was requested before any operation produced a result.
    #[error("no processed image to save")]
    NoResult,

    /// Processing was cancelled between stages.
    #[error("processing cancelled")]
    Cancelled,

    /// The background worker panicked.
    #[error("processing worker panicked")]
    WorkerPanicked,

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or write a model weights file.
    #[error("failed to access model file {path}: {source}")]
    ModelFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a configuration file.
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("invalid configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Broad failure classes, used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Startup failures: missing weights, model load, configuration.
    Initialization,
    /// Bad input from the user: unreadable files, wrong channel counts.
    Input,
    /// The models ran and failed, or processing was interrupted.
    Inference,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelDownload { .. }
            | Self::ChecksumMismatch { .. }
            | Self::ModelMissing { .. }
            | Self::ModelLoad { .. }
            | Self::FeatureUnavailable { .. }
            | Self::CacheDir { .. }
            | Self::ModelFile { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigFile { .. }
            | Self::InvalidParameter { .. } => ErrorKind::Initialization,
            Self::ImageLoad { .. }
            | Self::ImageSave { .. }
            | Self::UnsupportedFormat { .. }
            | Self::ChannelCount { .. }
            | Self::UnsupportedDimensions { .. }
            | Self::NoImageLoaded
            | Self::Io(_)
            | Self::ShapeMismatch { .. } => ErrorKind::Input,
            Self::Inference { .. }
            | Self::EmptyOutput { .. }
            | Self::NoResult
            | Self::Cancelled
            | Self::WorkerPanicked => ErrorKind::Inference,
        }
    }
}

/// Result type alias for chromalift operations.
pub type Result<T> = std::result::Result<T, Error>;
