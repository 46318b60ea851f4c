//! Model downloading and loading utilities.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use sha2::{Digest, Sha256};

use crate::config::{Accelerator, ModelSpec};
use crate::error::{Error, Result};

/// Types of models used by the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Colorizer - predicts chrominance from lightness.
    Colorizer,
    /// Face restorer - repairs facial detail.
    FaceRestorer,
}

impl ModelType {
    /// Human-readable name used in logs and errors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Colorizer => "colorizer",
            Self::FaceRestorer => "face restorer",
        }
    }
}

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Without an override this uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\chromalift\models`
    /// - Linux: `~/.cache/chromalift/models`
    /// - macOS: `~/Library/Caches/chromalift/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(cache_dir: Option<&Path>) -> Result<Self> {
        let cache_dir = cache_dir.map_or_else(
            || {
                dirs::cache_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("chromalift")
                    .join("models")
            },
            Path::to_path_buf,
        );

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Directory holding cached weights.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// An explicit `spec.path` wins and must exist. Otherwise the cache copy
    /// is used, fetched from `spec.url` first when it is missing. When
    /// `spec.sha256` is set, whichever file is chosen must match it.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are missing and cannot be downloaded,
    /// or if they do not match the expected digest.
    pub fn get_model_path(&self, model_type: ModelType, spec: &ModelSpec) -> Result<PathBuf> {
        let expected = spec.sha256.as_deref();

        if let Some(path) = &spec.path {
            if path.is_file() {
                verify_file(path, model_type.label(), expected)?;
                return Ok(path.clone());
            }
            return Err(Error::ModelMissing {
                name: model_type.label().to_string(),
                path: path.clone(),
            });
        }

        let path = self.cache_dir.join(&spec.file_name);
        if path.is_file() {
            verify_file(&path, &spec.file_name, expected)?;
            return Ok(path);
        }

        match &spec.url {
            Some(url) => {
                download_file(url, &path, &spec.file_name, expected)?;
                Ok(path)
            }
            None => Err(Error::ModelMissing {
                name: model_type.label().to_string(),
                path,
            }),
        }
    }

    /// Load an ONNX model session.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are missing or the model cannot be loaded.
    pub fn load_session(
        &self,
        model_type: ModelType,
        spec: &ModelSpec,
        accelerator: Accelerator,
    ) -> Result<Session> {
        let path = self.get_model_path(model_type, spec)?;
        let name = model_type.label();

        tracing::info!("Loading {name} from {}", path.display());

        let providers = match accelerator {
            Accelerator::Cpu => vec![CPUExecutionProvider::default().build()],
            Accelerator::Auto | Accelerator::Cuda => vec![
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ],
        };

        Session::builder()
            .map_err(load_error(name))?
            .with_execution_providers(providers)
            .map_err(load_error(name))?
            .commit_from_file(&path)
            .map_err(load_error(name))
    }
}

fn load_error<E: Into<ort::Error>>(name: &str) -> impl FnOnce(E) -> Error + '_ {
    move |source| Error::ModelLoad {
        name: name.to_string(),
        source: source.into(),
    }
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str, expected: Option<&str>) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let download_error = |source| Error::ModelDownload {
        name: name.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(download_error)?;

    let pb = match response.content_length() {
        Some(total_size) => {
            let pb = ProgressBar::new(total_size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("#>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    pb.set_message(format!("Downloading {name}"));

    store_verified(response, path, name, expected, &pb)?;
    pb.finish_with_message(format!("Downloaded {name}"));

    Ok(())
}

/// Stream `reader` into `path`, hashing as it goes.
///
/// The bytes land in a temporary file that is renamed into place only after
/// the digest matches; on any failure the temporary file is removed.
fn store_verified(
    reader: impl Read,
    path: &Path,
    name: &str,
    expected: Option<&str>,
    pb: &ProgressBar,
) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    if let Err(err) = write_hashed(reader, &temp_path, name, expected, pb) {
        pb.abandon();
        fs::remove_file(&temp_path).ok();
        return Err(err);
    }

    fs::rename(&temp_path, path).map_err(|source| {
        fs::remove_file(&temp_path).ok();
        Error::ModelFile {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn write_hashed(
    mut reader: impl Read,
    temp_path: &Path,
    name: &str,
    expected: Option<&str>,
    pb: &ProgressBar,
) -> Result<()> {
    let file_error = |source| Error::ModelFile {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(file_error)?;
    let mut hasher = Sha256::new();
    let mut downloaded = 0u64;

    loop {
        let mut buffer = [0u8; 8192];
        let bytes_read = reader.read(&mut buffer).map_err(file_error)?;
        if bytes_read == 0 {
            break;
        }
        let chunk = &buffer[..bytes_read];
        file.write_all(chunk).map_err(file_error)?;
        hasher.update(chunk);
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }
    file.flush().map_err(file_error)?;

    match expected {
        Some(expected) => check_digest(name, expected, &hasher.finalize()),
        None => Ok(()),
    }
}

/// Hash a file already on disk and compare it to `expected`.
fn verify_file(path: &Path, name: &str, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let file_error = |source| Error::ModelFile {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::open(path).map_err(file_error)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(file_error)?;

    check_digest(name, expected, &hasher.finalize())
}

fn check_digest(name: &str, expected: &str, digest: &[u8]) -> Result<()> {
    let actual: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }

    tracing::error!("{name} failed its integrity check");
    Err(Error::ChecksumMismatch {
        name: name.to_string(),
        expected: expected.trim().to_string(),
        actual,
    })
}
