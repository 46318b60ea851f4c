//! # chromalift
//!
//! Colorize grayscale photographs and restore faces with pretrained ONNX
//! models.
//!
//! Colorization runs the network on the lightness channel at a fixed
//! resolution, then applies the predicted chrominance at the photograph's
//! own resolution, so the output always keeps the source's dimensions.
//!
//! ## Example
//!
//! ```no_run
//! use chromalift::{Config, Operation, Processor};
//!
//! # fn main() -> chromalift::Result<()> {
//! let mut processor = Processor::new(Config::default())?;
//!
//! processor.load("old_photo.jpg")?;
//! processor.process(Operation::ColorizeEnhance)?;
//! processor.save("restored.png")?;
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{CancelToken, Operation, Processor, Task};
