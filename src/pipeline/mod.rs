//! Colorization and face-restoration pipelines and their orchestration.

mod colorize;
mod enhance;
mod network;
mod processor;
mod worker;

pub use colorize::{postprocess, preprocess, Colorizer, LightnessPair};
pub use enhance::{FaceRestorer, OnnxFaceRestorer};
pub use network::{ChromaNetwork, ChromaTensor, LumaTensor, OnnxColorNet};
pub use processor::{Operation, Processor, Source};
pub use worker::{CancelToken, Completed, Task};
