//! Model weight resolution and ONNX session creation.

mod loader;

pub use loader::{ModelCache, ModelType};
