pub mod config;
pub mod customer;

pub use config::{AlgorithmChoice, Config, LlmConfig, OllamaConfig, SegmentationConfig};
pub use customer::*;
