//! Domain types shared by the runtime and its adapters.

pub mod benchmark;
pub mod capabilities;
pub mod model;
pub mod options;

pub use benchmark::{BenchmarkMetrics, BenchmarkResult, PromptResult};
pub use capabilities::{CapabilityFlags, CapabilitySet};
pub use model::{ModelInfo, Quantization, format_file_size};
pub use options::{ModelOptions, ResolvedOptions};
