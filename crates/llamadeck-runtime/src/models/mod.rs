//! Model file discovery.

mod registry;

pub use registry::{ModelRegistry, describe_model};
