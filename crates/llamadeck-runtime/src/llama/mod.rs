//! Everything specific to the external llama-cli binary: capability probing,
//! argument construction and shared library lookup.

mod error;
mod invocation;
mod library;
mod probe;

pub use error::ProbeError;
pub use invocation::{LlamaInvocation, thread_count};
pub use library::{
    find_shared_library, library_env, library_path_var, library_search_dir, shared_library_name,
};
pub use probe::{probe_capabilities, probe_or_minimal, validate_binary};
