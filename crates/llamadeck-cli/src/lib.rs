//! Command-line front end for llamadeck.
//!
//! The binary is the composition root: it loads configuration, installs
//! logging and the crash-log panic hook, builds one [`Session`] and routes
//! each subcommand to a handler.
//!
//! [`Session`]: llamadeck_runtime::Session
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used only by the binary target
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, bootstrap, install_crash_hook};
pub use commands::{Commands, GenerationArgs};
pub use parser::Cli;
