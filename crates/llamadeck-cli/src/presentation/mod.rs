//! Terminal formatting shared by the handlers. Format-only: no domain logic.

pub mod tables;

pub use tables::{print_separator, truncate_string};
