//! The `tokenfs` command shell.

#![deny(
    missing_docs,
    nonstandard_style,
    unused_mut,
    unused_variables,
    unreachable_patterns
)]

pub mod cli;
pub mod logging;
pub mod shell;

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
