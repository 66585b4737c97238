//! Shared plumbing for the facto binaries: environment configuration,
//! tracing bootstrap, and shutdown wiring.

mod config;
mod runtime;

pub use config::{Config, ConfigError};
pub use runtime::{init_tracing, shutdown_signal};
