//! # Observability
//!
//! Structured logging for the construction pipeline, built on `tracing`.
//!
//! ```rust,no_run
//! use polargraph_core::observe::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development());
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
