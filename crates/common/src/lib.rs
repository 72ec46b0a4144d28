//! Clipline Common Utilities
//!
//! Shared infrastructure for all Clipline crates:
//! - Error types and result aliases
//! - Timing utilities (frame pacing, boundary drift, tolerances)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
