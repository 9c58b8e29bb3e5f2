//! Core utilities for the G-Sync test bench.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - The per-frame clock and sleeping
//! - Configuration management

mod clock;
pub mod config;
mod error;
mod logging;

pub use clock::{Clock, MonotonicSource, Sleeper, ThreadSleeper, TimeSource};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::{DEFAULT_FILTER, init_logging, init_logging_with};
