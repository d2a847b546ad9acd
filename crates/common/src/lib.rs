//! VideoBank Common Utilities
//!
//! Shared infrastructure for all VideoBank crates:
//! - Error taxonomy and result alias
//! - Clock capability used to time recordings and schedule ticks
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
