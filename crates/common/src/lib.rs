//! PupilTrack Common Utilities
//!
//! Shared infrastructure for all PupilTrack crates:
//! - Error types and result aliases
//! - Wall-clock stamping for emitted measurements
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
