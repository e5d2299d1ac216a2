//! Schema module - Configuration types for conversion and playback.

mod config;

pub use config::*;
