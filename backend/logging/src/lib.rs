//! Structured logging for ocrgrep.
//!
//! Human-readable console output on stderr (stdout carries search results)
//! plus an optional daily-rotated JSON file.

pub mod logger;

pub use logger::{build_filter, init_logger};
