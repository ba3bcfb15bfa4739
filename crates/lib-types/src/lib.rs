//! # lib-types
//!
//! Core type definitions for the antenna-analyzer measurement engine.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units with compile-time safety
//! - Raw analyzer samples and impedance / reflection conversions
//! - Plot-ready series and Smith-chart points
//! - Feedline parameters and the analyzer model catalog

pub mod units;
pub mod sample;
pub mod impedance;
pub mod series;
pub mod cable;
pub mod analyzer;

pub use units::*;
pub use sample::*;
pub use impedance::*;
pub use series::*;
pub use cable::*;
pub use analyzer::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
