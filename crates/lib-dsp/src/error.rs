//! Error types for DSP operations.

use thiserror::Error;

/// Errors that can occur during DSP operations.
#[derive(Debug, Error)]
pub enum DspError {
    /// FFT size is not a power of 2.
    #[error("FFT size must be power of 2, got {0}")]
    InvalidFftSize(usize),

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Sweep holds more samples than the transform accepts.
    #[error("Too many samples: at most {max}, got {got}")]
    TooManySamples { max: usize, got: usize },

    /// TDR requires a sweep starting at (or very near) DC.
    #[error("Sweep must start at DC, first frequency is {0} kHz")]
    NonZeroStart(f64),

    /// Required FFT exceeds the configured ceiling.
    #[error("FFT size {size} exceeds maximum {max}")]
    FftTooLarge { size: usize, max: usize },

    /// Frequency axis is not usable (zero span, not increasing).
    #[error("Invalid frequency axis: {0}")]
    InvalidFrequencyAxis(String),
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;
