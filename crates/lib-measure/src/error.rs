//! Error types for the measurement engine.

use crate::calibration::{CalibrationState, StandardKind};
use lib_dsp::DspError;
use thiserror::Error;

/// Errors raised by calibration and trace management.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// Operation not allowed in the current calibration state.
    #[error("Calibration is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: CalibrationState,
        actual: CalibrationState,
    },

    /// A calibration standard table is empty.
    #[error("{0:?} standard has no points")]
    EmptyStandard(StandardKind),

    /// A calibration standard table is not strictly increasing in frequency.
    #[error("{kind:?} standard: {source}")]
    UnorderedStandard {
        kind: StandardKind,
        #[source]
        source: DspError,
    },

    /// `finish` called before all three standards were recorded.
    #[error("{0:?} standard missing")]
    MissingStandard(StandardKind),

    /// No trace at the given history index.
    #[error("No trace at index {0}")]
    NoSuchTrace(usize),

    /// Configuration value out of range.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// Error from the DSP layer.
    #[error(transparent)]
    Dsp(#[from] DspError),
}

/// Result type for measurement operations.
pub type MeasureResult<T> = Result<T, MeasureError>;
