//! # lib-measure
//!
//! Measurement engine of the antenna analyzer.
//!
//! - **Derived quantities**: SWR, return loss, reflection, parallel equivalent, Smith position
//! - **Calibration**: open/short/load error-term correction
//! - **Far-end**: de-embedding through a lossy feedline
//! - **Traces**: append-only sweeps with raw and calibrated series
//! - **Measurement set**: bounded trace history with memoised far-end and TDR views

pub mod calibration;
pub mod derived;
pub mod error;
pub mod far_end;
pub mod measurement_set;
pub mod settings;
pub mod trace;

pub use calibration::{CalibrationModel, CalibrationState, StandardKind, StandardSet, StandardTable};
pub use derived::{compute_swr, parallel_equivalent, reflection, SampleDerived, Swr};
pub use error::{MeasureError, MeasureResult};
pub use far_end::{deembed, deembed_samples};
pub use measurement_set::{FarEndView, MeasurementSet};
pub use settings::{EngineSettings, TdrSettings};
pub use trace::{DerivedSeries, Trace};
