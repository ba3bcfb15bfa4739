//! One-port open/short/load error correction.
//!
//! The analyzer's systematic error is modelled by three complex terms
//! (directivity `e00`, source match `e11`, and `Δe = e00·e11 - e10·e01`):
//!
//! ```text
//! Γm = e00 + Γa·Γm·e11 - Γa·Δe
//! ```
//!
//! Measuring three standards of known actual reflection gives a 3x3 linear
//! system for the terms. Solving it per frequency and inverting the model
//! recovers the actual reflection `Γa` of the device under test.
//!
//! Standards are recorded as tables of measured Γ versus frequency and
//! queried with independent linear interpolation of real and imaginary
//! parts. Correction fails closed: any missing table, out-of-range
//! frequency or singular system leaves the raw reading in place.

use crate::error::{MeasureError, MeasureResult};
use lib_dsp::interpolation::{interpolate_at, validate_axis};
use lib_types::{gamma_to_impedance, impedance_to_gamma, Hertz, Ohms, SamplePoint};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Pivot magnitude below which the system is treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Calibration standard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardKind {
    Open,
    Short,
    Load,
}

impl StandardKind {
    pub const ALL: [StandardKind; 3] = [Self::Open, Self::Short, Self::Load];

    /// Reflection of an ideal standard.
    pub fn ideal(&self) -> Complex64 {
        match self {
            Self::Open => Complex64::new(1.0, 0.0),
            Self::Short => Complex64::new(-1.0, 0.0),
            Self::Load => Complex64::new(0.0, 0.0),
        }
    }
}

/// Lifecycle of a calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    #[default]
    Uninitialized,
    Building,
    Ready,
}

/// Reflection of the three standards at one frequency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardSet {
    pub open: Complex64,
    pub short: Complex64,
    pub load: Complex64,
}

impl StandardSet {
    /// Ideal open/short/load.
    pub fn ideal() -> Self {
        Self {
            open: StandardKind::Open.ideal(),
            short: StandardKind::Short.ideal(),
            load: StandardKind::Load.ideal(),
        }
    }

    fn pairs(&self) -> [Complex64; 3] {
        [self.open, self.short, self.load]
    }
}

/// Measured Γ of one standard versus frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardTable {
    frequencies: Vec<Hertz>,
    values: Vec<Complex64>,
}

impl StandardTable {
    /// Build a table; points must be non-empty and strictly increasing in
    /// frequency.
    pub fn new(kind: StandardKind, points: Vec<(Hertz, Complex64)>) -> MeasureResult<Self> {
        if points.is_empty() {
            return Err(MeasureError::EmptyStandard(kind));
        }
        let (frequencies, values): (Vec<Hertz>, Vec<Complex64>) = points.into_iter().unzip();
        validate_axis(&frequencies)
            .map_err(|source| MeasureError::UnorderedStandard { kind, source })?;
        Ok(Self {
            frequencies,
            values,
        })
    }

    /// Table from raw impedance readings of a standard.
    pub fn from_samples(kind: StandardKind, samples: &[SamplePoint], z0: Ohms) -> MeasureResult<Self> {
        let points = samples
            .iter()
            .map(|s| (s.frequency(), impedance_to_gamma(z0, s.r_ohm, s.x_ohm)))
            .collect();
        Self::new(kind, points)
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn at(&self, frequency: Hertz) -> Option<Complex64> {
        interpolate_at(&self.frequencies, &self.values, frequency)
    }
}

/// Open/short/load calibration with its build state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationModel {
    state: CalibrationState,
    enabled: bool,
    open: Option<StandardTable>,
    short: Option<StandardTable>,
    load: Option<StandardTable>,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationModel {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Uninitialized,
            enabled: true,
            open: None,
            short: None,
            load: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == CalibrationState::Ready
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ready and enabled: calibrated results take precedence over raw ones.
    pub fn is_active(&self) -> bool {
        self.is_ready() && self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Start a new calibration, discarding any previous tables.
    pub fn begin(&mut self) {
        self.open = None;
        self.short = None;
        self.load = None;
        self.state = CalibrationState::Building;
        debug!("calibration build started");
    }

    /// Drop everything and return to `Uninitialized`.
    pub fn reset(&mut self) {
        self.open = None;
        self.short = None;
        self.load = None;
        self.state = CalibrationState::Uninitialized;
    }

    fn expect_state(&self, expected: CalibrationState) -> MeasureResult<()> {
        if self.state != expected {
            return Err(MeasureError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn slot(&mut self, kind: StandardKind) -> &mut Option<StandardTable> {
        match kind {
            StandardKind::Open => &mut self.open,
            StandardKind::Short => &mut self.short,
            StandardKind::Load => &mut self.load,
        }
    }

    pub fn standard(&self, kind: StandardKind) -> Option<&StandardTable> {
        match kind {
            StandardKind::Open => self.open.as_ref(),
            StandardKind::Short => self.short.as_ref(),
            StandardKind::Load => self.load.as_ref(),
        }
    }

    /// Store the measured Γ table of one standard.
    pub fn record_standard(
        &mut self,
        kind: StandardKind,
        points: Vec<(Hertz, Complex64)>,
    ) -> MeasureResult<()> {
        self.expect_state(CalibrationState::Building)?;
        let table = StandardTable::new(kind, points)?;
        debug!(standard = ?kind, points = table.len(), "standard recorded");
        *self.slot(kind) = Some(table);
        Ok(())
    }

    /// Store a standard from raw impedance readings.
    pub fn record_standard_from_samples(
        &mut self,
        kind: StandardKind,
        samples: &[SamplePoint],
        z0: Ohms,
    ) -> MeasureResult<()> {
        self.expect_state(CalibrationState::Building)?;
        let table = StandardTable::from_samples(kind, samples, z0)?;
        debug!(standard = ?kind, points = table.len(), "standard recorded");
        *self.slot(kind) = Some(table);
        Ok(())
    }

    /// Complete the build. All three standards must be present.
    pub fn finish(&mut self) -> MeasureResult<()> {
        self.expect_state(CalibrationState::Building)?;
        for kind in StandardKind::ALL {
            if self.standard(kind).is_none() {
                return Err(MeasureError::MissingStandard(kind));
            }
        }
        self.state = CalibrationState::Ready;
        info!("calibration ready");
        Ok(())
    }

    /// Measured standards at `frequency_khz`, or `None` when not ready or
    /// outside any table's domain.
    pub fn interpolate_standards(&self, frequency_khz: f64) -> Option<StandardSet> {
        if !self.is_ready() {
            return None;
        }
        let f = Hertz::from_khz(frequency_khz);
        Some(StandardSet {
            open: self.open.as_ref()?.at(f)?,
            short: self.short.as_ref()?.at(f)?,
            load: self.load.as_ref()?.at(f)?,
        })
    }

    /// Error-corrected copy of `sample`, or `None` when calibration is not
    /// available at this frequency.
    ///
    /// Works whenever the model is ready; the enabled flag only decides
    /// which variant consumers display.
    pub fn correct(&self, sample: &SamplePoint, z0: Ohms) -> Option<SamplePoint> {
        let measured = self.interpolate_standards(sample.frequency_khz)?;
        let s = sample.sanitized();
        let raw = impedance_to_gamma(z0, s.r_ohm, s.x_ohm);
        let actual = apply_calibration(raw, &measured, &StandardSet::ideal());
        let (r, x) = gamma_to_impedance(z0, actual);
        Some(SamplePoint::new(sample.frequency_khz, r, x))
    }
}

/// Error terms `(e00, e11, Δe)` from measured and actual standards.
pub fn solve_error_terms(measured: &StandardSet, ideal: &StandardSet) -> Option<[Complex64; 3]> {
    let mut a = Array2::<Complex64>::zeros((3, 3));
    let mut b = Array1::<Complex64>::zeros(3);
    for (row, (gm, ga)) in measured.pairs().iter().zip(ideal.pairs()).enumerate() {
        a[[row, 0]] = Complex64::new(1.0, 0.0);
        a[[row, 1]] = ga * gm;
        a[[row, 2]] = -ga;
        b[row] = *gm;
    }
    let x = solve_linear(a, b)?;
    Some([x[0], x[1], x[2]])
}

/// Actual reflection of a device measured as `gamma_raw`.
///
/// Falls back to `gamma_raw` when the standards do not determine the error
/// terms.
pub fn apply_calibration(gamma_raw: Complex64, measured: &StandardSet, ideal: &StandardSet) -> Complex64 {
    let [e00, e11, delta_e] = match solve_error_terms(measured, ideal) {
        Some(terms) => terms,
        None => {
            debug!("calibration system singular, using raw reflection");
            return gamma_raw;
        }
    };
    let denom = gamma_raw * e11 - delta_e;
    if denom.norm() < SINGULAR_EPSILON {
        return gamma_raw;
    }
    (gamma_raw - e00) / denom
}

/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Array2<Complex64>, mut b: Array1<Complex64>) -> Option<Array1<Complex64>> {
    let n = b.len();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[[row, col]].norm() > a[[pivot, col]].norm() {
                pivot = row;
            }
        }
        if a[[pivot, col]].norm() < SINGULAR_EPSILON {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                let v = a[[col, k]];
                a[[row, k]] -= factor * v;
            }
            let v = b[col];
            b[row] -= factor * v;
        }
    }

    let mut x = Array1::<Complex64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[[row, k]] * x[k];
        }
        x[row] = acc / a[[row, row]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    /// Forward error model: what the analyzer reports for actual `ga`.
    fn measure(ga: Complex64, e00: Complex64, e11: Complex64, e10e01: Complex64) -> Complex64 {
        e00 + e10e01 * ga / (c(1.0, 0.0) - e11 * ga)
    }

    fn ready_model(points: &[(f64, StandardSet)]) -> CalibrationModel {
        let mut model = CalibrationModel::new();
        model.begin();
        for kind in StandardKind::ALL {
            let table = points
                .iter()
                .map(|(khz, set)| {
                    let v = match kind {
                        StandardKind::Open => set.open,
                        StandardKind::Short => set.short,
                        StandardKind::Load => set.load,
                    };
                    (Hertz::from_khz(*khz), v)
                })
                .collect();
            model.record_standard(kind, table).unwrap();
        }
        model.finish().unwrap();
        model
    }

    #[test]
    fn test_ideal_standards_are_identity() {
        let ideal = StandardSet::ideal();
        for &g in &[c(0.3, -0.2), c(-0.9, 0.1), c(0.0, 0.0), c(0.5, 0.5)] {
            let out = apply_calibration(g, &ideal, &ideal);
            assert_eq!(out, g);
        }
    }

    #[test]
    fn test_recovers_actual_reflection() {
        let e00 = c(0.05, 0.02);
        let e11 = c(0.1, -0.05);
        let e10e01 = c(0.9, 0.1);
        let measured = StandardSet {
            open: measure(c(1.0, 0.0), e00, e11, e10e01),
            short: measure(c(-1.0, 0.0), e00, e11, e10e01),
            load: measure(c(0.0, 0.0), e00, e11, e10e01),
        };

        let [s00, s11, sde] = solve_error_terms(&measured, &StandardSet::ideal()).unwrap();
        assert!((s00 - e00).norm() < 1e-12);
        assert!((s11 - e11).norm() < 1e-12);
        assert!((sde - (e00 * e11 - e10e01)).norm() < 1e-12);

        let dut = c(0.3, 0.2);
        let out = apply_calibration(measure(dut, e00, e11, e10e01), &measured, &StandardSet::ideal());
        assert!((out - dut).norm() < 1e-12);
    }

    #[test]
    fn test_singular_system_returns_raw() {
        let degenerate = StandardSet {
            open: c(0.5, 0.0),
            short: c(0.5, 0.0),
            load: c(0.5, 0.0),
        };
        let g = c(0.2, 0.1);
        assert_eq!(apply_calibration(g, &degenerate, &StandardSet::ideal()), g);
    }

    #[test]
    fn test_state_machine() {
        let mut model = CalibrationModel::new();
        assert_eq!(model.state(), CalibrationState::Uninitialized);

        let pts = vec![(Hertz::from_khz(1000.0), c(1.0, 0.0))];
        assert!(matches!(
            model.record_standard(StandardKind::Open, pts.clone()),
            Err(MeasureError::InvalidState { .. })
        ));

        model.begin();
        model.record_standard(StandardKind::Open, pts.clone()).unwrap();
        model.record_standard(StandardKind::Short, pts.clone()).unwrap();
        assert!(matches!(
            model.finish(),
            Err(MeasureError::MissingStandard(StandardKind::Load))
        ));
        model.record_standard(StandardKind::Load, pts).unwrap();
        model.finish().unwrap();
        assert!(model.is_active());

        model.set_enabled(false);
        assert!(model.is_ready());
        assert!(!model.is_active());

        model.reset();
        assert_eq!(model.state(), CalibrationState::Uninitialized);
        assert!(model.standard(StandardKind::Open).is_none());
    }

    #[test]
    fn test_table_validation() {
        assert!(matches!(
            StandardTable::new(StandardKind::Short, vec![]),
            Err(MeasureError::EmptyStandard(StandardKind::Short))
        ));
        let unordered = vec![
            (Hertz(2e6), c(1.0, 0.0)),
            (Hertz(3e6), c(1.0, 0.0)),
            (Hertz(3e6), c(1.0, 0.0)),
        ];
        assert!(matches!(
            StandardTable::new(StandardKind::Open, unordered),
            Err(MeasureError::UnorderedStandard { kind: StandardKind::Open, .. })
        ));
        let backwards = vec![(Hertz(3e6), c(1.0, 0.0)), (Hertz(2e6), c(1.0, 0.0))];
        let err = StandardTable::new(StandardKind::Load, backwards).unwrap_err();
        assert!(err.to_string().contains("index 1"), "{}", err);
    }

    #[test]
    fn test_interpolate_standards() {
        let lo = StandardSet {
            open: c(0.9, 0.0),
            short: c(-0.9, 0.2),
            load: c(0.0, 0.0),
        };
        let hi = StandardSet {
            open: c(0.7, 0.2),
            short: c(-0.7, 0.0),
            load: c(0.02, 0.0),
        };
        let model = ready_model(&[(1000.0, lo), (3000.0, hi)]);

        let mid = model.interpolate_standards(2000.0).unwrap();
        assert!((mid.open - c(0.8, 0.1)).norm() < 1e-12);
        assert!((mid.short - c(-0.8, 0.1)).norm() < 1e-12);
        assert!((mid.load - c(0.01, 0.0)).norm() < 1e-12);

        assert!(model.interpolate_standards(500.0).is_none());
        assert!(model.interpolate_standards(3500.0).is_none());
    }

    #[test]
    fn test_correct_with_ideal_tables() {
        let model = ready_model(&[(1000.0, StandardSet::ideal()), (30_000.0, StandardSet::ideal())]);
        let z0 = Ohms::Z0_50;

        let sample = SamplePoint::new(14_000.0, 73.0, -12.5);
        let corrected = model.correct(&sample, z0).unwrap();
        assert!((corrected.r_ohm - 73.0).abs() < 1e-9);
        assert!((corrected.x_ohm + 12.5).abs() < 1e-9);
        assert_eq!(corrected.frequency_khz, 14_000.0);

        // outside the calibrated span
        assert!(model.correct(&SamplePoint::new(40_000.0, 50.0, 0.0), z0).is_none());

        // not ready
        assert!(CalibrationModel::new().correct(&sample, z0).is_none());
    }

    #[test]
    fn test_record_from_samples() {
        let mut model = CalibrationModel::new();
        model.begin();
        let samples = vec![
            SamplePoint::new(1000.0, 150.0, 0.0),
            SamplePoint::new(2000.0, 150.0, 0.0),
        ];
        model
            .record_standard_from_samples(StandardKind::Load, &samples, Ohms::Z0_50)
            .unwrap();
        let g = model.standard(StandardKind::Load).unwrap().at(Hertz::from_khz(1500.0)).unwrap();
        assert!((g - c(0.5, 0.0)).norm() < 1e-12);
    }
}
