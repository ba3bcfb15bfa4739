//! A single measurement trace and its derived series.
//!
//! Samples are append-only. Every append extends the raw series and, when a
//! calibration is active, the calibrated ones. The `version` counter goes up
//! on every mutation so views computed from the trace can tell when they
//! are stale.

use crate::calibration::CalibrationModel;
use crate::derived::SampleDerived;
use lib_types::{Ohms, SamplePoint, Series, SmithPoint};
use serde::Serialize;
use tracing::debug;

/// Series derived from a list of samples, keyed by frequency in kHz.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DerivedSeries {
    pub swr: Series,
    pub return_loss: Series,
    pub phase: Series,
    pub rho: Series,
    pub r: Series,
    pub x: Series,
    pub z: Series,
    pub rp: Series,
    pub xp: Series,
    pub zp: Series,
    pub smith: Vec<SmithPoint>,
}

impl DerivedSeries {
    /// Series for a whole list of samples.
    pub fn from_samples(z0: Ohms, samples: &[SamplePoint]) -> Self {
        let mut series = Self::default();
        for (i, s) in samples.iter().enumerate() {
            series.push(z0, i + 1, s);
        }
        series
    }

    /// Extend every series by one sample. `ordinal` is the 1-based sample
    /// position, used as the Smith-chart key.
    pub fn push(&mut self, z0: Ohms, ordinal: usize, sample: &SamplePoint) {
        let key = sample.frequency_khz;
        let d = SampleDerived::compute(z0, sample);

        // No SWR result: repeat the previous point, or leave a gap at the start
        match d.swr {
            Some(swr) => {
                self.swr.push(key, swr.vswr);
                let rl = swr
                    .return_loss_db
                    .or_else(|| self.return_loss.last().map(|p| p.value));
                if let Some(rl) = rl {
                    self.return_loss.push(key, rl);
                }
            }
            None => {
                if let Some(prev) = self.swr.last().copied() {
                    self.swr.push(key, prev.value);
                }
                if let Some(prev) = self.return_loss.last().copied() {
                    self.return_loss.push(key, prev.value);
                }
            }
        }

        self.r.push(key, sample.r_ohm);
        self.x.push(key, sample.x_ohm);
        self.z.push(key, d.z);
        if let Some(p) = d.parallel {
            self.rp.push(key, p.r);
            self.xp.push(key, p.x);
            self.zp.push(key, p.z);
        }
        self.phase.push(key, d.reflection.phase_deg);
        self.rho.push(key, d.reflection.magnitude);
        self.smith.push(SmithPoint {
            index: ordinal,
            x: d.smith.0,
            y: d.smith.1,
        });
    }
}

/// One measurement: raw samples, optional calibrated samples, and their
/// derived series.
#[derive(Clone, Debug, Serialize)]
pub struct Trace {
    name: String,
    z0: Ohms,
    version: u64,
    samples: Vec<SamplePoint>,
    raw: DerivedSeries,
    calibrated_samples: Option<Vec<SamplePoint>>,
    calibrated: Option<DerivedSeries>,
}

impl Trace {
    pub fn new(name: impl Into<String>, z0: Ohms) -> Self {
        Self {
            name: name.into(),
            z0,
            version: 0,
            samples: Vec::new(),
            raw: DerivedSeries::default(),
            calibrated_samples: None,
            calibrated: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference impedance captured when the trace was created.
    pub fn z0(&self) -> Ohms {
        self.z0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[SamplePoint] {
        &self.samples
    }

    pub fn raw_series(&self) -> &DerivedSeries {
        &self.raw
    }

    pub fn calibrated_samples(&self) -> Option<&[SamplePoint]> {
        self.calibrated_samples.as_deref()
    }

    pub fn calibrated_series(&self) -> Option<&DerivedSeries> {
        self.calibrated.as_ref()
    }

    /// Samples to process further: calibrated when requested and present.
    pub fn active_samples(&self, use_calibration: bool) -> &[SamplePoint] {
        match (use_calibration, self.calibrated_samples.as_deref()) {
            (true, Some(cal)) => cal,
            _ => &self.samples,
        }
    }

    pub fn active_series(&self, use_calibration: bool) -> &DerivedSeries {
        match (use_calibration, self.calibrated.as_ref()) {
            (true, Some(cal)) => cal,
            _ => &self.raw,
        }
    }

    fn corrected(&self, sample: &SamplePoint, calibration: &CalibrationModel) -> SamplePoint {
        calibration.correct(sample, self.z0).unwrap_or_else(|| {
            debug!(
                frequency_khz = sample.frequency_khz,
                "calibration unavailable, using raw sample"
            );
            *sample
        })
    }

    /// Append one reading.
    pub fn append(&mut self, sample: SamplePoint, calibration: Option<&CalibrationModel>) {
        let ordinal = self.samples.len() + 1;
        self.samples.push(sample);
        self.raw.push(self.z0, ordinal, &sample);

        match calibration.filter(|c| c.is_ready()) {
            // Calibration appeared mid-trace
            Some(cal) if self.calibrated_samples.is_none() => self.rebuild_calibrated(cal),
            Some(cal) => {
                let corrected = self.corrected(&sample, cal);
                if let Some(list) = self.calibrated_samples.as_mut() {
                    list.push(corrected);
                }
                if let Some(series) = self.calibrated.as_mut() {
                    series.push(self.z0, ordinal, &corrected);
                }
            }
            None => {
                self.calibrated_samples = None;
                self.calibrated = None;
            }
        }
        self.version += 1;
    }

    /// Append several readings.
    pub fn extend(&mut self, samples: &[SamplePoint], calibration: Option<&CalibrationModel>) {
        for s in samples {
            self.append(*s, calibration);
        }
    }

    fn rebuild_calibrated(&mut self, calibration: &CalibrationModel) {
        let samples: Vec<SamplePoint> = self
            .samples
            .iter()
            .map(|s| self.corrected(s, calibration))
            .collect();
        self.calibrated = Some(DerivedSeries::from_samples(self.z0, &samples));
        self.calibrated_samples = Some(samples);
    }

    /// Recompute the calibrated variant from scratch.
    pub fn recalibrate(&mut self, calibration: Option<&CalibrationModel>) {
        match calibration.filter(|c| c.is_ready()) {
            Some(cal) => self.rebuild_calibrated(cal),
            None => {
                self.calibrated_samples = None;
                self.calibrated = None;
            }
        }
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{StandardKind, StandardSet};
    use lib_types::Hertz;

    fn ideal_calibration() -> CalibrationModel {
        let mut model = CalibrationModel::new();
        model.begin();
        let ideal = StandardSet::ideal();
        for (kind, v) in [
            (StandardKind::Open, ideal.open),
            (StandardKind::Short, ideal.short),
            (StandardKind::Load, ideal.load),
        ] {
            model
                .record_standard(kind, vec![(Hertz::from_khz(1000.0), v), (Hertz::from_khz(2000.0), v)])
                .unwrap();
        }
        model.finish().unwrap();
        model
    }

    #[test]
    fn test_append_builds_series() {
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.append(SamplePoint::new(1000.0, 150.0, 0.0), None);
        t.append(SamplePoint::new(1100.0, 75.0, 25.0), None);

        assert_eq!(t.len(), 2);
        assert_eq!(t.version(), 2);
        let s = t.raw_series();
        assert!((s.swr.points[0].value - 3.0).abs() < 1e-12);
        assert_eq!(s.swr.points[1].key, 1100.0);
        assert_eq!(s.smith.len(), 2);
        assert_eq!(s.smith[1].index, 2);
        assert!(t.calibrated_series().is_none());
    }

    #[test]
    fn test_matched_sample_repeats_return_loss() {
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.append(SamplePoint::new(1000.0, 50.0, 0.0), None);
        // first sample matched: SWR point, no RL point yet
        assert_eq!(t.raw_series().swr.len(), 1);
        assert_eq!(t.raw_series().return_loss.len(), 0);

        t.append(SamplePoint::new(1100.0, 150.0, 0.0), None);
        t.append(SamplePoint::new(1200.0, 50.0, 0.0), None);
        let rl = &t.raw_series().return_loss;
        assert_eq!(rl.len(), 2);
        assert_eq!(rl.points[1].value, rl.points[0].value);
        assert_eq!(rl.points[1].key, 1200.0);
    }

    #[test]
    fn test_pure_resistance_skips_parallel_points() {
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.append(SamplePoint::new(1000.0, 80.0, 0.0), None);
        t.append(SamplePoint::new(1100.0, 80.0, 5.0), None);
        assert_eq!(t.raw_series().r.len(), 2);
        assert_eq!(t.raw_series().rp.len(), 1);
    }

    #[test]
    fn test_calibrated_variant() {
        let cal = ideal_calibration();
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.append(SamplePoint::new(1500.0, 30.0, 10.0), Some(&cal));
        // outside the calibrated span: raw sample is carried over
        t.append(SamplePoint::new(2500.0, 40.0, 10.0), Some(&cal));

        let cal_samples = t.calibrated_samples().unwrap();
        assert_eq!(cal_samples.len(), 2);
        assert!((cal_samples[0].r_ohm - 30.0).abs() < 1e-9);
        assert_eq!(cal_samples[1], SamplePoint::new(2500.0, 40.0, 10.0));
        assert_eq!(t.calibrated_series().unwrap().swr.len(), 2);
        assert_eq!(t.active_samples(false)[0], SamplePoint::new(1500.0, 30.0, 10.0));
    }

    #[test]
    fn test_recalibrate_bumps_version() {
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.extend(
            &[SamplePoint::new(1200.0, 60.0, 0.0), SamplePoint::new(1300.0, 60.0, 1.0)],
            None,
        );
        let before = t.version();
        t.recalibrate(Some(&ideal_calibration()));
        assert!(t.version() > before);
        assert_eq!(t.calibrated_samples().unwrap().len(), 2);

        t.recalibrate(None);
        assert!(t.calibrated_samples().is_none());
    }

    #[test]
    fn test_calibration_appearing_mid_trace() {
        let cal = ideal_calibration();
        let mut t = Trace::new("sweep", Ohms::Z0_50);
        t.append(SamplePoint::new(1200.0, 60.0, 0.0), None);
        t.append(SamplePoint::new(1300.0, 70.0, 5.0), Some(&cal));

        // one append, one version step
        assert_eq!(t.version(), 2);
        let cal_samples = t.calibrated_samples().unwrap();
        assert_eq!(cal_samples.len(), 2);
        assert!((cal_samples[1].r_ohm - 70.0).abs() < 1e-9);
        assert_eq!(t.calibrated_series().unwrap().swr.len(), 2);
    }
}
