//! The measurement engine: trace history, transport events, configuration
//! and memoised far-end / TDR views.
//!
//! Views are cached per trace together with the `(trace.version,
//! config_version)` pair they were computed from. Any append to the trace
//! or any configuration setter makes the pair stale and the next access
//! recomputes.

use crate::calibration::CalibrationModel;
use crate::error::{MeasureError, MeasureResult};
use crate::far_end::deembed_samples;
use crate::settings::EngineSettings;
use crate::trace::{DerivedSeries, Trace};
use lib_dsp::{TdrMode, TdrResponse, TdrStrategy};
use lib_types::{
    frequency_span, AnalyzerModel, CableParameters, FarEndMode, ModelCatalog, Ohms, SamplePoint,
    UnitSystem,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Version pair a cached view was computed from.
pub type CacheKey = (u64, u64);

/// Trace seen through the configured feedline.
#[derive(Clone, Debug)]
pub struct FarEndView {
    pub mode: FarEndMode,
    pub samples: Vec<SamplePoint>,
    pub series: DerivedSeries,
    pub computed_for: CacheKey,
}

#[derive(Debug)]
struct Cached<T> {
    key: CacheKey,
    value: T,
}

#[derive(Debug)]
struct TraceEntry {
    id: u64,
    trace: Trace,
    far_end: Option<Cached<FarEndView>>,
    tdr: Option<Cached<Option<TdrResponse>>>,
}

impl TraceEntry {
    fn new(id: u64, trace: Trace) -> Self {
        Self {
            id,
            trace,
            far_end: None,
            tdr: None,
        }
    }
}

/// Bounded history of traces plus the engine configuration.
pub struct MeasurementSet {
    settings: EngineSettings,
    catalog: Arc<ModelCatalog>,
    model: Option<AnalyzerModel>,
    calibration: Option<CalibrationModel>,
    strategy: Box<dyn TdrStrategy>,
    entries: VecDeque<TraceEntry>,
    config_version: u64,
    next_id: u64,
    /// Trace receiving streamed samples, if a sweep is open.
    open: Option<u64>,
}

impl MeasurementSet {
    /// Engine with the built-in analyzer catalog.
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_catalog(settings, Arc::new(ModelCatalog::builtin()))
    }

    pub fn with_catalog(settings: EngineSettings, catalog: Arc<ModelCatalog>) -> Self {
        let strategy = settings.tdr.mode.strategy();
        Self {
            settings,
            catalog,
            model: None,
            calibration: None,
            strategy,
            entries: VecDeque::new(),
            config_version: 0,
            next_id: 0,
            open: None,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn config_version(&self) -> u64 {
        self.config_version
    }

    pub fn calibration(&self) -> Option<&CalibrationModel> {
        self.calibration.as_ref()
    }

    pub fn model(&self) -> Option<&AnalyzerModel> {
        self.model.as_ref()
    }

    fn bump_config(&mut self) {
        self.config_version += 1;
    }

    // ------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------

    /// A new sweep begins: open a fresh trace.
    pub fn on_sweep_start(&mut self, name: impl Into<String>) {
        if self.open.is_some() {
            debug!("sweep started while previous sweep still open");
        }
        let trace = Trace::new(name, self.settings.z0);
        debug!(name = trace.name(), z0 = self.settings.z0.0, "sweep started");
        self.open = Some(self.push_trace(trace));
    }

    /// One reading from the transport.
    pub fn on_sample(&mut self, point: SamplePoint) {
        let Some(open) = self.open else {
            warn!(frequency_khz = point.frequency_khz, "sample outside a sweep dropped");
            return;
        };
        let max = self.settings.max_points_per_trace;
        let calibration = self.calibration.as_ref();
        let Some(entry) = self.entries.iter_mut().rev().find(|e| e.id == open) else {
            warn!("sample without an open trace dropped");
            return;
        };
        if entry.trace.len() >= max {
            warn!(
                max_points = max,
                frequency_khz = point.frequency_khz,
                "trace full, sample dropped"
            );
            return;
        }
        entry.trace.append(point, calibration);
    }

    /// The current sweep is complete.
    pub fn on_sweep_end(&mut self) {
        let Some(open) = self.open.take() else {
            debug!("sweep end without an open sweep");
            return;
        };
        if let Some(entry) = self.entries.iter().rev().find(|e| e.id == open) {
            info!(name = entry.trace.name(), points = entry.trace.len(), "sweep complete");
            self.check_range(entry.trace.samples());
        }
    }

    /// Import a complete trace. Returns its history index.
    ///
    /// An open sweep keeps receiving streamed samples unless the import
    /// retires it from the history.
    pub fn load_trace(&mut self, name: impl Into<String>, samples: &[SamplePoint]) -> usize {
        let max = self.settings.max_points_per_trace;
        let kept = if samples.len() > max {
            warn!(
                points = samples.len(),
                max_points = max,
                "imported trace truncated"
            );
            &samples[..max]
        } else {
            samples
        };

        let mut trace = Trace::new(name, self.settings.z0);
        trace.extend(kept, self.calibration.as_ref());
        self.check_range(trace.samples());
        info!(name = trace.name(), points = trace.len(), "trace loaded");
        self.push_trace(trace);
        self.entries.len() - 1
    }

    fn push_trace(&mut self, trace: Trace) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(TraceEntry::new(id, trace));
        while self.entries.len() > self.settings.history_limit.max(1) {
            if let Some(old) = self.entries.pop_front() {
                if self.open == Some(old.id) {
                    warn!(name = old.trace.name(), "open sweep retired, further samples dropped");
                    self.open = None;
                } else {
                    debug!(name = old.trace.name(), "oldest trace retired");
                }
            }
        }
        id
    }

    fn check_range(&self, samples: &[SamplePoint]) {
        let (Some(model), Some((lo, hi))) = (self.model.as_ref(), frequency_span(samples)) else {
            return;
        };
        if !model.covers(lo.as_khz(), hi.as_khz()) {
            warn!(
                model = %model.name,
                start_khz = lo.as_khz(),
                stop_khz = hi.as_khz(),
                "sweep outside the analyzer's frequency range"
            );
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Select the connected analyzer from the catalog.
    pub fn select_model(&mut self, id: &str) -> MeasureResult<&AnalyzerModel> {
        let model = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| MeasureError::InvalidSetting(format!("unknown analyzer model '{}'", id)))?;
        Ok(self.model.insert(model))
    }

    /// Reference impedance for traces created from now on.
    pub fn set_z0(&mut self, z0: Ohms) {
        self.settings.z0 = z0;
        self.bump_config();
    }

    pub fn set_cable(&mut self, cable: CableParameters) {
        self.settings.cable = cable;
        self.bump_config();
    }

    pub fn set_far_end_mode(&mut self, mode: FarEndMode) {
        self.settings.cable.mode = mode;
        self.bump_config();
    }

    pub fn set_calibration_enabled(&mut self, enabled: bool) {
        self.settings.calibration_enabled = enabled;
        if let Some(cal) = self.calibration.as_mut() {
            cal.set_enabled(enabled);
        }
        self.bump_config();
    }

    pub fn set_unit_system(&mut self, units: UnitSystem) {
        self.settings.unit_system = units;
        self.bump_config();
    }

    pub fn set_tdr_mode(&mut self, mode: TdrMode) {
        self.settings.tdr.mode = mode;
        self.strategy = mode.strategy();
        self.bump_config();
    }

    /// Replace the TDR implementation.
    pub fn set_tdr_strategy(&mut self, strategy: Box<dyn TdrStrategy>) {
        debug!(strategy = strategy.name(), "TDR strategy replaced");
        self.strategy = strategy;
        self.bump_config();
    }

    /// Install a calibration and recompute the calibrated variant of every
    /// trace.
    pub fn install_calibration(&mut self, mut calibration: CalibrationModel) {
        calibration.set_enabled(self.settings.calibration_enabled);
        for entry in self.entries.iter_mut() {
            entry.trace.recalibrate(Some(&calibration));
        }
        info!(
            ready = calibration.is_ready(),
            traces = self.entries.len(),
            "calibration installed"
        );
        self.calibration = Some(calibration);
        self.bump_config();
    }

    /// Remove the calibration and drop calibrated variants.
    pub fn clear_calibration(&mut self) {
        self.calibration = None;
        for entry in self.entries.iter_mut() {
            entry.trace.recalibrate(None);
        }
        self.bump_config();
    }

    /// Whether calibrated samples take precedence over raw ones.
    pub fn use_calibration(&self) -> bool {
        self.settings.calibration_enabled
            && self.calibration.as_ref().is_some_and(|c| c.is_active())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Traces, oldest first.
    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.entries.iter().map(|e| &e.trace)
    }

    pub fn trace(&self, index: usize) -> Option<&Trace> {
        self.entries.get(index).map(|e| &e.trace)
    }

    pub fn latest(&self) -> Option<&Trace> {
        self.entries.back().map(|e| &e.trace)
    }

    /// Index of the newest trace.
    pub fn latest_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    /// Derived series to display for a trace.
    pub fn active_series(&self, index: usize) -> Option<&DerivedSeries> {
        let use_cal = self.use_calibration();
        self.trace(index).map(|t| t.active_series(use_cal))
    }

    /// Samples to display for a trace.
    pub fn active_samples(&self, index: usize) -> Option<&[SamplePoint]> {
        let use_cal = self.use_calibration();
        self.trace(index).map(|t| t.active_samples(use_cal))
    }

    fn cache_key(&self, index: usize) -> Option<CacheKey> {
        let entry = self.entries.get(index)?;
        Some((entry.trace.version(), self.config_version))
    }

    /// Far-end view of a trace; `None` when far-end mode is off.
    pub fn far_end_view(&mut self, index: usize) -> Option<&FarEndView> {
        if self.settings.cable.mode == FarEndMode::None {
            return None;
        }
        let key = self.cache_key(index)?;
        let use_cal = self.use_calibration();
        let cable = &self.settings.cable;
        let entry = self.entries.get_mut(index)?;

        let stale = entry.far_end.as_ref().map_or(true, |c| c.key != key);
        if stale {
            debug!(trace = entry.trace.name(), ?key, "recomputing far-end view");
            let samples = deembed_samples(entry.trace.active_samples(use_cal), cable);
            let series = DerivedSeries::from_samples(entry.trace.z0(), &samples);
            entry.far_end = Some(Cached {
                key,
                value: FarEndView {
                    mode: cable.mode,
                    samples,
                    series,
                    computed_for: key,
                },
            });
        }
        entry.far_end.as_ref().map(|c| &c.value)
    }

    /// TDR of a trace (of its far-end view when far-end mode is on).
    /// `None` when the sweep does not meet the transform's preconditions.
    pub fn tdr_view(&mut self, index: usize) -> Option<&TdrResponse> {
        let key = self.cache_key(index)?;
        let fresh = self.entries[index]
            .tdr
            .as_ref()
            .is_some_and(|c| c.key == key);

        if !fresh {
            let far_end = self.settings.cable.mode != FarEndMode::None;
            if far_end {
                self.far_end_view(index);
            }
            let use_cal = self.use_calibration();
            let entry = &self.entries[index];
            let samples = match (&entry.far_end, far_end) {
                (Some(view), true) => view.value.samples.as_slice(),
                _ => entry.trace.active_samples(use_cal),
            };
            let params = self
                .settings
                .tdr
                .params(self.settings.cable.velocity_factor, entry.trace.z0());

            let value = match self.strategy.transform(samples, &params) {
                Ok(resp) => Some(resp),
                Err(e) => {
                    debug!(
                        trace = entry.trace.name(),
                        strategy = self.strategy.name(),
                        error = %e,
                        "TDR skipped"
                    );
                    None
                }
            };
            self.entries[index].tdr = Some(Cached { key, value });
        }

        self.entries[index]
            .tdr
            .as_ref()
            .and_then(|c| c.value.as_ref())
    }
}

impl Default for MeasurementSet {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{StandardKind, StandardSet};
    use lib_dsp::{DspResult, MirroredIfft, TdrParams};
    use lib_types::{Hertz, Meters};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl TdrStrategy for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn transform(&self, samples: &[SamplePoint], params: &TdrParams) -> DspResult<TdrResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MirroredIfft.transform(samples, params)
        }
    }

    /// Records the samples it was asked to transform.
    struct Capturing {
        seen: Arc<Mutex<Vec<SamplePoint>>>,
    }

    impl TdrStrategy for Capturing {
        fn name(&self) -> &'static str {
            "capturing"
        }

        fn transform(&self, samples: &[SamplePoint], params: &TdrParams) -> DspResult<TdrResponse> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = samples.to_vec();
            }
            MirroredIfft.transform(samples, params)
        }
    }

    fn sweep(n: usize) -> Vec<SamplePoint> {
        (0..n)
            .map(|i| SamplePoint::new(30_000.0 * i as f64 / (n - 1) as f64, 75.0, 15.0))
            .collect()
    }

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
                .record_standard(kind, vec![(Hertz(0.0), v), (Hertz::from_mhz(30.0), v)])
                .unwrap();
        }
        model.finish().unwrap();
        model
    }

    #[test]
    fn test_streaming_sweep() {
        let mut set = MeasurementSet::default();
        set.on_sample(SamplePoint::new(1000.0, 50.0, 0.0));
        assert!(set.is_empty());

        set.on_sweep_start("live");
        for s in sweep(10) {
            set.on_sample(s);
        }
        set.on_sweep_end();
        set.on_sample(SamplePoint::new(1000.0, 50.0, 0.0));

        assert_eq!(set.len(), 1);
        let t = set.latest().unwrap();
        assert_eq!(t.name(), "live");
        assert_eq!(t.len(), 10);
        assert_eq!(t.raw_series().swr.len(), 10);
    }

    #[test]
    fn test_import_during_sweep() {
        let mut set = MeasurementSet::default();
        set.on_sweep_start("live");
        set.on_sample(SamplePoint::new(1000.0, 50.0, 0.0));
        let imported = set.load_trace("imported", &[SamplePoint::new(5000.0, 75.0, 0.0)]);
        set.on_sample(SamplePoint::new(1100.0, 50.0, 0.0));
        set.on_sweep_end();

        let live = set.trace(0).unwrap();
        assert_eq!(live.name(), "live");
        let freqs: Vec<f64> = live.samples().iter().map(|s| s.frequency_khz).collect();
        assert_eq!(freqs, vec![1000.0, 1100.0]);

        let bulk = set.trace(imported).unwrap();
        assert_eq!(bulk.name(), "imported");
        assert_eq!(bulk.len(), 1);

        // sweep closed: later samples go nowhere
        set.on_sample(SamplePoint::new(1200.0, 50.0, 0.0));
        assert_eq!(set.trace(0).unwrap().len(), 2);
        assert_eq!(set.trace(imported).unwrap().len(), 1);
    }

    #[test]
    fn test_import_retiring_open_sweep() {
        let settings = EngineSettings {
            history_limit: 1,
            ..EngineSettings::default()
        };
        let mut set = MeasurementSet::new(settings);
        set.on_sweep_start("live");
        set.on_sample(SamplePoint::new(1000.0, 50.0, 0.0));
        set.load_trace("imported", &[SamplePoint::new(5000.0, 75.0, 0.0)]);
        set.on_sample(SamplePoint::new(1100.0, 50.0, 0.0));

        assert_eq!(set.len(), 1);
        let t = set.latest().unwrap();
        assert_eq!(t.name(), "imported");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_history_limit() {
        let mut set = MeasurementSet::default();
        for i in 0..7 {
            set.load_trace(format!("t{}", i), &sweep(4));
        }
        assert_eq!(set.len(), 5);
        assert_eq!(set.trace(0).unwrap().name(), "t2");
        assert_eq!(set.latest().unwrap().name(), "t6");
        assert_eq!(set.latest_index(), Some(4));
    }

    #[test]
    fn test_max_points_cap() {
        let settings = EngineSettings {
            max_points_per_trace: 3,
            ..EngineSettings::default()
        };
        let mut set = MeasurementSet::new(settings);
        set.on_sweep_start("capped");
        for s in sweep(5) {
            set.on_sample(s);
        }
        assert_eq!(set.latest().unwrap().len(), 3);

        let idx = set.load_trace("bulk", &sweep(8));
        assert_eq!(set.trace(idx).unwrap().len(), 3);
    }

    #[test]
    fn test_z0_snapshot() {
        let mut set = MeasurementSet::default();
        set.load_trace("a", &sweep(4));
        set.set_z0(Ohms::Z0_75);
        set.load_trace("b", &sweep(4));
        assert_eq!(set.trace(0).unwrap().z0(), Ohms(50.0));
        assert_eq!(set.trace(1).unwrap().z0(), Ohms(75.0));
    }

    #[test]
    fn test_calibration_selection() {
        let mut set = MeasurementSet::default();
        set.load_trace("a", &sweep(4));
        assert!(set.latest().unwrap().calibrated_series().is_none());

        set.install_calibration(ideal_calibration());
        assert!(set.use_calibration());
        let t = set.latest().unwrap();
        assert!(t.calibrated_series().is_some());
        assert!(std::ptr::eq(
            set.active_series(0).unwrap(),
            t.calibrated_series().unwrap()
        ));

        set.set_calibration_enabled(false);
        assert!(!set.use_calibration());
        let t = set.latest().unwrap();
        assert!(std::ptr::eq(set.active_series(0).unwrap(), t.raw_series()));

        // new traces still get a calibrated variant
        set.load_trace("b", &sweep(4));
        assert!(set.latest().unwrap().calibrated_series().is_some());
    }

    #[test]
    fn test_far_end_view_memoised() {
        let mut set = MeasurementSet::default();
        set.load_trace("a", &sweep(4));
        assert!(set.far_end_view(0).is_none());

        set.set_cable(
            CableParameters::lossless(Meters(3.0), 0.66, Ohms::Z0_50).with_mode(FarEndMode::Subtract),
        );
        let first = set.far_end_view(0).unwrap().computed_for;
        let again = set.far_end_view(0).unwrap().computed_for;
        assert_eq!(first, again);
        assert_eq!(set.far_end_view(0).unwrap().samples.len(), 4);

        set.set_far_end_mode(FarEndMode::Add);
        let after = set.far_end_view(0).unwrap();
        assert_ne!(after.computed_for, first);
        assert_eq!(after.mode, FarEndMode::Add);
    }

    #[test]
    fn test_tdr_view_memoised() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = MeasurementSet::default();
        set.set_tdr_strategy(Box::new(Counting {
            calls: calls.clone(),
        }));

        set.load_trace("long", &sweep(256));
        let resp = set.tdr_view(0).unwrap();
        assert_eq!(resp.fft_size, 4096);
        assert!(set.tdr_view(0).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // too short: no result, and the failure is cached too
        set.load_trace("short", &sweep(10));
        assert!(set.tdr_view(1).is_none());
        assert!(set.tdr_view(1).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        set.set_unit_system(UnitSystem::Imperial);
        assert!(set.tdr_view(0).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_tdr_view_uses_far_end_samples() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut set = MeasurementSet::default();
        set.set_tdr_strategy(Box::new(Capturing { seen: seen.clone() }));
        set.load_trace("long", &sweep(256));

        assert!(set.tdr_view(0).is_some());
        assert_eq!(*seen.lock().unwrap(), sweep(256));

        set.set_cable(
            CableParameters::lossless(Meters(3.0), 0.66, Ohms::Z0_50).with_mode(FarEndMode::Subtract),
        );
        assert!(set.tdr_view(0).is_some());
        let far = set.far_end_view(0).unwrap().samples.clone();
        assert_ne!(far, sweep(256));
        assert_eq!(*seen.lock().unwrap(), far);
    }

    #[test]
    fn test_clear_calibration() {
        let mut set = MeasurementSet::default();
        set.load_trace("a", &sweep(4));
        set.install_calibration(ideal_calibration());
        assert!(set.latest().unwrap().calibrated_series().is_some());
        let version = set.config_version();

        set.clear_calibration();
        assert!(set.calibration().is_none());
        assert!(!set.use_calibration());
        assert!(set.config_version() > version);
        let t = set.latest().unwrap();
        assert!(t.calibrated_series().is_none());
        assert!(std::ptr::eq(set.active_series(0).unwrap(), t.raw_series()));

        set.load_trace("b", &sweep(4));
        assert!(set.latest().unwrap().calibrated_series().is_none());
    }

    #[test]
    fn test_select_model() {
        let mut set = MeasurementSet::default();
        assert_eq!(set.select_model("AA-54").unwrap().max_frequency_khz, 54_000.0);
        assert!(set.select_model("nope").is_err());
        assert_eq!(set.model().unwrap().name, "AA-54");
    }
}
