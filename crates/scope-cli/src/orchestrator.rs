//! Command orchestration.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use lib_dsp::TdrResponse;
use lib_formats::{load_samples, save_samples, SaveOptions};
use lib_measure::{CalibrationModel, DerivedSeries, MeasurementSet, StandardKind};
use lib_types::{frequency_span, FarEndMode, Ohms, SamplePoint, Series, SeriesPoint, UnitSystem};
use serde::Serialize;
use std::path::Path;

/// Orchestrator owning one measurement engine.
pub struct Orchestrator {
    config: AppConfig,
    set: MeasurementSet,
}

impl Orchestrator {
    /// Create an orchestrator, selecting the analyzer model and installing
    /// the calibration when configured.
    pub fn new(config: AppConfig) -> Result<Self> {
        config
            .engine
            .validate()
            .context("Invalid engine settings")?;

        let mut set = MeasurementSet::new(config.engine.clone());

        if let Some(model) = &config.model {
            set.select_model(model)
                .with_context(|| format!("Failed to select analyzer model {}", model))?;
        }

        if let Some(files) = &config.calibration {
            let mut calibration = CalibrationModel::new();
            calibration.begin();
            for ((label, path), kind) in files.iter().zip(StandardKind::ALL) {
                let (_, samples) = load_samples(path)
                    .with_context(|| format!("Failed to load {} standard {:?}", label, path))?;
                calibration
                    .record_standard_from_samples(kind, &samples, config.engine.z0)
                    .with_context(|| format!("Invalid {} standard", label))?;
            }
            calibration.finish().context("Incomplete calibration")?;
            tracing::info!("Calibration loaded");
            set.install_calibration(calibration);
        }

        Ok(Self { config, set })
    }

    /// Load a sweep file as a new trace.
    fn load(&mut self, path: &Path) -> Result<usize> {
        let (name, samples) =
            load_samples(path).with_context(|| format!("Failed to read sweep file {:?}", path))?;
        if samples.is_empty() {
            anyhow::bail!("No samples in {:?}", path);
        }
        Ok(self.set.load_trace(name, &samples))
    }

    /// Summarise a sweep file.
    pub fn inspect(&mut self, path: &Path) -> Result<InspectReport> {
        let index = self.load(path)?;
        let trace = self
            .set
            .trace(index)
            .context("Trace retired before inspection")?;

        let (start, stop) = frequency_span(trace.samples()).context("Empty trace")?;
        let model = self.set.model();
        let in_range = model.map(|m| m.covers(start.as_khz(), stop.as_khz()));
        let series = self
            .set
            .active_series(index)
            .context("Trace retired before inspection")?;

        Ok(InspectReport {
            name: trace.name().to_string(),
            points: trace.len(),
            start_khz: start.as_khz(),
            stop_khz: stop.as_khz(),
            z0: trace.z0().0,
            best_swr: series.swr.min_by_value(),
            model: model.map(|m| m.name.clone()),
            in_range,
        })
    }

    /// Derived series of a sweep file, seen through the feedline when
    /// far-end mode is on.
    pub fn analyze(&mut self, path: &Path) -> Result<AnalysisReport> {
        let index = self.load(path)?;
        let calibrated = self.set.use_calibration();
        let far_end = self.config.engine.cable.mode;

        let far = self
            .set
            .far_end_view(index)
            .map(|view| (view.samples.clone(), view.series.clone()));
        let (samples, series) = match far {
            Some(pair) => pair,
            None => {
                let samples = self
                    .set
                    .active_samples(index)
                    .context("Trace retired before analysis")?
                    .to_vec();
                let series = self
                    .set
                    .active_series(index)
                    .context("Trace retired before analysis")?
                    .clone();
                (samples, series)
            }
        };

        let name = self
            .set
            .trace(index)
            .map(|t| t.name().to_string())
            .unwrap_or_default();

        tracing::info!(trace = %name, calibrated, ?far_end, "Analysis complete");
        Ok(AnalysisReport {
            name,
            z0: self.config.engine.z0.0,
            calibrated,
            far_end,
            best_swr: series.swr.min_by_value(),
            samples,
            series,
        })
    }

    /// Time-domain reflectometry of a sweep file.
    pub fn tdr(&mut self, path: &Path) -> Result<TdrReport> {
        let index = self.load(path)?;
        let units = self.config.engine.unit_system;
        let strategy = self.config.engine.tdr.mode;
        let z0 = self
            .set
            .trace(index)
            .map(|t| t.z0())
            .unwrap_or(self.config.engine.z0);
        let name = self
            .set
            .trace(index)
            .map(|t| t.name().to_string())
            .unwrap_or_default();

        let response = self.set.tdr_view(index).with_context(|| {
            format!(
                "TDR needs at least {} points starting at DC (<= 0.1 kHz)",
                self.config.engine.tdr.min_samples
            )
        })?;

        tracing::info!(trace = %name, fft_size = response.fft_size, "TDR complete");
        Ok(TdrReport::new(name, format!("{:?}", strategy).to_lowercase(), units, z0, response))
    }
}

/// Convert a sweep file between formats. Returns the number of points.
pub fn convert(input: &Path, output: &Path, options: &SaveOptions) -> Result<usize> {
    let (_, samples) =
        load_samples(input).with_context(|| format!("Failed to read sweep file {:?}", input))?;
    save_samples(output, &samples, options)
        .with_context(|| format!("Failed to write {:?}", output))?;
    Ok(samples.len())
}

/// Summary of one sweep.
#[derive(Clone, Debug, Serialize)]
pub struct InspectReport {
    pub name: String,
    pub points: usize,
    pub start_khz: f64,
    pub stop_khz: f64,
    pub z0: f64,
    /// Lowest SWR and its frequency in kHz.
    pub best_swr: Option<SeriesPoint>,
    pub model: Option<String>,
    /// Whether the sweep lies inside the selected model's range.
    pub in_range: Option<bool>,
}

/// Derived series of one sweep.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub name: String,
    pub z0: f64,
    pub calibrated: bool,
    pub far_end: FarEndMode,
    pub best_swr: Option<SeriesPoint>,
    pub samples: Vec<SamplePoint>,
    pub series: DerivedSeries,
}

/// TDR result with distance-keyed series.
#[derive(Clone, Debug, Serialize)]
pub struct TdrReport {
    pub name: String,
    pub strategy: String,
    pub units: UnitSystem,
    pub fft_size: usize,
    pub resolution_m: f64,
    pub range: f64,
    pub distance_step: f64,
    pub impulse: Series,
    pub step: Series,
    /// Largest impulse magnitude: distance and signed value.
    pub peak: Option<SeriesPoint>,
    /// Impedance at the peak, from the step response.
    pub peak_impedance: Option<f64>,
}

impl TdrReport {
    fn new(name: String, strategy: String, units: UnitSystem, z0: Ohms, response: &TdrResponse) -> Self {
        let impulse = response.impulse_series(units);
        let peak_index = response
            .impulse
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i);

        Self {
            name,
            strategy,
            units,
            fft_size: response.fft_size,
            resolution_m: response.resolution_m,
            range: response.range(units),
            distance_step: response.distance_step(units),
            peak: peak_index.and_then(|i| impulse.points.get(i).copied()),
            peak_impedance: peak_index.and_then(|i| response.impedance_at(i, z0)),
            step: response.step_series(units),
            impulse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationFiles;
    use lib_formats::TouchstoneKind;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("antscope-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_sweep(path: &Path, n: usize, r: f64, x: f64) {
        let samples: Vec<SamplePoint> = (0..n)
            .map(|i| SamplePoint::new(30_000.0 * i as f64 / (n - 1) as f64, r, x))
            .collect();
        save_samples(path, &samples, &SaveOptions::default()).unwrap();
    }

    #[test]
    fn test_inspect_reports_span_and_range() {
        let dir = temp_dir("inspect");
        let path = dir.join("dipole.asd");
        write_sweep(&path, 11, 150.0, 0.0);

        let config = AppConfig {
            model: Some("AA-54".into()),
            ..AppConfig::default()
        };
        let mut orch = Orchestrator::new(config).unwrap();
        let report = orch.inspect(&path).unwrap();

        assert_eq!(report.name, "dipole.asd");
        assert_eq!(report.points, 11);
        assert_eq!(report.stop_khz, 30_000.0);
        assert!((report.best_swr.unwrap().value - 3.0).abs() < 1e-9);
        // starts at 0 kHz, below the AA-54 minimum
        assert_eq!(report.in_range, Some(false));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_analyze_with_far_end() {
        let dir = temp_dir("analyze");
        let path = dir.join("load.csv");
        write_sweep(&path, 5, 50.0, 0.0);

        let mut config = AppConfig::default();
        config.engine.cable.length = 4.0;
        config.engine.cable.mode = FarEndMode::Subtract;
        let mut orch = Orchestrator::new(config).unwrap();
        let report = orch.analyze(&path).unwrap();

        assert_eq!(report.far_end, FarEndMode::Subtract);
        assert_eq!(report.samples.len(), 5);
        // matched lossless line: the far end still sees 50 Ω
        for s in &report.samples {
            assert!((s.r_ohm - 50.0).abs() < 1e-6);
            assert!(s.x_ohm.abs() < 1e-6);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_calibrated_analysis() {
        let dir = temp_dir("calibrated");
        let open = dir.join("open.s1p");
        let short = dir.join("short.s1p");
        let load = dir.join("load.s1p");
        write_sweep(&open, 5, 1.0e9, 0.0);
        write_sweep(&short, 5, 0.0, 0.0);
        write_sweep(&load, 5, 50.0, 0.0);
        let dut = dir.join("dut.nwl");
        write_sweep(&dut, 5, 75.0, 10.0);

        let config = AppConfig {
            calibration: Some(CalibrationFiles { open, short, load }),
            ..AppConfig::default()
        };
        let mut orch = Orchestrator::new(config).unwrap();
        let report = orch.analyze(&dut).unwrap();
        assert!(report.calibrated);
        assert_eq!(report.series.swr.len(), 5);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_tdr_report() {
        let dir = temp_dir("tdr");
        let path = dir.join("line.antdata");
        write_sweep(&path, 256, 150.0, 0.0);

        let mut orch = Orchestrator::new(AppConfig::default()).unwrap();
        let report = orch.tdr(&path).unwrap();
        assert_eq!(report.fft_size, 4096);
        assert_eq!(report.impulse.len(), 4096);
        assert!(report.range > 0.0);
        assert!(report.peak.unwrap().value > 0.4);

        let short = dir.join("short.antdata");
        write_sweep(&short, 20, 150.0, 0.0);
        assert!(orch.tdr(&short).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_convert() {
        let dir = temp_dir("convert");
        let input = dir.join("in.csv");
        let output = dir.join("out.s1p");
        write_sweep(&input, 4, 60.0, -5.0);

        let options = SaveOptions {
            touchstone: TouchstoneKind::SMa,
            z0: Ohms::Z0_50,
        };
        assert_eq!(convert(&input, &output, &options).unwrap(), 4);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("# MHz S MA R 50"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
