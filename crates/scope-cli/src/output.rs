//! Result output formatting and writing.

use crate::orchestrator::{AnalysisReport, InspectReport, TdrReport};
use crate::OutputFormat;
use anyhow::Result;
use lib_types::Series;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Render a sweep summary for stdout.
pub fn render_inspect(report: &InspectReport, format: OutputFormat) -> Result<String> {
    let mut s = String::new();
    match format {
        OutputFormat::Text => {
            writeln!(s, "Sweep: {}", report.name)?;
            writeln!(s, "  Points:     {}", report.points)?;
            writeln!(
                s,
                "  Span:       {:.3} - {:.3} MHz",
                report.start_khz / 1e3,
                report.stop_khz / 1e3
            )?;
            writeln!(s, "  Z0:         {} ohms", report.z0)?;
            match &report.best_swr {
                Some(p) => writeln!(s, "  Best SWR:   {:.3} at {:.3} MHz", p.value, p.key / 1e3)?,
                None => writeln!(s, "  Best SWR:   n/a")?,
            }
            if let (Some(model), Some(in_range)) = (&report.model, report.in_range) {
                let verdict = if in_range { "inside" } else { "OUTSIDE" };
                writeln!(s, "  Analyzer:   {} ({} frequency range)", model, verdict)?;
            }
        }
        OutputFormat::Json => {
            writeln!(s, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(s, "metric,value")?;
            writeln!(s, "name,{}", report.name)?;
            writeln!(s, "points,{}", report.points)?;
            writeln!(s, "start_khz,{}", report.start_khz)?;
            writeln!(s, "stop_khz,{}", report.stop_khz)?;
            writeln!(s, "z0,{}", report.z0)?;
            if let Some(p) = &report.best_swr {
                writeln!(s, "best_swr,{}", p.value)?;
                writeln!(s, "best_swr_khz,{}", p.key)?;
            }
            if let Some(in_range) = report.in_range {
                writeln!(s, "in_range,{}", in_range)?;
            }
        }
    }
    Ok(s)
}

fn write_series_rows<W: Write>(out: &mut W, name: &str, series: &Series) -> std::io::Result<()> {
    for p in series.iter() {
        writeln!(out, "{},{},{}", name, p.key, p.value)?;
    }
    Ok(())
}

/// Write derived series into `output_dir`. Returns the written file.
pub fn write_analysis(report: &AnalysisReport, output_dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let d = &report.series;

    let path = match format {
        OutputFormat::Text => {
            let path = output_dir.join("analysis.txt");
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "Analysis: {}", report.name)?;
            writeln!(f, "==========")?;
            writeln!(f, "Z0:          {} ohms", report.z0)?;
            writeln!(f, "Calibrated:  {}", report.calibrated)?;
            writeln!(f, "Far end:     {:?}", report.far_end)?;
            if let Some(p) = &report.best_swr {
                writeln!(f, "Best SWR:    {:.3} at {:.3} MHz", p.value, p.key / 1e3)?;
            }
            writeln!(f)?;
            writeln!(f, "{:>12} {:>10} {:>10}", "freq_khz", "R", "X")?;
            for s in &report.samples {
                writeln!(f, "{:>12.3} {:>10.2} {:>10.2}", s.frequency_khz, s.r_ohm, s.x_ohm)?;
            }
            path
        }
        OutputFormat::Json => {
            let path = output_dir.join("analysis.json");
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "{}", serde_json::to_string_pretty(report)?)?;
            path
        }
        OutputFormat::Csv => {
            let path = output_dir.join("analysis.csv");
            let mut f = std::io::BufWriter::new(std::fs::File::create(&path)?);
            writeln!(f, "series,frequency_khz,value")?;
            for (name, series) in [
                ("swr", &d.swr),
                ("return_loss", &d.return_loss),
                ("phase", &d.phase),
                ("rho", &d.rho),
                ("r", &d.r),
                ("x", &d.x),
                ("z", &d.z),
                ("rp", &d.rp),
                ("xp", &d.xp),
                ("zp", &d.zp),
            ] {
                write_series_rows(&mut f, name, series)?;
            }
            f.flush()?;
            path
        }
    };

    tracing::info!("Wrote analysis to {:?}", path);
    Ok(path)
}

/// Render a TDR summary for stdout.
pub fn render_tdr(report: &TdrReport, format: OutputFormat) -> Result<String> {
    let unit = report.units.length_label();
    let mut s = String::new();
    match format {
        OutputFormat::Text => {
            writeln!(s, "TDR: {} ({})", report.name, report.strategy)?;
            writeln!(s, "  FFT size:    {}", report.fft_size)?;
            writeln!(s, "  Resolution:  {:.3} m", report.resolution_m)?;
            writeln!(s, "  Range:       {:.2} {}", report.range, unit)?;
            writeln!(s, "  Bin spacing: {:.4} {}", report.distance_step, unit)?;
            if let Some(p) = &report.peak {
                writeln!(s, "  Peak:        {:+.4} at {:.3} {}", p.value, p.key, unit)?;
            }
            if let Some(z) = report.peak_impedance {
                writeln!(s, "  Z at peak:   {:.1} ohms", z)?;
            }
        }
        OutputFormat::Json => {
            writeln!(s, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(s, "distance_{},impulse,step", unit)?;
            for (i, p) in report.impulse.iter().enumerate() {
                let step = report.step.points.get(i).map_or(0.0, |q| q.value);
                writeln!(s, "{},{},{}", p.key, p.value, step)?;
            }
        }
    }
    Ok(s)
}

/// Write the TDR report into `output_dir`. Returns the written file.
pub fn write_tdr(report: &TdrReport, output_dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let ext = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
    };
    let path = output_dir.join(format!("tdr.{}", ext));
    std::fs::write(&path, render_tdr(report, format)?)?;
    tracing::info!("Wrote TDR to {:?}", path);
    Ok(path)
}
