//! # lib-formats
//!
//! Sweep file interchange for the antenna-analyzer engine.
//!
//! This crate reads and writes one-port sweeps as lists of
//! [`SamplePoint`]s:
//! - `.s1p` files (Touchstone, S or Z parameters), parsed with `nom`
//! - `.csv` and `.nwl` delimited text
//! - `.antdata` packed binary records
//! - `.asd` JSON documents
//!
//! The engine never parses files itself; callers load samples here and feed
//! them through the normal ingestion API.

pub mod antdata;
pub mod asd;
pub mod delimited;
pub mod error;
pub mod touchstone;

pub use error::{FormatError, FormatResult};
pub use touchstone::{parse_touchstone, write_touchstone, TouchstoneFile, TouchstoneKind};

use lib_types::{Ohms, SamplePoint};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// File types recognised by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Touchstone,
    Csv,
    Nwl,
    AntData,
    Asd,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> FormatResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "s1p" => Ok(Self::Touchstone),
            "csv" => Ok(Self::Csv),
            "nwl" => Ok(Self::Nwl),
            "antdata" => Ok(Self::AntData),
            "asd" => Ok(Self::Asd),
            _ => Err(FormatError::UnsupportedExtension(path.display().to_string())),
        }
    }
}

/// Export choices for formats that need them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaveOptions {
    pub touchstone: TouchstoneKind,
    /// Reference impedance written into Touchstone files.
    pub z0: Ohms,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            touchstone: TouchstoneKind::default(),
            z0: Ohms::Z0_50,
        }
    }
}

/// Read a sweep file. Returns the display name (file name) and its samples.
pub fn load_samples(path: &Path) -> FormatResult<(String, Vec<SamplePoint>)> {
    let format = FileFormat::from_path(path)?;
    let samples = match format {
        FileFormat::AntData => antdata::parse_antdata(&std::fs::read(path)?)?,
        FileFormat::Touchstone => parse_touchstone(&std::fs::read_to_string(path)?)?.samples,
        FileFormat::Csv => delimited::CSV.parse(&std::fs::read_to_string(path)?),
        FileFormat::Nwl => delimited::NWL.parse(&std::fs::read_to_string(path)?),
        FileFormat::Asd => asd::parse_asd(&std::fs::read_to_string(path)?)?,
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::info!(file = %name, ?format, points = samples.len(), "sweep loaded");
    Ok((name, samples))
}

/// Write a sweep file in the format implied by its extension.
pub fn save_samples(path: &Path, samples: &[SamplePoint], options: &SaveOptions) -> FormatResult<()> {
    let format = FileFormat::from_path(path)?;
    let out = BufWriter::new(File::create(path)?);
    match format {
        FileFormat::Touchstone => write_touchstone(out, samples, options.touchstone, options.z0)?,
        FileFormat::Csv => delimited::CSV.write(out, samples)?,
        FileFormat::Nwl => delimited::NWL.write(out, samples)?,
        FileFormat::AntData => antdata::write_antdata(out, samples)?,
        FileFormat::Asd => asd::write_asd(out, samples)?,
    }
    tracing::info!(path = %path.display(), ?format, points = samples.len(), "sweep saved");
    Ok(())
}
