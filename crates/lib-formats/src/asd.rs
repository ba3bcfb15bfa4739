//! `.asd` JSON sweeps: the native save format.

use crate::error::FormatResult;
use lib_types::SamplePoint;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AsdDocument {
    #[serde(default)]
    dots_number: usize,
    #[serde(default)]
    measurements: Vec<AsdPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AsdPoint {
    fq: f64,
    r: f64,
    x: f64,
}

pub fn parse_asd(content: &str) -> FormatResult<Vec<SamplePoint>> {
    let doc: AsdDocument = serde_json::from_str(content)?;
    if doc.dots_number != doc.measurements.len() {
        tracing::warn!(
            declared = doc.dots_number,
            found = doc.measurements.len(),
            "DotsNumber does not match the measurement list"
        );
    }
    Ok(doc
        .measurements
        .into_iter()
        .map(|p| SamplePoint::new(p.fq, p.r, p.x))
        .collect())
}

pub fn write_asd<W: Write>(mut out: W, samples: &[SamplePoint]) -> FormatResult<()> {
    let doc = AsdDocument {
        dots_number: samples.len(),
        measurements: samples
            .iter()
            .map(|s| AsdPoint {
                fq: s.frequency_khz,
                r: s.r_ohm,
                x: s.x_ohm,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut out, &doc)?;
    out.flush()?;
    Ok(())
}
