//! Delimited text sweeps: `.csv` and `.nwl`.
//!
//! Both carry one header line followed by `frequency_khz R X` rows. Rows
//! without exactly three fields are skipped.

use crate::error::FormatResult;
use lib_types::SamplePoint;
use std::io::Write;
use tracing::{debug, warn};

/// Header and field separator of a delimited layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextLayout {
    pub name: &'static str,
    pub header: &'static str,
    pub separator: Separator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Whitespace,
}

impl Separator {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Self::Comma => line.split(',').collect(),
            Self::Whitespace => line.split_whitespace().collect(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Comma => ",",
            Self::Whitespace => " ",
        }
    }
}

pub const CSV: TextLayout = TextLayout {
    name: "csv",
    header: "Frequency;R;X",
    separator: Separator::Comma,
};

pub const NWL: TextLayout = TextLayout {
    name: "nwl",
    header: "/\"Freq(kHz)\" \"Rs\" \"Xs\"/",
    separator: Separator::Whitespace,
};

impl TextLayout {
    /// Read samples; the first line is always treated as a header.
    pub fn parse(&self, content: &str) -> Vec<SamplePoint> {
        let mut samples = Vec::new();
        for (i, line) in content.split('\n').enumerate().skip(1) {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let fields = self.separator.split(line);
            if fields.len() != 3 {
                debug!(format = self.name, line = i + 1, fields = fields.len(), "row skipped");
                continue;
            }
            let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.trim().parse::<f64>()).collect();
            match parsed {
                Ok(v) => samples.push(SamplePoint::new(v[0], v[1], v[2])),
                Err(e) => warn!(format = self.name, line = i + 1, error = %e, "unreadable row skipped"),
            }
        }
        samples
    }

    /// Write samples with R and X rounded to two decimals.
    pub fn write<W: Write>(&self, mut out: W, samples: &[SamplePoint]) -> FormatResult<()> {
        let sep = self.separator.as_str();
        write!(out, "{}\r\n", self.header)?;
        for s in samples {
            write!(
                out,
                "{}{}{:.2}{}{:.2}\r\n",
                s.frequency_khz, sep, s.r_ohm, sep, s.x_ohm
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_import_skips_header_and_bad_rows() {
        let text = "Frequency;R;X\r\n1000,50.5,-3.25\r\n1100,51\r\nabc,1,2\r\n1200,52,4\r\n";
        let samples = CSV.parse(text);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], SamplePoint::new(1000.0, 50.5, -3.25));
        assert_eq!(samples[1], SamplePoint::new(1200.0, 52.0, 4.0));
    }

    #[test]
    fn test_csv_export_layout() {
        let mut buf = Vec::new();
        CSV.write(&mut buf, &[SamplePoint::new(1500.0, 49.987, 0.004)]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Frequency;R;X\r\n1500,49.99,0.00\r\n");
    }

    #[test]
    fn test_nwl_roundtrip() {
        let samples = vec![
            SamplePoint::new(7000.0, 35.25, 12.5),
            SamplePoint::new(7100.0, 36.0, -1.75),
        ];
        let mut buf = Vec::new();
        NWL.write(&mut buf, &samples).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("/\"Freq(kHz)\" \"Rs\" \"Xs\"/\r\n7000 35.25 12.50\r\n"));
        assert_eq!(NWL.parse(&text), samples);
    }
}
