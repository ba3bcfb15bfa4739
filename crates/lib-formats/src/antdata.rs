//! Packed binary `.antdata` sweeps.
//!
//! ```text
//! offset 0   i16  point count (little-endian)
//! offset 2   4 bytes padding
//! offset 6   count records of RECORD_STRIDE bytes:
//!            +0  i32 frequency in Hz
//!            +8  f64 R
//!            +16 f64 X
//! ```

use crate::error::{FormatError, FormatResult};
use lib_types::SamplePoint;
use std::io::Write;

const HEADER_LEN: usize = 6;

/// 14 × 4-byte words per record.
pub const RECORD_STRIDE: usize = 56;

const FREQ_OFFSET: usize = 0;
const R_OFFSET: usize = 8;
const X_OFFSET: usize = 16;

fn read_i16(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    i32::from_le_bytes(buf)
}

fn read_f64(bytes: &[u8], at: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    f64::from_le_bytes(buf)
}

/// Decode an `.antdata` image.
pub fn parse_antdata(bytes: &[u8]) -> FormatResult<Vec<SamplePoint>> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::invalid_format(
            "antdata",
            format!("file too short for header: {} bytes", bytes.len()),
        ));
    }
    let count = read_i16(bytes, 0);
    if count < 0 {
        return Err(FormatError::invalid_value("point count", count.to_string()));
    }
    let count = count as usize;
    let needed = HEADER_LEN + count * RECORD_STRIDE;
    if bytes.len() < needed {
        return Err(FormatError::invalid_format(
            "antdata",
            format!("{} points need {} bytes, got {}", count, needed, bytes.len()),
        ));
    }

    let samples = bytes[HEADER_LEN..needed]
        .chunks_exact(RECORD_STRIDE)
        .map(|rec| {
            let hz = read_i32(rec, FREQ_OFFSET);
            SamplePoint::new(hz as f64 / 1e3, read_f64(rec, R_OFFSET), read_f64(rec, X_OFFSET))
        })
        .collect();
    Ok(samples)
}

/// Encode samples as an `.antdata` image. Frequencies are rounded to whole Hz.
pub fn write_antdata<W: Write>(mut out: W, samples: &[SamplePoint]) -> FormatResult<()> {
    let count = i16::try_from(samples.len()).map_err(|_| {
        FormatError::invalid_value(
            "point count",
            format!("{} exceeds the format limit of {}", samples.len(), i16::MAX),
        )
    })?;

    out.write_all(&count.to_le_bytes())?;
    out.write_all(&[0u8; HEADER_LEN - 2])?;

    let mut record = [0u8; RECORD_STRIDE];
    for s in samples {
        let hz = (s.frequency_khz * 1e3).round();
        if !(hz >= i32::MIN as f64 && hz <= i32::MAX as f64) {
            return Err(FormatError::invalid_value(
                "frequency",
                format!("{} kHz does not fit the record", s.frequency_khz),
            ));
        }
        record.fill(0);
        record[FREQ_OFFSET..FREQ_OFFSET + 4].copy_from_slice(&(hz as i32).to_le_bytes());
        record[R_OFFSET..R_OFFSET + 8].copy_from_slice(&s.r_ohm.to_le_bytes());
        record[X_OFFSET..X_OFFSET + 8].copy_from_slice(&s.x_ohm.to_le_bytes());
        out.write_all(&record)?;
    }
    out.flush()?;
    Ok(())
}
