//! Raw analyzer readings.
//!
//! A [`SamplePoint`] is one (frequency, R, X) triple as reported by the
//! instrument. Readings at the sweep extremes are occasionally NaN or carry
//! a negative resistance; [`SamplePoint::sanitized`] maps them onto safe
//! values before any formula divides by R or X.

use crate::units::{Hertz, Ohms};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Resistance below which a reading is treated as unusable.
pub const MIN_RESISTANCE: f64 = 0.001;

/// Resistance substituted for NaN or unusable readings.
pub const FALLBACK_RESISTANCE: f64 = 0.01;

/// One analyzer reading.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Frequency in kHz (>= 0).
    pub frequency_khz: f64,

    /// Series resistance in ohms.
    pub r_ohm: f64,

    /// Series reactance in ohms.
    pub x_ohm: f64,
}

impl SamplePoint {
    pub fn new(frequency_khz: f64, r_ohm: f64, x_ohm: f64) -> Self {
        Self {
            frequency_khz,
            r_ohm,
            x_ohm,
        }
    }

    #[inline]
    pub fn frequency(&self) -> Hertz {
        Hertz::from_khz(self.frequency_khz)
    }

    /// Impedance as a complex number (R + jX).
    #[inline]
    pub fn impedance(&self) -> Complex64 {
        Complex64::new(self.r_ohm, self.x_ohm)
    }

    /// Copy with NaN / sub-floor resistance replaced by 0.01 Ω and NaN
    /// reactance replaced by 0.
    pub fn sanitized(&self) -> Self {
        let r_ohm = if self.r_ohm.is_nan() || self.r_ohm < MIN_RESISTANCE {
            FALLBACK_RESISTANCE
        } else {
            self.r_ohm
        };
        let x_ohm = if self.x_ohm.is_nan() { 0.0 } else { self.x_ohm };
        Self {
            frequency_khz: self.frequency_khz,
            r_ohm,
            x_ohm,
        }
    }

    /// Impedance normalised to a reference impedance.
    #[inline]
    pub fn normalized(&self, z0: Ohms) -> Complex64 {
        self.impedance() / z0.0
    }
}

/// Frequency span covered by an ordered slice of samples.
pub fn frequency_span(samples: &[SamplePoint]) -> Option<(Hertz, Hertz)> {
    let first = samples.first()?;
    let last = samples.last()?;
    Some((first.frequency(), last.frequency()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_replaces_nan_and_floor() {
        let s = SamplePoint::new(1000.0, f64::NAN, f64::NAN).sanitized();
        assert_eq!(s.r_ohm, FALLBACK_RESISTANCE);
        assert_eq!(s.x_ohm, 0.0);

        let s = SamplePoint::new(1000.0, -3.0, 12.0).sanitized();
        assert_eq!(s.r_ohm, FALLBACK_RESISTANCE);
        assert_eq!(s.x_ohm, 12.0);

        // The floor itself is a usable reading
        let s = SamplePoint::new(1000.0, MIN_RESISTANCE, 100.0).sanitized();
        assert_eq!(s.r_ohm, MIN_RESISTANCE);
    }

    #[test]
    fn test_frequency_span() {
        let samples = vec![
            SamplePoint::new(1000.0, 50.0, 0.0),
            SamplePoint::new(30_000.0, 50.0, 0.0),
        ];
        let (lo, hi) = frequency_span(&samples).unwrap();
        assert!((lo.0 - 1e6).abs() < 1e-6);
        assert!((hi.as_mhz() - 30.0).abs() < 1e-12);
        assert!(frequency_span(&[]).is_none());
    }
}
