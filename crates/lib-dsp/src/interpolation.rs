//! Linear interpolation of complex values over a frequency axis.
//!
//! Real and imaginary parts are interpolated independently. Queries outside
//! the tabulated domain yield `None`; there is no extrapolation.

use crate::error::{DspError, DspResult};
use lib_types::units::Hertz;
use num_complex::Complex64;

/// Check that `freqs` is non-empty and strictly increasing.
pub fn validate_axis(freqs: &[Hertz]) -> DspResult<()> {
    if freqs.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    if let Some(i) = freqs.windows(2).position(|w| !(w[1].0 > w[0].0)) {
        return Err(DspError::InvalidFrequencyAxis(format!(
            "frequency at index {} ({} Hz) does not increase",
            i + 1,
            freqs[i + 1].0
        )));
    }
    Ok(())
}

/// Interpolate a single frequency point.
///
/// `freqs` must already be validated with [`validate_axis`].
pub fn interpolate_at(freqs: &[Hertz], values: &[Complex64], target: Hertz) -> Option<Complex64> {
    let first = freqs.first()?;
    let last = freqs.last()?;
    if values.len() != freqs.len() || target.0 < first.0 || target.0 > last.0 {
        return None;
    }
    if freqs.len() == 1 {
        return values.first().copied();
    }

    // Find bracketing indices
    let mut lower = 0;
    let mut upper = freqs.len() - 1;

    while upper - lower > 1 {
        let mid = (lower + upper) / 2;
        if freqs[mid].0 <= target.0 {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    let f0 = freqs[lower].0;
    let f1 = freqs[upper].0;
    let frac = (target.0 - f0) / (f1 - f0);

    let v0 = values[lower];
    let v1 = values[upper];

    Some(Complex64::new(
        v0.re + frac * (v1.re - v0.re),
        v0.im + frac * (v1.im - v0.im),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let freqs = vec![Hertz(1e6), Hertz(2e6), Hertz(3e6)];
        let values = vec![
            Complex64::new(1.0, -1.0),
            Complex64::new(0.5, 0.0),
            Complex64::new(0.0, 1.0),
        ];

        assert!(validate_axis(&freqs).is_ok());
        let mid = interpolate_at(&freqs, &values, Hertz(1.5e6)).unwrap();
        assert!((mid.re - 0.75).abs() < 1e-12);
        assert!((mid.im + 0.5).abs() < 1e-12);
        assert_eq!(
            interpolate_at(&freqs, &values, Hertz(3e6)),
            Some(Complex64::new(0.0, 1.0))
        );
    }

    #[test]
    fn test_out_of_domain_is_none() {
        let freqs = vec![Hertz(1e6), Hertz(2e6)];
        let values = vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        assert!(interpolate_at(&freqs, &values, Hertz(0.5e6)).is_none());
        assert!(interpolate_at(&freqs, &values, Hertz(2.5e6)).is_none());
    }

    #[test]
    fn test_axis_validation() {
        assert!(validate_axis(&[]).is_err());
        assert!(validate_axis(&[Hertz(1.0), Hertz(1.0)]).is_err());
        assert!(validate_axis(&[Hertz(2.0), Hertz(1.0)]).is_err());
        assert!(validate_axis(&[Hertz(1.0), Hertz(2.0)]).is_ok());
        assert!(matches!(
            validate_axis(&[Hertz(1.0), Hertz(3.0), Hertz(2.0)]),
            Err(DspError::InvalidFrequencyAxis(_))
        ));

        // mismatched lengths never interpolate
        assert!(interpolate_at(&[Hertz(1.0), Hertz(2.0)], &[Complex64::new(1.0, 0.0)], Hertz(1.5)).is_none());
    }
}
