//! Windowing functions for the frequency-to-time transform.
//!
//! A sweep is a one-sided spectrum starting at DC. Truncating it at the top
//! frequency rings badly in the time domain, so both TDR strategies taper
//! the spectrum with the descending half of a Hamming window:
//!
//! ```text
//! w(i) = a0 - a1 * cos(pi + pi * i / span)
//! ```
//!
//! `w(0)` is (almost) 1 and `w(span)` is `a0 - a1`.

use std::f64::consts::PI;

/// Hamming constant term used by the analyzer firmware.
pub const HAMMING_A0: f64 = 0.53836;

/// Hamming cosine term used by the analyzer firmware.
pub const HAMMING_A1: f64 = 0.46146;

/// Window function types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowType {
    /// Descending half-Hamming reaching its floor after `span` bins.
    HalfHamming { span: f64 },
}

impl WindowType {
    /// Window value at bin `index`.
    #[inline]
    pub fn at(&self, index: usize) -> f64 {
        match *self {
            Self::HalfHamming { span } => {
                if span <= 0.0 {
                    return 1.0;
                }
                HAMMING_A0 - HAMMING_A1 * (PI + PI * index as f64 / span).cos()
            }
        }
    }

    /// DC gain of the window, used to renormalise the windowed spectrum.
    pub fn coherent_gain(&self) -> f64 {
        match self {
            Self::HalfHamming { .. } => HAMMING_A0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_hamming_endpoints() {
        let w = WindowType::HalfHamming { span: 255.0 };
        assert!((w.at(0) - (HAMMING_A0 + HAMMING_A1)).abs() < 1e-12);
        assert!((w.at(255) - (HAMMING_A0 - HAMMING_A1)).abs() < 1e-12);
    }

    #[test]
    fn test_half_hamming_is_monotonic() {
        let w = WindowType::HalfHamming { span: 100.0 };
        let window: Vec<f64> = (0..=100).map(|i| w.at(i)).collect();
        for pair in window.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-15);
        }
    }

    #[test]
    fn test_degenerate_span() {
        let w = WindowType::HalfHamming { span: 0.0 };
        assert_eq!(w.at(3), 1.0);
    }
}
