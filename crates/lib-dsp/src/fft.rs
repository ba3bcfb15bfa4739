//! Inverse FFT using rustfft.
//!
//! This module provides a thin wrapper around rustfft with:
//! - Normalised inverse transform (1/N)
//! - Hermitian mirroring of a half spectrum

use crate::error::{DspError, DspResult};
use num_complex::Complex64;
use rustfft::FftPlanner;

/// FFT engine owning a rustfft planner.
pub struct FftEngine {
    complex_planner: FftPlanner<f64>,
}

impl FftEngine {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            complex_planner: FftPlanner::new(),
        }
    }

    /// Perform inverse FFT on complex data in-place.
    pub fn ifft_inplace(&mut self, data: &mut [Complex64]) -> DspResult<()> {
        let len = data.len();
        if !len.is_power_of_two() {
            return Err(DspError::InvalidFftSize(len));
        }

        let fft = self.complex_planner.plan_fft_inverse(len);
        fft.process(data);

        // Normalize
        let scale = 1.0 / len as f64;
        for x in data.iter_mut() {
            *x *= scale;
        }

        Ok(())
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill the negative-frequency half of `spectrum` with the conjugate of the
/// positive half, so the inverse transform is real.
///
/// `spectrum[N - i] = conj(spectrum[i])` for `1 <= i < N/2`; the Nyquist bin
/// `N/2` is cleared.
pub fn mirror_hermitian(spectrum: &mut [Complex64]) {
    let n = spectrum.len();
    if n < 2 {
        return;
    }
    let half = n / 2;
    for i in 1..half {
        spectrum[n - i] = spectrum[i].conj();
    }
    spectrum[half] = Complex64::new(0.0, 0.0);
}

/// Smallest power of two that is `>= len` and `>= floor`.
pub fn next_pow2_at_least(len: usize, floor: usize) -> usize {
    len.max(floor).max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifft_is_normalised() {
        let mut engine = FftEngine::new();

        // DC-only spectrum of height N gives a flat unit signal
        let n = 64;
        let mut data = vec![Complex64::new(0.0, 0.0); n];
        data[0] = Complex64::new(n as f64, 0.0);
        engine.ifft_inplace(&mut data).unwrap();

        for x in &data {
            assert!((x.re - 1.0).abs() < 1e-12);
            assert!(x.im.abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_fft_size() {
        let mut engine = FftEngine::new();
        let mut data: Vec<Complex64> = vec![Complex64::new(1.0, 0.0); 100]; // Not power of 2

        let result = engine.ifft_inplace(&mut data);
        assert!(matches!(result, Err(DspError::InvalidFftSize(100))));
    }

    #[test]
    fn test_mirrored_spectrum_gives_real_output() {
        let mut engine = FftEngine::new();
        let n = 32;
        let mut spectrum = vec![Complex64::new(0.0, 0.0); n];
        for (i, bin) in spectrum.iter_mut().enumerate().take(n / 2).skip(1) {
            *bin = Complex64::new(1.0 / i as f64, 0.3 * i as f64);
        }
        spectrum[0] = Complex64::new(0.5, 0.0);
        mirror_hermitian(&mut spectrum);

        assert_eq!(spectrum[n / 2], Complex64::new(0.0, 0.0));
        assert_eq!(spectrum[n - 3], spectrum[3].conj());

        engine.ifft_inplace(&mut spectrum).unwrap();
        assert!(spectrum.iter().all(|c| c.im.abs() < 1e-12));
    }

    #[test]
    fn test_next_pow2_at_least() {
        assert_eq!(next_pow2_at_least(501, 16), 512);
        assert_eq!(next_pow2_at_least(3, 16), 16);
        assert_eq!(next_pow2_at_least(1024, 16), 1024);
    }
}
