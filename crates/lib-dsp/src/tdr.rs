//! Time-domain reflectometry from a one-port frequency sweep.
//!
//! The sweep's reflection coefficients are treated as the positive half of a
//! spectrum, windowed, mirrored into a Hermitian spectrum and inverse
//! transformed. The real part is the impulse response of the line; its
//! running sum is the step response.
//!
//! Two strategies are available:
//!
//! - [`MirroredIfft`]: 8x oversampled transform against a fixed 50 Ω device
//!   reference, with a noise floor on the impulse. This is the default.
//! - [`Radix2Legacy`]: the older radix-2 transform against the trace's own
//!   reference impedance, with extrapolated DC bin and no noise floor.

use crate::error::{DspError, DspResult};
use crate::fft::{mirror_hermitian, next_pow2_at_least, FftEngine};
use crate::window::WindowType;
use lib_types::{
    impedance_to_gamma, Meters, Ohms, SamplePoint, Seconds, Series, UnitSystem, SPEED_OF_LIGHT,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Reference impedance of the analyzer bridge used by the mirrored strategy.
pub const DEVICE_REFERENCE: Ohms = Ohms(50.0);

/// Highest first-sweep frequency (kHz) still treated as DC.
pub const MAX_START_KHZ: f64 = 0.1;

/// Largest exponent tried when sizing the mirrored transform.
const MAX_BASE_EXPONENT: u32 = 14;

const LEGACY_MIN_SAMPLES: usize = 501;
const LEGACY_MAX_SAMPLES: usize = 16_384;
const LEGACY_MIN_RADIX: usize = 16;

/// Tunables shared by both strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TdrParams {
    /// Velocity factor of the line under test.
    pub velocity_factor: f64,

    /// Reference impedance of the trace (used by the legacy strategy).
    pub z0: Ohms,

    /// Minimum number of sweep points.
    pub min_samples: usize,

    /// Oversampling factor applied to the base transform size.
    pub oversampling: usize,

    /// Ceiling on the transform size.
    pub max_fft_size: usize,

    /// Impulse amplitudes at or below this magnitude are zeroed.
    pub noise_floor: f64,
}

impl Default for TdrParams {
    fn default() -> Self {
        Self {
            velocity_factor: 0.66,
            z0: Ohms::Z0_50,
            min_samples: 200,
            oversampling: 8,
            max_fft_size: 131_072,
            noise_floor: 0.015,
        }
    }
}

/// Result of a TDR transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TdrResponse {
    /// Number of time-domain bins.
    pub fft_size: usize,

    /// Distance represented by one resolution cell, in meters.
    pub resolution_m: f64,

    /// Unambiguous range, in meters.
    pub range_m: f64,

    /// Impulse response, `fft_size` values.
    pub impulse: Vec<f64>,

    /// Step response (running sum of the impulse), `fft_size` values.
    pub step: Vec<f64>,
}

impl TdrResponse {
    /// Distance between consecutive bins.
    pub fn distance_step(&self, units: UnitSystem) -> f64 {
        if self.fft_size == 0 {
            return 0.0;
        }
        Meters(self.range_m / self.fft_size as f64).in_units(units)
    }

    pub fn range(&self, units: UnitSystem) -> f64 {
        Meters(self.range_m).in_units(units)
    }

    /// Impulse response keyed by distance.
    pub fn impulse_series(&self, units: UnitSystem) -> Series {
        Series::from_uniform(self.distance_step(units), &self.impulse)
    }

    /// Step response keyed by distance.
    pub fn step_series(&self, units: UnitSystem) -> Series {
        Series::from_uniform(self.distance_step(units), &self.step)
    }

    /// Impedance seen at bin `index`, from the step response:
    /// `Z = Z0 (1 + s) / (1 - s)`, floored at 0.
    pub fn impedance_at(&self, index: usize, z0: Ohms) -> Option<f64> {
        let s = *self.step.get(index)?;
        let z = z0.0 * (1.0 + s) / (1.0 - s);
        Some(if z < 0.0 { 0.0 } else { z })
    }
}

/// Time for a pulse to reach `distance` and come back.
pub fn round_trip_time(distance: Meters, velocity_factor: f64) -> Seconds {
    Seconds(2.0 * distance.0 / (SPEED_OF_LIGHT * velocity_factor))
}

/// A frequency-to-time transform.
pub trait TdrStrategy: Send + Sync {
    /// Short identifier, for logs and reports.
    fn name(&self) -> &'static str;

    fn transform(&self, samples: &[SamplePoint], params: &TdrParams) -> DspResult<TdrResponse>;
}

/// Strategy selector, as stored in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TdrMode {
    #[default]
    Mirrored,
    Legacy,
}

impl TdrMode {
    pub fn strategy(&self) -> Box<dyn TdrStrategy> {
        match self {
            Self::Mirrored => Box::new(MirroredIfft),
            Self::Legacy => Box::new(Radix2Legacy),
        }
    }
}

/// Wrap a phase value to the range [-π, π].
#[inline]
fn wrap_phase(mut phase: f64) -> f64 {
    let tau = 2.0 * PI;
    phase %= tau;
    if phase > PI {
        phase -= tau;
    } else if phase < -PI {
        phase += tau;
    }
    phase
}

fn sweep_span_hz(samples: &[SamplePoint]) -> DspResult<f64> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(DspError::InsufficientData { needed: 2, got: 0 }),
    };
    let span = last.frequency().0 - first.frequency().0;
    if span <= 0.0 {
        return Err(DspError::InvalidFrequencyAxis(format!(
            "sweep span must be positive, got {} Hz",
            span
        )));
    }
    Ok(span)
}

/// Oversampled, mirrored inverse transform.
#[derive(Clone, Copy, Debug, Default)]
pub struct MirroredIfft;

impl MirroredIfft {
    /// Transform size for `n` samples: smallest `2^i` (i <= 14) whose half
    /// covers `n - 1` bins, times the oversampling factor.
    pub fn fft_size(n: usize, params: &TdrParams) -> DspResult<usize> {
        let bins = n.saturating_sub(1);
        let base = (0..=MAX_BASE_EXPONENT)
            .map(|i| 1usize << i)
            .find(|size| size / 2 >= bins)
            .ok_or_else(|| DspError::FftTooLarge {
                size: bins.next_power_of_two() * 2 * params.oversampling,
                max: params.max_fft_size,
            })?;

        let size = base * params.oversampling.max(1);
        if size > params.max_fft_size {
            return Err(DspError::FftTooLarge {
                size,
                max: params.max_fft_size,
            });
        }
        Ok(size)
    }
}

impl TdrStrategy for MirroredIfft {
    fn name(&self) -> &'static str {
        "mirrored"
    }

    fn transform(&self, samples: &[SamplePoint], params: &TdrParams) -> DspResult<TdrResponse> {
        let n = samples.len();
        let needed = params.min_samples.max(2);
        if n < needed {
            return Err(DspError::InsufficientData { needed, got: n });
        }
        let start_khz = samples[0].frequency_khz;
        if start_khz > MAX_START_KHZ {
            return Err(DspError::NonZeroStart(start_khz));
        }

        let fft_size = Self::fft_size(n, params)?;
        let span_hz = sweep_span_hz(samples)?;
        let half = fft_size / 2;

        let window = WindowType::HalfHamming {
            span: (n - 1) as f64,
        };
        let bin_scale = fft_size as f64 / n as f64 / 2.0;
        let gain = bin_scale / window.coherent_gain();

        let mut spectrum = vec![Complex64::new(0.0, 0.0); fft_size];
        for (i, sample) in samples.iter().enumerate().take(half + 1) {
            // DC bin sees a matched far end
            let gamma = if i == 0 {
                Complex64::new(0.0, 0.0)
            } else {
                impedance_to_gamma(DEVICE_REFERENCE, sample.r_ohm, sample.x_ohm)
            };
            spectrum[i] = gamma * (gain * window.at(i));
        }

        let dc = spectrum[1].norm();
        spectrum[0] = Complex64::new(if spectrum[1].re < 0.0 { -dc } else { dc }, 0.0);

        mirror_hermitian(&mut spectrum);
        FftEngine::new().ifft_inplace(&mut spectrum)?;

        let step_gain = 1.0 / 2.0 / bin_scale;
        let mut impulse = Vec::with_capacity(fft_size);
        let mut step = Vec::with_capacity(fft_size);
        let mut acc = 0.0;
        for bin in &spectrum {
            let amp = bin.re;
            if amp.abs() > params.noise_floor {
                impulse.push(amp);
                acc += amp * step_gain;
            } else {
                impulse.push(0.0);
            }
            step.push(acc);
        }

        let resolution_m = SPEED_OF_LIGHT * params.velocity_factor / (4.0 * span_hz)
            * (n - 1) as f64
            / half as f64;
        let range_m = resolution_m * fft_size as f64;

        debug!(
            strategy = self.name(),
            samples = n,
            fft_size,
            resolution_m,
            range_m,
            "TDR transform complete"
        );

        Ok(TdrResponse {
            fft_size,
            resolution_m,
            range_m,
            impulse,
            step,
        })
    }
}

/// Radix-2 transform with extrapolated DC bin.
#[derive(Clone, Copy, Debug, Default)]
pub struct Radix2Legacy;

impl Radix2Legacy {
    /// Sign of the extrapolated DC bin from the phases of bins 1 and 2.
    fn dc_sign(b1: Complex64, b2: Complex64) -> f64 {
        // atan2(re, im): angle measured from the imaginary axis
        let p1 = b1.re.atan2(b1.im);
        let p2 = b2.re.atan2(b2.im);
        let delta = wrap_phase(p2 - p1);
        let dc_phase = wrap_phase(p1 - delta);
        if dc_phase < -PI / 2.0 || dc_phase > PI / 2.0 {
            -1.0
        } else {
            1.0
        }
    }
}

impl TdrStrategy for Radix2Legacy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn transform(&self, samples: &[SamplePoint], params: &TdrParams) -> DspResult<TdrResponse> {
        let n = samples.len();
        if n < LEGACY_MIN_SAMPLES {
            return Err(DspError::InsufficientData {
                needed: LEGACY_MIN_SAMPLES,
                got: n,
            });
        }
        if n > LEGACY_MAX_SAMPLES {
            return Err(DspError::TooManySamples {
                max: LEGACY_MAX_SAMPLES,
                got: n,
            });
        }

        let radix = next_pow2_at_least(n, LEGACY_MIN_RADIX);
        let fft_size = radix * 2;
        if fft_size > params.max_fft_size {
            return Err(DspError::FftTooLarge {
                size: fft_size,
                max: params.max_fft_size,
            });
        }
        let span_hz = sweep_span_hz(samples)?;

        let window = WindowType::HalfHamming { span: n as f64 };
        let mut spectrum = vec![Complex64::new(0.0, 0.0); fft_size];
        for (i, sample) in samples.iter().enumerate().skip(1) {
            let gamma = impedance_to_gamma(params.z0, sample.r_ohm, sample.x_ohm);
            spectrum[i] = gamma * window.at(i);
        }

        let b1 = spectrum[1];
        let b2 = spectrum[2];
        let dc = 2.0 * b1.norm() - b2.norm();
        spectrum[0] = Complex64::new(dc * Self::dc_sign(b1, b2), 0.0);

        mirror_hermitian(&mut spectrum);
        FftEngine::new().ifft_inplace(&mut spectrum)?;

        let impulse: Vec<f64> = spectrum.iter().map(|c| c.re).collect();
        let step: Vec<f64> = impulse
            .iter()
            .scan(0.0, |acc, &a| {
                *acc += a;
                Some(*acc)
            })
            .collect();

        let start_hz = samples[0].frequency().0;
        let top_hz = span_hz / (n - 1) as f64 * radix as f64;
        let resolution_m =
            SPEED_OF_LIGHT * params.velocity_factor / (2.0 * (top_hz - start_hz));
        let range_m = resolution_m * radix as f64;

        debug!(
            strategy = self.name(),
            samples = n,
            fft_size,
            resolution_m,
            range_m,
            "TDR transform complete"
        );

        Ok(TdrResponse {
            fft_size,
            resolution_m,
            range_m,
            impulse,
            step,
        })
    }
}
