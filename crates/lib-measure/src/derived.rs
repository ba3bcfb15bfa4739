//! Per-sample engineering quantities.
//!
//! Everything here is a pure function of the reference impedance and one
//! (R, X) reading. Stored series keep the true values; clamping to a plot
//! axis is done on a copy with [`clamp_for_view`].

use lib_types::{Ohms, SamplePoint, Series, SeriesPoint};
use serde::{Deserialize, Serialize};

/// Radius of the Smith chart in plot coordinates.
pub const SMITH_RADIUS: f64 = 6.0;

/// VSWR reported for (near) total reflection.
pub const MAX_SWR: f64 = 200.0;

/// Reflection magnitude above which VSWR saturates.
const SATURATION_GAMMA: f64 = 0.99;

/// Resistance substituted for non-positive readings in the SWR formula.
const SWR_MIN_RESISTANCE: f64 = 0.001;

/// Standing-wave ratio and return loss of one reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Swr {
    /// VSWR in [1, 200].
    pub vswr: f64,

    /// Return loss in dB; `None` for a perfect match.
    pub return_loss_db: Option<f64>,
}

/// VSWR and return loss of `R + jX` against `z0`.
///
/// Returns `None` when the reflection coefficient cannot be formed or is
/// exactly 1; the caller keeps the previous value.
pub fn compute_swr(z0: Ohms, r: f64, x: f64) -> Option<Swr> {
    let r = if r <= 0.0 { SWR_MIN_RESISTANCE } else { r };
    let z0 = z0.0;
    let xx = x * x;
    let denominator = (r + z0) * (r + z0) + xx;
    if denominator == 0.0 {
        return None;
    }

    let gamma = (((r - z0) * (r - z0) + xx) / denominator).sqrt();
    if gamma == 1.0 || gamma.is_nan() {
        return None;
    }

    let mut vswr = (1.0 + gamma) / (1.0 - gamma);
    if vswr > MAX_SWR || gamma > SATURATION_GAMMA {
        vswr = MAX_SWR;
    } else if vswr < 1.0 {
        vswr = 1.0;
    }

    let return_loss_db = if gamma == 0.0 {
        None
    } else {
        Some(-20.0 * gamma.log10())
    };

    Some(Swr {
        vswr,
        return_loss_db,
    })
}

/// Return loss alone.
pub fn return_loss_db(z0: Ohms, r: f64, x: f64) -> Option<f64> {
    compute_swr(z0, r, x)?.return_loss_db
}

/// Impedance magnitude |Z|.
#[inline]
pub fn compute_z(r: f64, x: f64) -> f64 {
    (r * r + x * x).sqrt()
}

/// Parallel-equivalent circuit of a series reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParallelEquivalent {
    pub r: f64,
    pub x: f64,
    pub z: f64,
}

/// Parallel R and X of the (sanitized) series reading.
///
/// A purely resistive reading has no finite parallel reactance; that case
/// yields `None`.
pub fn parallel_equivalent(r: f64, x: f64) -> Option<ParallelEquivalent> {
    let s = SamplePoint::new(0.0, r, x).sanitized();
    let (r, x) = (s.r_ohm, s.x_ohm);
    if x == 0.0 {
        return None;
    }
    Some(ParallelEquivalent {
        r: r * (1.0 + x * x / r / r),
        x: x * (1.0 + r * r / x / x),
        z: compute_z(r, x),
    })
}

/// Complex reflection coefficient in rectangular and polar form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub re: f64,
    pub im: f64,
    pub magnitude: f64,
    pub phase_deg: f64,
}

/// Reflection coefficient of the sanitized reading against `z0`.
pub fn reflection(z0: Ohms, r: f64, x: f64) -> Reflection {
    let s = SamplePoint::new(0.0, r, x).sanitized();
    let rn = s.r_ohm / z0.0;
    let xn = s.x_ohm / z0.0;
    let denom = (rn + 1.0) * (rn + 1.0) + xn * xn;
    let re = ((rn - 1.0) * (rn + 1.0) + xn * xn) / denom;
    let im = 2.0 * xn / denom;
    Reflection {
        re,
        im,
        magnitude: (re * re + im * im).sqrt(),
        phase_deg: im.atan2(re).to_degrees(),
    }
}

/// Smith-chart coordinates of the sanitized reading.
pub fn smith_point(z0: Ohms, r: f64, x: f64) -> (f64, f64) {
    let rho = reflection(z0, r, x);
    (rho.re * SMITH_RADIUS, rho.im * SMITH_RADIUS)
}

/// Everything derived from one sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleDerived {
    pub swr: Option<Swr>,
    pub z: f64,
    pub parallel: Option<ParallelEquivalent>,
    pub reflection: Reflection,
    pub smith: (f64, f64),
}

impl SampleDerived {
    pub fn compute(z0: Ohms, sample: &SamplePoint) -> Self {
        let (r, x) = (sample.r_ohm, sample.x_ohm);
        let reflection = reflection(z0, r, x);
        Self {
            swr: compute_swr(z0, r, x),
            z: compute_z(r, x),
            parallel: parallel_equivalent(r, x),
            reflection,
            smith: (reflection.re * SMITH_RADIUS, reflection.im * SMITH_RADIUS),
        }
    }
}

/// Copy of `series` with values clamped to `[-limit, limit]`.
pub fn clamp_for_view(series: &Series, limit: f64) -> Series {
    series
        .iter()
        .map(|p| SeriesPoint::new(p.key, p.value.clamp(-limit, limit)))
        .collect()
}
