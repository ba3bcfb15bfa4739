//! Impedance / reflection-coefficient conversions and one-port data formats.
//!
//! A one-port is described either by its impedance Z = R + jX or by its
//! reflection coefficient Γ against a reference impedance Z0:
//!
//! ```text
//! Γ = (Z - Z0) / (Z + Z0)        Z = Z0 (1 + Γ) / (1 - Γ)
//! ```
//!
//! Both directions are written out component-wise so the results match the
//! instrument firmware bit for bit.

use crate::units::Ohms;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Reflection coefficient of `R + jX` against `z0`.
///
/// `Γre = (R² - Z0² + X²) / ((R + Z0)² + X²)`, `Γim = 2·Z0·X / ((R + Z0)² + X²)`.
#[inline]
pub fn impedance_to_gamma(z0: Ohms, r: f64, x: f64) -> Complex64 {
    let z0 = z0.0;
    let denom = (r + z0) * (r + z0) + x * x;
    Complex64::new((r * r - z0 * z0 + x * x) / denom, (2.0 * z0 * x) / denom)
}

/// Impedance `(R, X)` corresponding to a reflection coefficient against `z0`.
///
/// `R = Z0·(1 - |Γ|²) / ((1 - Γre)² + Γim²)`, `X = Z0·2·Γim / ((1 - Γre)² + Γim²)`.
#[inline]
pub fn gamma_to_impedance(z0: Ohms, gamma: Complex64) -> (f64, f64) {
    let denom = (1.0 - gamma.re) * (1.0 - gamma.re) + gamma.im * gamma.im;
    let r = (1.0 - gamma.re * gamma.re - gamma.im * gamma.im) / denom;
    let x = (2.0 * gamma.im) / denom;
    (r * z0.0, x * z0.0)
}

/// Kind of network parameter stored in a one-port file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Scattering parameter (S11 = Γ).
    S,
    /// Impedance parameter, normalised to the file's reference impedance.
    Z,
}

/// Numeric data format of a complex value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    /// Real/Imaginary
    RI,
    /// Magnitude/Angle (degrees)
    MA,
    /// dB/Angle (degrees)
    DB,
}

impl DataFormat {
    /// Convert a value pair in this format to a complex number.
    pub fn to_complex(&self, val1: f64, val2: f64) -> Complex64 {
        match self {
            Self::RI => Complex64::new(val1, val2),
            Self::MA => {
                let angle_rad = val2.to_radians();
                Complex64::new(val1 * angle_rad.cos(), val1 * angle_rad.sin())
            }
            Self::DB => {
                let magnitude = 10.0_f64.powf(val1 / 20.0);
                let angle_rad = val2.to_radians();
                Complex64::from_polar(magnitude, angle_rad)
            }
        }
    }

    /// Convert a complex number to a value pair in this format.
    pub fn from_complex(&self, value: Complex64) -> (f64, f64) {
        match self {
            Self::RI => (value.re, value.im),
            Self::MA => (value.norm(), value.im.atan2(value.re).to_degrees()),
            Self::DB => (20.0 * value.norm().log10(), value.im.atan2(value.re).to_degrees()),
        }
    }
}
