//! Feedline de-embedding.
//!
//! A length of lossy line with characteristic impedance `Zo` and
//! propagation constant `γ = α + jβ` transforms a load `ZL` into
//!
//! ```text
//! Zin = Zo (ZL cosh γl + Zo sinh γl) / (Zo cosh γl + ZL sinh γl)
//! ```
//!
//! [`FarEndMode::Add`] applies this to a measured load. [`FarEndMode::Subtract`]
//! applies it with `-γl`, which walks a measurement taken at the near end
//! back to the far end of the cable.

use lib_types::{CableParameters, FarEndMode, SamplePoint, FEET_PER_METER, SPEED_OF_LIGHT};
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;

/// 20 / ln(10): dB per neper.
const DB_PER_NEPER: f64 = 8.68588963806504;

/// Floor applied to the transformed resistance.
const MIN_RESISTANCE: f64 = 0.0001;

/// Matched-line loss in dB per 100 ft at `f_mhz`.
pub fn matched_loss_db(cable: &CableParameters, f_mhz: f64) -> f64 {
    let k = cable.loss_units.to_db_per_100ft();
    if cable.flat_loss {
        cable.k1 * k + cable.k2 * k
    } else {
        cable.k1 * k * f_mhz.sqrt() + cable.k2 * k * f_mhz
    }
}

/// Attenuation (Np/ft) and phase constant (rad/ft) at `frequency_khz`.
pub fn propagation(cable: &CableParameters, frequency_khz: f64) -> (f64, f64) {
    let f_mhz = frequency_khz / 1000.0;
    let alpha = matched_loss_db(cable, f_mhz) / 100.0 / DB_PER_NEPER;
    let beta =
        (2.0 * PI * f_mhz) / (SPEED_OF_LIGHT * FEET_PER_METER / 1e6 * cable.velocity_factor);
    (alpha, beta)
}

/// Characteristic impedance of the lossy line. The reactive part is
/// `-Rc·α/β`, taken as 0 at DC.
pub fn characteristic_impedance(cable: &CableParameters, alpha: f64, beta: f64) -> Complex64 {
    let rc = cable.resistance.0;
    let xc = if beta == 0.0 { 0.0 } else { -rc * (alpha / beta) };
    Complex64::new(rc, xc)
}

/// Impedance seen through a line of electrical length `gamma_l`.
pub fn transform_impedance(zl: Complex64, zo: Complex64, gamma_l: Complex64) -> Complex64 {
    let sinh = gamma_l.sinh();
    let cosh = gamma_l.cosh();
    zo * ((zl * cosh + zo * sinh) / (zo * cosh + zl * sinh))
}

/// Far-end view of one sample. Mode `None` returns the sample unchanged.
pub fn deembed(sample: &SamplePoint, cable: &CableParameters) -> SamplePoint {
    let sign = match cable.mode {
        FarEndMode::None => return *sample,
        FarEndMode::Add => 1.0,
        FarEndMode::Subtract => -1.0,
    };

    let (alpha, beta) = propagation(cable, sample.frequency_khz);
    let length_ft = cable.length_feet();
    let gamma_l = Complex64::new(sign * alpha * length_ft, sign * beta * length_ft);
    let zo = characteristic_impedance(cable, alpha, beta);

    let zin = transform_impedance(sample.impedance(), zo, gamma_l);
    let r = if zin.re < MIN_RESISTANCE {
        MIN_RESISTANCE
    } else {
        zin.re
    };
    SamplePoint::new(sample.frequency_khz, r, zin.im)
}

/// Far-end view of a whole sweep, order preserved.
pub fn deembed_samples(samples: &[SamplePoint], cable: &CableParameters) -> Vec<SamplePoint> {
    if cable.mode == FarEndMode::None {
        return samples.to_vec();
    }
    samples.par_iter().map(|s| deembed(s, cable)).collect()
}
