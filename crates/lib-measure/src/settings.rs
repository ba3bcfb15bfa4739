//! Engine configuration.

use crate::error::{MeasureError, MeasureResult};
use lib_dsp::{TdrMode, TdrParams};
use lib_types::{CableParameters, Ohms, UnitSystem};
use serde::{Deserialize, Serialize};

/// TDR tunables as stored in configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TdrSettings {
    #[serde(default)]
    pub mode: TdrMode,

    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    #[serde(default = "default_oversampling")]
    pub oversampling: usize,

    #[serde(default = "default_max_fft_size")]
    pub max_fft_size: usize,

    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
}

fn default_min_samples() -> usize {
    200
}

fn default_oversampling() -> usize {
    8
}

fn default_max_fft_size() -> usize {
    131_072
}

fn default_noise_floor() -> f64 {
    0.015
}

impl Default for TdrSettings {
    fn default() -> Self {
        Self {
            mode: TdrMode::default(),
            min_samples: default_min_samples(),
            oversampling: default_oversampling(),
            max_fft_size: default_max_fft_size(),
            noise_floor: default_noise_floor(),
        }
    }
}

impl TdrSettings {
    /// Transform parameters for a line of the given velocity factor measured
    /// against `z0`.
    pub fn params(&self, velocity_factor: f64, z0: Ohms) -> TdrParams {
        TdrParams {
            velocity_factor,
            z0,
            min_samples: self.min_samples,
            oversampling: self.oversampling,
            max_fft_size: self.max_fft_size,
            noise_floor: self.noise_floor,
        }
    }
}

/// Measurement engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reference impedance snapshotted into each new trace.
    #[serde(default = "default_z0")]
    pub z0: Ohms,

    /// Number of traces kept before the oldest is retired.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Samples beyond this count are dropped.
    #[serde(default = "default_max_points")]
    pub max_points_per_trace: usize,

    #[serde(default = "default_true")]
    pub calibration_enabled: bool,

    #[serde(default)]
    pub unit_system: UnitSystem,

    #[serde(default)]
    pub cable: CableParameters,

    #[serde(default)]
    pub tdr: TdrSettings,
}

fn default_z0() -> Ohms {
    Ohms::Z0_50
}

fn default_history_limit() -> usize {
    5
}

fn default_max_points() -> usize {
    65_536
}

fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            z0: default_z0(),
            history_limit: default_history_limit(),
            max_points_per_trace: default_max_points(),
            calibration_enabled: true,
            unit_system: UnitSystem::default(),
            cable: CableParameters::default(),
            tdr: TdrSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Check value ranges.
    pub fn validate(&self) -> MeasureResult<()> {
        if !(self.z0.0 > 0.0) {
            return Err(MeasureError::InvalidSetting(format!(
                "z0 must be positive, got {}",
                self.z0.0
            )));
        }
        if self.history_limit == 0 {
            return Err(MeasureError::InvalidSetting(
                "history_limit must be at least 1".to_string(),
            ));
        }
        let vf = self.cable.velocity_factor;
        if !(vf > 0.0 && vf <= 1.0) {
            return Err(MeasureError::InvalidSetting(format!(
                "velocity factor must be in (0, 1], got {}",
                vf
            )));
        }
        if !self.tdr.max_fft_size.is_power_of_two() {
            return Err(MeasureError::InvalidSetting(format!(
                "tdr.max_fft_size must be a power of two, got {}",
                self.tdr.max_fft_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let s = EngineSettings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.history_limit, 5);
        assert_eq!(s.tdr.max_fft_size, 131_072);
        assert_eq!(s.tdr.mode, TdrMode::Mirrored);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: EngineSettings =
            serde_json::from_str(r#"{ "z0": 75.0, "tdr": { "mode": "legacy" } }"#).unwrap();
        assert_eq!(s.z0, Ohms(75.0));
        assert_eq!(s.tdr.mode, TdrMode::Legacy);
        assert_eq!(s.tdr.oversampling, 8);
        assert_eq!(s.history_limit, 5);
        assert_eq!(s.cable.velocity_factor, 0.66);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut s = EngineSettings::default();
        s.cable.velocity_factor = 1.2;
        assert!(s.validate().is_err());

        let mut s = EngineSettings::default();
        s.history_limit = 0;
        assert!(s.validate().is_err());

        let mut s = EngineSettings::default();
        s.z0 = Ohms(0.0);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_tdr_params() {
        let p = TdrSettings::default().params(0.8, Ohms::Z0_75);
        assert_eq!(p.velocity_factor, 0.8);
        assert_eq!(p.z0, Ohms(75.0));
        assert_eq!(p.min_samples, 200);
    }
}
