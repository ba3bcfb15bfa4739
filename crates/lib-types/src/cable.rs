//! Feedline description used for far-end de-embedding.

use crate::units::{Meters, Ohms, UnitSystem, FEET_PER_METER};
use serde::{Deserialize, Serialize};

/// Units the loss coefficients K1 and K2 are quoted in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossUnits {
    #[default]
    DbPer100Ft,
    DbPerFt,
    DbPer100M,
    DbPerM,
}

impl LossUnits {
    /// Factor converting a loss in these units to dB per 100 ft.
    pub fn to_db_per_100ft(&self) -> f64 {
        match self {
            Self::DbPer100Ft => 1.0,
            Self::DbPerFt => 100.0,
            Self::DbPer100M => 1.0 / FEET_PER_METER,
            Self::DbPerM => 100.0 / FEET_PER_METER,
        }
    }
}

/// Direction of the de-embedding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarEndMode {
    /// Far-end view disabled.
    #[default]
    None,
    /// Remove the cable: estimate the load at the far end.
    Subtract,
    /// Add the cable: estimate the input impedance of load plus cable.
    Add,
}

/// Feedline parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CableParameters {
    /// Velocity factor, 0 < vf <= 1.
    #[serde(default = "default_velocity_factor")]
    pub velocity_factor: f64,

    /// Characteristic resistance of the line.
    #[serde(default = "default_resistance")]
    pub resistance: Ohms,

    /// Conductive loss coefficient (scales with sqrt(f)).
    #[serde(default)]
    pub k1: f64,

    /// Dielectric loss coefficient (scales with f).
    #[serde(default)]
    pub k2: f64,

    #[serde(default)]
    pub loss_units: LossUnits,

    /// Loss independent of frequency.
    #[serde(default)]
    pub flat_loss: bool,

    /// Physical length, in `length_units`.
    #[serde(default)]
    pub length: f64,

    #[serde(default)]
    pub length_units: UnitSystem,

    #[serde(default)]
    pub mode: FarEndMode,
}

fn default_velocity_factor() -> f64 {
    0.66
}

fn default_resistance() -> Ohms {
    Ohms::Z0_50
}

impl Default for CableParameters {
    fn default() -> Self {
        Self {
            velocity_factor: default_velocity_factor(),
            resistance: default_resistance(),
            k1: 0.0,
            k2: 0.0,
            loss_units: LossUnits::default(),
            flat_loss: false,
            length: 0.0,
            length_units: UnitSystem::default(),
            mode: FarEndMode::default(),
        }
    }
}

impl CableParameters {
    /// Lossless line of the given length.
    pub fn lossless(length: Meters, velocity_factor: f64, resistance: Ohms) -> Self {
        Self {
            velocity_factor,
            resistance,
            length: length.0,
            length_units: UnitSystem::Metric,
            ..Self::default()
        }
    }

    /// Physical length in feet.
    pub fn length_feet(&self) -> f64 {
        match self.length_units {
            UnitSystem::Metric => self.length * FEET_PER_METER,
            UnitSystem::Imperial => self.length,
        }
    }

    pub fn with_mode(mut self, mode: FarEndMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = CableParameters::default();
        assert_eq!(c.velocity_factor, 0.66);
        assert_eq!(c.resistance, Ohms(50.0));
        assert_eq!(c.mode, FarEndMode::None);
    }

    #[test]
    fn test_loss_unit_scales() {
        assert_eq!(LossUnits::DbPer100Ft.to_db_per_100ft(), 1.0);
        assert_eq!(LossUnits::DbPerFt.to_db_per_100ft(), 100.0);
        assert!((LossUnits::DbPer100M.to_db_per_100ft() - 0.3048).abs() < 1e-4);
        assert!((LossUnits::DbPerM.to_db_per_100ft() - 30.48).abs() < 1e-2);
    }

    #[test]
    fn test_length_feet() {
        let mut c = CableParameters::lossless(Meters(10.0), 0.66, Ohms::Z0_50);
        assert!((c.length_feet() - 32.8084).abs() < 1e-9);
        c.length_units = UnitSystem::Imperial;
        assert_eq!(c.length_feet(), 10.0);
    }
}
