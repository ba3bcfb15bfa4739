//! Physical units with type safety.
//!
//! These newtypes keep frequencies, impedances, distances and times from
//! being mixed up as bare `f64`s across crate boundaries.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Number of feet in one meter.
pub const FEET_PER_METER: f64 = 3.28084;

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_ns(ns: f64) -> Self {
        Self(ns * 1e-9)
    }

    #[inline]
    pub fn as_ns(&self) -> f64 {
        self.0 * 1e9
    }
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<f64> for Seconds {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_khz(khz: f64) -> Self {
        Self(khz * 1e3)
    }

    #[inline]
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1e6)
    }

    #[inline]
    pub fn as_khz(&self) -> f64 {
        self.0 * 1e-3
    }

    #[inline]
    pub fn as_mhz(&self) -> f64 {
        self.0 * 1e-6
    }

    /// Angular frequency (omega = 2 * pi * f).
    #[inline]
    pub fn angular(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.0
    }
}

impl Add for Hertz {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Hertz {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Hertz {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Hertz {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

/// Impedance in Ohms.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Ohms(pub f64);

impl Ohms {
    /// Standard 50 ohm reference impedance.
    pub const Z0_50: Self = Self(50.0);

    /// Standard 75 ohm reference impedance.
    pub const Z0_75: Self = Self(75.0);
}

impl Mul<f64> for Ohms {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Distance in meters.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Meters(pub f64);

impl Meters {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_feet(feet: f64) -> Self {
        Self(feet / FEET_PER_METER)
    }

    #[inline]
    pub fn as_feet(&self) -> f64 {
        self.0 * FEET_PER_METER
    }

    /// Distance expressed in the given unit system.
    #[inline]
    pub fn in_units(&self, units: UnitSystem) -> f64 {
        match units {
            UnitSystem::Metric => self.0,
            UnitSystem::Imperial => self.as_feet(),
        }
    }
}

impl Add for Meters {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<f64> for Meters {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Measurement system used for distances (cable length, TDR axis).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Short unit label for distances.
    pub fn length_label(&self) -> &'static str {
        match self {
            Self::Metric => "m",
            Self::Imperial => "ft",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_conversions() {
        let f = Hertz::from_khz(14_200.0);
        assert!((f.as_mhz() - 14.2).abs() < 1e-12);
        assert!((f.as_khz() - 14_200.0).abs() < 1e-9);
    }

    #[test]
    fn test_meters_feet_roundtrip() {
        let d = Meters(10.0);
        assert!((d.as_feet() - 32.8084).abs() < 1e-9);
        assert!((Meters::from_feet(d.as_feet()).0 - 10.0).abs() < 1e-12);
        assert!((d.in_units(UnitSystem::Imperial) - 32.8084).abs() < 1e-9);
        assert_eq!(d.in_units(UnitSystem::Metric), 10.0);
    }
}
