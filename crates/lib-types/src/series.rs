//! Plain plot-ready series.
//!
//! The engine hands out ordered `(key, value)` sequences and leaves axis
//! scaling, clamping and drawing to whoever consumes them.

use serde::{Deserialize, Serialize};

/// One point of a series. `key` is a frequency in kHz or a distance.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub key: f64,
    pub value: f64,
}

impl SeriesPoint {
    #[inline]
    pub fn new(key: f64, value: f64) -> Self {
        Self { key, value }
    }
}

/// An ordered sequence of points.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Build a series with keys `i * step` for `i = 0..values.len()`.
    pub fn from_uniform(step: f64, values: &[f64]) -> Self {
        Self {
            points: values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint::new(i as f64 * step, v))
                .collect(),
        }
    }

    #[inline]
    pub fn push(&mut self, key: f64, value: f64) {
        self.points.push(SeriesPoint::new(key, value));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    /// Point with the smallest value, ignoring NaN.
    pub fn min_by_value(&self) -> Option<SeriesPoint> {
        self.points
            .iter()
            .filter(|p| !p.value.is_nan())
            .copied()
            .min_by(|a, b| a.value.total_cmp(&b.value))
    }

    /// Point with the largest value, ignoring NaN.
    pub fn max_by_value(&self) -> Option<SeriesPoint> {
        self.points
            .iter()
            .filter(|p| !p.value.is_nan())
            .copied()
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }
}

impl FromIterator<SeriesPoint> for Series {
    fn from_iter<I: IntoIterator<Item = SeriesPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Smith-chart position of one sample, keyed by the 1-based sample ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SmithPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_keys() {
        let s = Series::from_uniform(0.5, &[1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.points[2].key, 1.0);
        assert_eq!(s.points[2].value, 3.0);
    }

    #[test]
    fn test_min_max_skip_nan() {
        let s: Series = [(1.0, 3.0), (2.0, f64::NAN), (3.0, 1.2), (4.0, 7.0)]
            .iter()
            .map(|&(k, v)| SeriesPoint::new(k, v))
            .collect();
        assert_eq!(s.min_by_value().unwrap().key, 3.0);
        assert_eq!(s.max_by_value().unwrap().key, 4.0);
        assert!(Series::new().min_by_value().is_none());
    }
}
