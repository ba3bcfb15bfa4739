//! Catalog of supported analyzer models and their frequency ranges.
//!
//! The catalog is built once at startup and handed to whoever needs it; it
//! is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frequency range of one analyzer model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerModel {
    pub name: String,
    pub min_frequency_khz: f64,
    pub max_frequency_khz: f64,
}

impl AnalyzerModel {
    pub fn new(name: impl Into<String>, min_frequency_khz: f64, max_frequency_khz: f64) -> Self {
        Self {
            name: name.into(),
            min_frequency_khz,
            max_frequency_khz,
        }
    }

    /// Whether `[start_khz, stop_khz]` lies inside this model's range.
    pub fn covers(&self, start_khz: f64, stop_khz: f64) -> bool {
        start_khz >= self.min_frequency_khz && stop_khz <= self.max_frequency_khz
    }
}

/// Immutable map from model identifier to its range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    models: BTreeMap<String, AnalyzerModel>,
}

const BUILTIN_MODELS: &[(&str, f64, f64)] = &[
    ("AA-30", 100.0, 30_000.0),
    ("AA-30 ZERO", 60.0, 30_000.0),
    ("AA-30.ZERO", 60.0, 170_000.0),
    ("AA-35 ZOOM", 60.0, 35_000.0),
    ("AA-54", 100.0, 54_000.0),
    ("AA-55 ZOOM", 60.0, 55_000.0),
    ("AA-170", 100.0, 170_000.0),
    ("AA-200", 100.0, 200_000.0),
    ("AA-230", 100.0, 230_000.0),
    ("AA-230PRO", 100.0, 230_000.0),
    ("AA-230 ZOOM", 100.0, 230_000.0),
    ("AA-500", 100.0, 500_000.0),
    ("AA-520", 100.0, 520_000.0),
    ("AA-600", 100.0, 600_000.0),
    ("AA-700 ZOOM", 100.0, 700_000.0),
    ("AA-1000", 100.0, 1_000_000.0),
    ("AA-1400", 100.0, 1_400_000.0),
    ("AA-2000", 0.0, 6_000_000.0),
];

impl ModelCatalog {
    /// Catalog from an explicit list of models.
    pub fn from_models(models: impl IntoIterator<Item = AnalyzerModel>) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.name.clone(), m)).collect(),
        }
    }

    /// The models known to ship with the application.
    pub fn builtin() -> Self {
        Self::from_models(
            BUILTIN_MODELS
                .iter()
                .map(|&(name, lo, hi)| AnalyzerModel::new(name, lo, hi)),
        )
    }

    /// Look up a model. Identifiers are matched case-insensitively.
    pub fn get(&self, id: &str) -> Option<&AnalyzerModel> {
        self.models.get(id).or_else(|| {
            self.models
                .values()
                .find(|m| m.name.eq_ignore_ascii_case(id))
        })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalyzerModel> {
        self.models.values()
    }
}
