use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::metal::Metal;
use crate::errors::CoreError;

/// Tolerance allowed on the weight sum when rebalancing.
pub const REBALANCE_SUM_TOLERANCE: f64 = 0.01;

/// Target percentage split of capital across the four metals.
///
/// Metals not present in the map have weight 0. Weights are percentages
/// (40.0 means 40%), not fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    weights: BTreeMap<Metal, f64>,
}

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(metal, weight)` pairs. Repeated metals overwrite.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Metal, f64)>) -> Self {
        Self {
            weights: pairs.into_iter().collect(),
        }
    }

    /// Build from string keys as the UI hands them over (`{"gold": 40, ...}`).
    /// Unrecognized keys are rejected with `UnknownMetal`.
    pub fn from_named(named: &HashMap<String, f64>) -> Result<Self, CoreError> {
        let mut weights = BTreeMap::new();
        for (name, weight) in named {
            weights.insert(Metal::parse(name)?, *weight);
        }
        Ok(Self { weights })
    }

    /// Builder-style setter.
    pub fn with(mut self, metal: Metal, weight: f64) -> Self {
        self.weights.insert(metal, weight);
        self
    }

    pub fn weight(&self, metal: Metal) -> f64 {
        self.weights.get(&metal).copied().unwrap_or(0.0)
    }

    /// Sum of the weights, compensated (Neumaier) so the result is the
    /// correctly rounded total and does not depend on the order metals are
    /// added in. `{gold: 33.4, silver: 33.3, platinum: 33.3}` sums to 100.0.
    pub fn sum(&self) -> f64 {
        let mut sum = 0.0_f64;
        let mut compensation = 0.0_f64;
        for &weight in self.weights.values() {
            let t = sum + weight;
            if sum.abs() >= weight.abs() {
                compensation += (sum - t) + weight;
            } else {
                compensation += (weight - t) + sum;
            }
            sum = t;
        }
        sum + compensation
    }

    /// Metals with a strictly positive weight, in display order.
    pub fn active(&self) -> impl Iterator<Item = (Metal, f64)> + '_ {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(m, w)| (*m, *w))
    }

    /// All explicitly listed metals with their weights, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Metal, f64)> + '_ {
        self.weights.iter().map(|(m, w)| (*m, *w))
    }

    /// Validation for an initial build: non-negative weights summing to exactly 100.
    ///
    /// "Exactly" is judged on the compensated sum from [`Allocation::sum`].
    pub fn validate_exact(&self) -> Result<(), CoreError> {
        self.validate_non_negative()?;
        let sum = self.sum();
        if sum != 100.0 {
            return Err(CoreError::InvalidAllocation { sum });
        }
        Ok(())
    }

    /// Validation for a rebalance: non-negative weights within `tolerance` of 100.
    pub fn validate_within(&self, tolerance: f64) -> Result<(), CoreError> {
        self.validate_non_negative()?;
        let sum = self.sum();
        if (sum - 100.0).abs() > tolerance {
            return Err(CoreError::InvalidAllocation { sum });
        }
        Ok(())
    }

    fn validate_non_negative(&self) -> Result<(), CoreError> {
        for (metal, weight) in &self.weights {
            if *weight < 0.0 || !weight.is_finite() {
                return Err(CoreError::InvalidWeight {
                    metal: metal.to_string(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}
