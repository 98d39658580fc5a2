//! Search configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which parent set a freshly created slice is bounded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundParents {
    /// The pair that first produced the attribute set.
    #[default]
    Origin,
    /// Every pair of the level that produces the attribute set.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Capacity of the top-K register.
    pub k: usize,
    /// Size significance coefficient: slices need `size >= rows / alpha`.
    pub alpha: f64,
    /// Error weight of the score; `1 - w` weighs relative size.
    pub w: f64,
    /// Minimum score for a level-1 slice to be offered.
    pub admit_threshold: f64,
    pub bound_parents: BoundParents,
    /// Evaluate each level's candidates on the rayon pool.
    pub parallel: bool,
    /// Deepest lattice level to explore (`None`: all of them).
    pub max_level: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k: 10,
            alpha: 4.0,
            w: 0.7,
            admit_threshold: 1.0,
            bound_parents: BoundParents::Origin,
            parallel: false,
            max_level: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if !(0.0..=1.0).contains(&self.w) {
            return Err(ConfigError::InvalidWeight(self.w));
        }
        if !self.admit_threshold.is_finite() {
            return Err(ConfigError::InvalidAdmitThreshold(self.admit_threshold));
        }
        if self.max_level == Some(0) {
            return Err(ConfigError::ZeroMaxLevel);
        }
        Ok(())
    }

    /// Smallest admissible slice size for a dataset of `total_rows` rows.
    pub fn min_size(&self, total_rows: usize) -> f64 {
        total_rows as f64 / self.alpha
    }
}
