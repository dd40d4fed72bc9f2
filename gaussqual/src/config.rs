//! Fitting configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default seed for initial-mean selection when none is configured.
pub const DEFAULT_SEED: u64 = 3;

/// Configuration for Expectation-Maximization fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum number of EM iterations.
    pub max_iterations: usize,
    /// Stop once the mean per-observation log-likelihood improves by less than this.
    pub tolerance: f64,
    /// Seed for the k-means++ selection of initial means.
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-6,
            seed: DEFAULT_SEED,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations", "must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::invalid(
                "tolerance",
                format!("must be a positive finite number, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}
