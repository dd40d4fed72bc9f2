//! One-dimensional Gaussian mixture fitting by Expectation-Maximization.
//!
//! Fits `n` Gaussian components to a sample of grey values. Observations are
//! collapsed into a weighted histogram of distinct values first, so the cost
//! of an EM iteration scales with the number of distinct grey levels rather
//! than with the number of pixels.
//!
//! Components are returned sorted by ascending mean; component `i` is the
//! `i`-th material in grey-value order.

mod em;
mod init;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::error::{Error, Result};
use crate::sample::{Sample, ValueRange};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// A single Gaussian component of a fitted mixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    /// Mean grey value (mu).
    pub mean: f64,
    /// Standard deviation (sigma). Zero marks a collapsed component.
    pub std_dev: f64,
    /// Mixing weight (phi).
    pub weight: f64,
}

impl MixtureComponent {
    /// Weighted probability density at `x`. A collapsed component has no density.
    pub fn density(&self, x: f64) -> f64 {
        if self.std_dev <= 0.0 {
            return 0.0;
        }
        let z = (x - self.mean) / self.std_dev;
        self.weight * (-0.5 * z * z - LN_SQRT_2PI).exp() / self.std_dev
    }
}

/// Result of fitting a Gaussian mixture, components sorted by ascending mean.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedMixture {
    components: Vec<MixtureComponent>,
    iterations: usize,
    converged: bool,
    mean_log_likelihood: f64,
}

impl FittedMixture {
    pub fn components(&self) -> &[MixtureComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at position `index` in ascending-mean order.
    pub fn component(&self, index: usize) -> Result<&MixtureComponent> {
        self.components.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.components.len(),
        })
    }

    pub fn means(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.mean).collect()
    }

    pub fn std_devs(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.std_dev).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    /// Number of EM iterations performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether EM stopped on the tolerance rather than the iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Mean per-observation log-likelihood at the last E-step.
    pub fn mean_log_likelihood(&self) -> f64 {
        self.mean_log_likelihood
    }

    /// Mixture probability density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        self.components.iter().map(|c| c.density(x)).sum()
    }

    /// Total log-likelihood of `sample` under this mixture.
    pub fn log_likelihood(&self, sample: &Sample) -> f64 {
        sample.values().iter().map(|&x| self.density(x).ln()).sum()
    }
}

/// Fits an `n_components` Gaussian mixture to `sample`.
///
/// `initial_means`, when given, seeds EM verbatim and must hold exactly
/// `n_components` finite values. Otherwise means are picked by seeded
/// k-means++ from `config.seed`. `value_range` discards observations outside
/// the closed interval before fitting.
///
/// Hitting `config.max_iterations` is not an error: the last iterate is
/// returned with [`FittedMixture::converged`] set to `false`.
pub fn fit_mixture(
    sample: Sample,
    n_components: usize,
    initial_means: Option<&[f64]>,
    value_range: Option<ValueRange>,
    config: &FitConfig,
) -> Result<FittedMixture> {
    if n_components == 0 {
        return Err(Error::invalid("n_components", "must be at least 1"));
    }
    if let Some(means) = initial_means {
        validate_initial_means(means, n_components)?;
    }
    config.validate()?;

    let sample = match value_range {
        Some(range) => sample.restrict(range),
        None => sample,
    };
    if sample.is_empty() {
        return Err(Error::EmptySample);
    }

    let points = sample.histogram();
    let std_dev = sample.std_dev().unwrap_or(0.0);
    let means = match initial_means {
        Some(means) => means.to_vec(),
        None => init::kmeans_plus_plus(&points, n_components, config.seed),
    };

    let outcome = em::run(&points, means, std_dev, config);

    if !outcome.converged {
        tracing::warn!(
            n_components,
            iterations = outcome.iterations,
            "EM did not converge, returning last iterate"
        );
    }

    let mut components = outcome.components;
    components.sort_by(|a, b| a.mean.total_cmp(&b.mean));

    tracing::debug!(
        n_components,
        observations = sample.len(),
        distinct_values = points.len(),
        iterations = outcome.iterations,
        means = ?components.iter().map(|c| c.mean).collect::<Vec<_>>(),
        "Fitted Gaussian mixture"
    );

    Ok(FittedMixture {
        components,
        iterations: outcome.iterations,
        converged: outcome.converged,
        mean_log_likelihood: outcome.mean_log_likelihood,
    })
}

pub(crate) fn validate_initial_means(means: &[f64], n_components: usize) -> Result<()> {
    if means.len() != n_components {
        return Err(Error::invalid(
            "initial_means",
            format!("expected {} values, got {}", n_components, means.len()),
        ));
    }
    if means.iter().any(|m| !m.is_finite()) {
        return Err(Error::invalid("initial_means", "values must be finite"));
    }
    Ok(())
}
