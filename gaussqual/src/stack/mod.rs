//! Concurrent per-slice fitting over a 3-D stack and cross-slice aggregation.
//!
//! Slice indices come from [`sample_slices`]; each distinct index is loaded,
//! masked and fitted independently on a bounded [`WorkerPool`]. The calling
//! thread gathers the ordered results into a [`SliceResult`] and averages the
//! components position by position.
//!
//! Position-wise averaging assumes that component `i` of every slice is the
//! same material. Fits are sorted by mean, so this holds while the materials
//! keep their grey-value order across the stack.


use std::collections::BTreeMap;

use common::parallel::WorkerPool;
use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::error::{Error, Result};
use crate::image::{validate_mask_percentage, GreyImage};
use crate::mixture::{fit_mixture, validate_initial_means, FittedMixture, MixtureComponent};
use crate::sample::{Sample, ValueRange};
use crate::slice_sampler::{sample_slices, validate_z_percentage};

/// Provides greyscale slices of a 3-D stack by zero-based index.
///
/// Implementations are shared across worker threads.
pub trait SliceSource: Sync {
    fn slice_count(&self) -> usize;

    fn load_slice(&self, index: usize) -> Result<GreyImage>;
}

/// Fitted mixtures keyed by slice index, iterated in ascending order.
pub type SliceResult = BTreeMap<usize, FittedMixture>;

/// Parameters of one stack run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub n_components: usize,
    /// Central fraction of the stack depth to sample from, in percent.
    pub z_percentage: f64,
    pub n_runs: usize,
    /// Centred fraction of each slice axis kept before fitting, in percent.
    pub mask_percentage: f64,
    pub initial_means: Option<Vec<f64>>,
    pub value_range: Option<ValueRange>,
    /// Worker cap; `None` uses one worker per available core.
    pub max_workers: Option<usize>,
}

impl StackConfig {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            z_percentage: 70.0,
            n_runs: 30,
            mask_percentage: 70.0,
            initial_means: None,
            value_range: None,
            max_workers: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(Error::invalid("n_components", "must be at least 1"));
        }
        validate_z_percentage(self.z_percentage)?;
        if self.n_runs == 0 {
            return Err(Error::invalid("n_runs", "must be at least 1"));
        }
        validate_mask_percentage(self.mask_percentage)?;
        if let Some(means) = &self.initial_means {
            validate_initial_means(means, self.n_components)?;
        }
        Ok(())
    }
}

/// Component-wise mean of the per-slice fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSummary {
    pub components: Vec<MixtureComponent>,
    /// Number of distinct slices averaged.
    pub slice_count: usize,
}

impl StackSummary {
    pub fn means(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.mean).collect()
    }

    pub fn std_devs(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.std_dev).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackFit {
    pub summary: StackSummary,
    pub slices: SliceResult,
}

/// Fits every sampled slice of `source` and averages the results.
///
/// Fails as a whole if any slice fails; the failing slice index is logged and
/// its error returned unchanged.
pub fn fit_stack<S>(source: &S, config: &StackConfig, fit_config: &FitConfig) -> Result<StackFit>
where
    S: SliceSource + ?Sized,
{
    config.validate()?;
    fit_config.validate()?;

    let mut indices = sample_slices(source.slice_count(), config.z_percentage, config.n_runs)?;
    indices.dedup();

    let pool = WorkerPool::new(config.max_workers)?;
    tracing::info!(
        total_slices = source.slice_count(),
        fitted_slices = indices.len(),
        workers = pool.workers(),
        n_components = config.n_components,
        "Fitting stack"
    );

    let fits = pool.try_map(&indices, |&index| {
        fit_slice(source, index, config, fit_config).inspect_err(|err| {
            tracing::error!(slice = index, error = %err, "Slice fit failed");
        })
    })?;

    let slices: SliceResult = indices.into_iter().zip(fits).collect();
    let summary = summarize(&slices)?;

    tracing::info!(
        slices = summary.slice_count,
        means = ?summary.means(),
        "Stack fit complete"
    );

    Ok(StackFit { summary, slices })
}

fn fit_slice<S: SliceSource + ?Sized>(
    source: &S,
    index: usize,
    config: &StackConfig,
    fit_config: &FitConfig,
) -> Result<FittedMixture> {
    let image = source.load_slice(index)?;
    let masked = image.centered_crop(config.mask_percentage)?;
    let sample = Sample::from_pixels(masked.pixels());

    let fitted = fit_mixture(
        sample,
        config.n_components,
        config.initial_means.as_deref(),
        config.value_range,
        fit_config,
    )?;
    tracing::debug!(slice = index, iterations = fitted.iterations(), "Fitted slice");
    Ok(fitted)
}

/// Position-wise arithmetic mean of mean, std_dev and weight across slices.
pub fn summarize(slices: &SliceResult) -> Result<StackSummary> {
    let mut fits = slices.values();
    let first = fits
        .next()
        .ok_or_else(|| Error::invalid("slices", "no slice results to summarize"))?;
    let n = first.len();

    let mut sums: Vec<MixtureComponent> = first.components().to_vec();
    for fitted in fits {
        if fitted.len() != n {
            return Err(Error::invalid(
                "slices",
                format!(
                    "slice results disagree on component count ({} vs {})",
                    n,
                    fitted.len()
                ),
            ));
        }
        for (sum, component) in sums.iter_mut().zip(fitted.components()) {
            sum.mean += component.mean;
            sum.std_dev += component.std_dev;
            sum.weight += component.weight;
        }
    }

    let count = slices.len() as f64;
    let components = sums
        .into_iter()
        .map(|sum| MixtureComponent {
            mean: sum.mean / count,
            std_dev: sum.std_dev / count,
            weight: sum.weight / count,
        })
        .collect();

    Ok(StackSummary {
        components,
        slice_count: slices.len(),
    })
}
