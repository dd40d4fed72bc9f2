//! Signal-to-noise and contrast-to-noise ratios between fitted materials.
//!
//! A metric compares a *feature* component against a *background* component
//! of the same mixture. Both ratios use the background spread as the noise
//! term and are NaN when that spread is zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::mixture::MixtureComponent;
use crate::stack::SliceResult;

/// `mu_feature / sigma_background`.
pub fn snr(mu_feature: f64, sigma_background: f64) -> f64 {
    if sigma_background == 0.0 {
        return f64::NAN;
    }
    mu_feature / sigma_background
}

/// `(mu_feature - mu_background) / sigma_background`.
pub fn cnr(mu_feature: f64, mu_background: f64, sigma_background: f64) -> f64 {
    if sigma_background == 0.0 {
        return f64::NAN;
    }
    (mu_feature - mu_background) / sigma_background
}

fn component_at(components: &[MixtureComponent], index: usize) -> Result<&MixtureComponent> {
    components.get(index).ok_or(Error::IndexOutOfRange {
        index,
        len: components.len(),
    })
}

fn ensure_slices(slices: &SliceResult) -> Result<()> {
    if slices.is_empty() {
        return Err(Error::invalid("slices", "no slice results"));
    }
    Ok(())
}

/// SNR between two components of one mixture (or of a stack summary).
pub fn mixture_snr(
    components: &[MixtureComponent],
    background: usize,
    feature: usize,
) -> Result<f64> {
    let bg = component_at(components, background)?;
    let fg = component_at(components, feature)?;
    Ok(snr(fg.mean, bg.std_dev))
}

/// CNR between two components of one mixture (or of a stack summary).
pub fn mixture_cnr(
    components: &[MixtureComponent],
    background: usize,
    feature: usize,
) -> Result<f64> {
    let bg = component_at(components, background)?;
    let fg = component_at(components, feature)?;
    Ok(cnr(fg.mean, bg.mean, bg.std_dev))
}

/// Per-slice SNR in ascending slice order.
///
/// An empty `slices` map is rejected.
pub fn snr_stack(
    slices: &SliceResult,
    background: usize,
    feature: usize,
) -> Result<BTreeMap<usize, f64>> {
    ensure_slices(slices)?;
    slices
        .iter()
        .map(|(&slice, fitted)| {
            mixture_snr(fitted.components(), background, feature).map(|value| (slice, value))
        })
        .collect()
}

/// Per-slice CNR in ascending slice order.
///
/// An empty `slices` map is rejected.
pub fn cnr_stack(
    slices: &SliceResult,
    background: usize,
    feature: usize,
) -> Result<BTreeMap<usize, f64>> {
    ensure_slices(slices)?;
    slices
        .iter()
        .map(|(&slice, fitted)| {
            mixture_cnr(fitted.components(), background, feature).map(|value| (slice, value))
        })
        .collect()
}

/// Background/feature component pair, displayed and serialized as `"b-f"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentPair {
    pub background: usize,
    pub feature: usize,
}

impl ComponentPair {
    pub fn new(background: usize, feature: usize) -> Self {
        Self {
            background,
            feature,
        }
    }

    /// Pairs up background and feature indices position by position.
    pub fn zip(backgrounds: &[usize], features: &[usize]) -> Result<Vec<ComponentPair>> {
        if backgrounds.len() != features.len() {
            return Err(Error::invalid(
                "feature",
                format!(
                    "{} background indices but {} feature indices",
                    backgrounds.len(),
                    features.len()
                ),
            ));
        }
        Ok(backgrounds
            .iter()
            .zip(features)
            .map(|(&background, &feature)| Self::new(background, feature))
            .collect())
    }
}

impl fmt::Display for ComponentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.background, self.feature)
    }
}

impl Serialize for ComponentPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// SNR and CNR for a set of component pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics<T> {
    #[serde(rename = "SNR")]
    pub snr: BTreeMap<ComponentPair, T>,
    #[serde(rename = "CNR")]
    pub cnr: BTreeMap<ComponentPair, T>,
}

impl<T> QualityMetrics<T> {
    pub fn is_empty(&self) -> bool {
        self.snr.is_empty() && self.cnr.is_empty()
    }
}

pub type SingleMetrics = QualityMetrics<f64>;

/// Per-pair metrics keyed by slice index.
pub type StackMetrics = QualityMetrics<BTreeMap<usize, f64>>;

pub fn single_report(
    components: &[MixtureComponent],
    pairs: &[ComponentPair],
) -> Result<SingleMetrics> {
    let mut metrics = SingleMetrics {
        snr: BTreeMap::new(),
        cnr: BTreeMap::new(),
    };
    for &pair in pairs {
        metrics
            .snr
            .insert(pair, mixture_snr(components, pair.background, pair.feature)?);
        metrics
            .cnr
            .insert(pair, mixture_cnr(components, pair.background, pair.feature)?);
    }
    Ok(metrics)
}

pub fn stack_report(slices: &SliceResult, pairs: &[ComponentPair]) -> Result<StackMetrics> {
    let mut metrics = StackMetrics {
        snr: BTreeMap::new(),
        cnr: BTreeMap::new(),
    };
    for &pair in pairs {
        metrics
            .snr
            .insert(pair, snr_stack(slices, pair.background, pair.feature)?);
        metrics
            .cnr
            .insert(pair, cnr_stack(slices, pair.background, pair.feature)?);
    }
    Ok(metrics)
}
