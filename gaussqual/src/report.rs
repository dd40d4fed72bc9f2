//! Result persistence and the printed summary.
//!
//! Single-image results are written as one JSON object keyed `material_<i>`
//! in ascending-mean order, followed by optional `SNR`/`CNR` tables. Stack
//! results add one table per mixture parameter keyed by slice index.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use strum_macros::Display;

use crate::error::{Error, Result};
use crate::metrics::{SingleMetrics, StackMetrics};
use crate::mixture::MixtureComponent;
use crate::stack::{SliceResult, StackFit};

/// Mixture parameter tabulated per slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Parameter {
    Mu,
    Sigma,
    Phi,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Mu, Parameter::Sigma, Parameter::Phi];

    fn of(self, component: &MixtureComponent) -> f64 {
        match self {
            Parameter::Mu => component.mean,
            Parameter::Sigma => component.std_dev,
            Parameter::Phi => component.weight,
        }
    }
}

/// `{slice: [value per component]}` for one parameter.
pub fn slice_table(slices: &SliceResult, parameter: Parameter) -> BTreeMap<usize, Vec<f64>> {
    slices
        .iter()
        .map(|(&slice, fitted)| {
            let values = fitted.components().iter().map(|c| parameter.of(c)).collect();
            (slice, values)
        })
        .collect()
}

#[derive(Serialize)]
struct MaterialEntry {
    mu_mean: f64,
    sigma_mean: f64,
    phi_mean: f64,
}

/// Single-image (or stack summary) results in their persisted layout.
pub struct SingleReport<'a> {
    pub components: &'a [MixtureComponent],
    pub metrics: Option<&'a SingleMetrics>,
}

impl Serialize for SingleReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let metrics = self.metrics.filter(|m| !m.is_empty());
        let len = self.components.len() + if metrics.is_some() { 2 } else { 0 };

        let mut map = serializer.serialize_map(Some(len))?;
        for (i, component) in self.components.iter().enumerate() {
            map.serialize_entry(
                &format!("material_{i}"),
                &MaterialEntry {
                    mu_mean: component.mean,
                    sigma_mean: component.std_dev,
                    phi_mean: component.weight,
                },
            )?;
        }
        if let Some(metrics) = metrics {
            map.serialize_entry("SNR", &metrics.snr)?;
            map.serialize_entry("CNR", &metrics.cnr)?;
        }
        map.end()
    }
}

/// Labels for the printed report: the given names, or `material_<i>`.
pub fn material_labels(names: Option<&[String]>, n_components: usize) -> Result<Vec<String>> {
    match names {
        Some(names) if names.len() != n_components => Err(Error::invalid(
            "material_names",
            format!(
                "{} names given for {} components",
                names.len(),
                n_components
            ),
        )),
        Some(names) => Ok(names.to_vec()),
        None => Ok((0..n_components).map(|i| format!("material_{i}")).collect()),
    }
}

/// Writes `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::WriteResults {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| Error::WriteResults {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Saved results");
    Ok(())
}

/// Output file naming for one run: `<dir>/<name>_<suffix>`.
#[derive(Debug, Clone)]
pub struct ResultFiles {
    dir: PathBuf,
    name: String,
}

impl ResultFiles {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.name, suffix))
    }

    pub fn input(&self) -> PathBuf {
        self.path("input.json")
    }

    pub fn results(&self) -> PathBuf {
        self.path("GMM_results.json")
    }

    pub fn slice_results(&self, parameter: Parameter) -> PathBuf {
        self.path(&format!("{parameter}_GMM_slice_results.json"))
    }

    pub fn slice_metrics(&self) -> PathBuf {
        self.path("SNR_CNR_slice_results.json")
    }

    /// Writes the single-image results. Returns the written path.
    pub fn save_single(
        &self,
        components: &[MixtureComponent],
        metrics: Option<&SingleMetrics>,
    ) -> Result<PathBuf> {
        let path = self.results();
        write_json(
            &path,
            &SingleReport {
                components,
                metrics,
            },
        )?;
        Ok(path)
    }

    /// Writes the stack summary, the per-slice parameter tables and, when
    /// present, the per-slice metrics. Returns the written paths.
    pub fn save_stack(
        &self,
        fit: &StackFit,
        summary_metrics: Option<&SingleMetrics>,
        slice_metrics: Option<&StackMetrics>,
    ) -> Result<Vec<PathBuf>> {
        let mut written = vec![self.save_single(&fit.summary.components, summary_metrics)?];

        for parameter in Parameter::ALL {
            let path = self.slice_results(parameter);
            write_json(&path, &slice_table(&fit.slices, parameter))?;
            written.push(path);
        }

        if let Some(metrics) = slice_metrics.filter(|m| !m.is_empty()) {
            let path = self.slice_metrics();
            write_json(&path, metrics)?;
            written.push(path);
        }

        Ok(written)
    }
}

/// Human-readable table of fitted components and pair metrics.
pub fn render_single(
    labels: &[String],
    components: &[MixtureComponent],
    metrics: Option<&SingleMetrics>,
) -> String {
    let mut out = String::new();
    let width = labels.iter().map(String::len).max().unwrap_or(0).max(8);

    let _ = writeln!(
        out,
        "{:<width$}  {:>12}  {:>12}  {:>8}",
        "material", "mu", "sigma", "phi"
    );
    for (label, component) in labels.iter().zip(components) {
        let _ = writeln!(
            out,
            "{:<width$}  {:>12.4}  {:>12.4}  {:>8.4}",
            label, component.mean, component.std_dev, component.weight
        );
    }

    if let Some(metrics) = metrics {
        for (pair, snr) in &metrics.snr {
            let cnr = metrics.cnr.get(pair).copied().unwrap_or(f64::NAN);
            let _ = writeln!(
                out,
                "SNR is {snr:.4}, CNR is {cnr:.4}, with background {} and feature {}",
                label_of(labels, pair.background),
                label_of(labels, pair.feature)
            );
        }
    }
    out
}

/// Per-slice SNR/CNR lines for each pair, in ascending slice order.
pub fn render_slice_metrics(labels: &[String], metrics: &StackMetrics) -> String {
    let mut out = String::new();
    for (pair, per_slice) in &metrics.snr {
        let _ = writeln!(
            out,
            "background {} / feature {}:",
            label_of(labels, pair.background),
            label_of(labels, pair.feature)
        );
        let cnr = metrics.cnr.get(pair);
        for (slice, snr) in per_slice {
            let cnr = cnr.and_then(|c| c.get(slice)).copied().unwrap_or(f64::NAN);
            let _ = writeln!(out, "  slice {slice:>5}  SNR {snr:>10.4}  CNR {cnr:>10.4}");
        }
    }
    out
}

fn label_of(labels: &[String], index: usize) -> &str {
    labels.get(index).map(String::as_str).unwrap_or("?")
}
