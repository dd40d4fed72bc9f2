//! Run settings merged from an optional config file and command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use common::FileFormat;
use gaussqual::{ComponentPair, FitConfig, StackConfig, ValueRange};
use serde::{Deserialize, Serialize};

use crate::args::{AnalysisArgs, StackArgs};

/// Default centred mask for a single image: the whole image.
pub const SINGLE_MASK_PERCENTAGE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub n_components: Option<usize>,
    /// Defaults per mode when unset.
    pub mask_percentage: Option<f64>,
    pub threshold: Option<[f64; 2]>,
    pub initial_means: Option<Vec<f64>>,
    pub background: Vec<usize>,
    pub feature: Vec<usize>,
    pub material_names: Option<Vec<String>>,
    pub z_percentage: f64,
    pub n_runs: usize,
    pub max_workers: Option<usize>,
    pub save_level: u8,
    pub output_dir: Option<PathBuf>,
    pub fit: FitConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        let stack = StackConfig::new(1);
        Self {
            n_components: None,
            mask_percentage: None,
            threshold: None,
            initial_means: None,
            background: Vec::new(),
            feature: Vec::new(),
            material_names: None,
            z_percentage: stack.z_percentage,
            n_runs: stack.n_runs,
            max_workers: None,
            save_level: 0,
            output_dir: None,
            fit: FitConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let format = FileFormat::from_file_name(&path.to_string_lossy())
            .with_context(|| format!("Unsupported config file '{}'", path.display()))?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Self = common::deserialize(&text, format)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded run config");
        Ok(config)
    }

    /// Config file named by `--config` (or defaults) with every given flag applied on top.
    pub fn from_args(args: &AnalysisArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args)?;
        Ok(config)
    }

    pub fn apply(&mut self, args: &AnalysisArgs) -> Result<()> {
        if let Some(n) = args.n_components {
            self.n_components = Some(n);
        }
        if let Some(mask) = args.mask_percentage {
            self.mask_percentage = Some(mask);
        }
        if let Some(threshold) = &args.threshold {
            let [min, max] = threshold.as_slice() else {
                bail!("--threshold takes exactly two values, got {}", threshold.len());
            };
            self.threshold = Some([*min, *max]);
        }
        if let Some(means) = &args.initial_means {
            self.initial_means = Some(means.clone());
        }
        if let Some(background) = &args.background {
            self.background = background.clone();
        }
        if let Some(feature) = &args.feature {
            self.feature = feature.clone();
        }
        if let Some(names) = &args.material_names {
            self.material_names = Some(names.clone());
        }
        if let Some(seed) = args.seed {
            self.fit.seed = seed;
        }
        if args.save > 0 {
            self.save_level = args.save;
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = Some(dir.clone());
        }
        Ok(())
    }

    pub fn apply_stack(&mut self, args: &StackArgs) {
        if let Some(z) = args.z_percentage {
            self.z_percentage = z;
        }
        if let Some(runs) = args.runs {
            self.n_runs = runs;
        }
        if let Some(workers) = args.workers {
            self.max_workers = Some(workers);
        }
    }

    pub fn n_components(&self) -> Result<usize> {
        match self.n_components {
            Some(n) => Ok(n),
            None => bail!("Number of components is required (-n or `n_components` in the config)"),
        }
    }

    pub fn value_range(&self) -> Result<Option<ValueRange>> {
        self.threshold
            .map(|[min, max]| ValueRange::new(min, max))
            .transpose()
            .context("Invalid threshold")
    }

    pub fn pairs(&self) -> Result<Vec<ComponentPair>> {
        Ok(ComponentPair::zip(&self.background, &self.feature)?)
    }

    pub fn stack_config(&self) -> Result<StackConfig> {
        let defaults = StackConfig::new(self.n_components()?);
        Ok(StackConfig {
            z_percentage: self.z_percentage,
            n_runs: self.n_runs,
            mask_percentage: self.mask_percentage.unwrap_or(defaults.mask_percentage),
            initial_means: self.initial_means.clone(),
            value_range: self.value_range()?,
            max_workers: self.max_workers,
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            "n_components: 3\nz_percentage: 40.0\nbackground: [0]\nfeature: [2]\nfit:\n  seed: 11\n",
        )
        .unwrap();

        let args = AnalysisArgs {
            config: Some(path),
            n_components: Some(4),
            seed: Some(5),
            ..Default::default()
        };
        let config = RunConfig::from_args(&args).unwrap();

        assert_eq!(config.n_components, Some(4));
        assert_eq!(config.z_percentage, 40.0);
        assert_eq!(config.fit.seed, 5);
        assert_eq!(config.fit.max_iterations, FitConfig::default().max_iterations);
        assert_eq!(config.pairs().unwrap(), vec![ComponentPair::new(0, 2)]);
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "n_components": 2, "threshold": [200.0, 10.0] }"#).unwrap();

        let config = RunConfig::load(&path).unwrap();
        let range = config.value_range().unwrap().unwrap();
        assert_eq!((range.min, range.max), (10.0, 200.0));
    }

    #[test]
    fn test_unknown_config_extension() {
        assert!(RunConfig::load(Path::new("run.toml")).is_err());
    }

    #[test]
    fn test_missing_components() {
        let config = RunConfig::default();
        assert!(config.n_components().is_err());
        assert!(config.stack_config().is_err());
    }

    #[test]
    fn test_stack_config_defaults() {
        let config = RunConfig {
            n_components: Some(3),
            ..Default::default()
        };
        let stack = config.stack_config().unwrap();
        assert_eq!(stack, StackConfig::new(3));
    }

    #[test]
    fn test_mismatched_pairs() {
        let config = RunConfig {
            background: vec![0, 1],
            feature: vec![2],
            ..Default::default()
        };
        assert!(config.pairs().is_err());
    }
}
