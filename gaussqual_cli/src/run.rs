//! Single-image and stack runs: analyse, print, then save.
//!
//! Nothing is written until the analysis has finished, so a failed run leaves
//! no partial result files behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gaussqual::report::{render_single, render_slice_metrics, write_json};
use gaussqual::{
    fit_mixture, fit_stack, load_grey_image, material_labels, single_report, stack_report,
    ImageSequence, ResultFiles, Sample, SliceSource,
};
use serde::Serialize;

use crate::args::{SingleArgs, StackArgs};
use crate::run_config::{RunConfig, SINGLE_MASK_PERCENTAGE};

const RESULTS_DIR: &str = "results";

/// Settings saved as `<name>_input.json`.
#[derive(Serialize)]
struct RunRecord<'a> {
    mode: &'static str,
    input: &'a Path,
    #[serde(flatten)]
    config: &'a RunConfig,
}

pub fn run_single(args: &SingleArgs) -> Result<Vec<PathBuf>> {
    let config = RunConfig::from_args(&args.analysis)?;
    let n_components = config.n_components()?;
    let labels = material_labels(config.material_names.as_deref(), n_components)?;
    let pairs = config.pairs()?;
    let value_range = config.value_range()?;
    let mask = config.mask_percentage.unwrap_or(SINGLE_MASK_PERCENTAGE);

    let image = load_grey_image(&args.image)
        .with_context(|| format!("Failed to load image '{}'", args.image.display()))?;
    let masked = image.centered_crop(mask)?;
    tracing::info!(
        image = %args.image.display(),
        mask_percentage = mask,
        full_size = ?(image.width(), image.height()),
        masked_size = ?(masked.width(), masked.height()),
        "Imported image"
    );

    let fitted = fit_mixture(
        Sample::from_pixels(masked.pixels()),
        n_components,
        config.initial_means.as_deref(),
        value_range,
        &config.fit,
    )
    .context("Mixture fit failed")?;
    let metrics = single_report(fitted.components(), &pairs)?;

    println!("{}", render_single(&labels, fitted.components(), Some(&metrics)));

    let image_dir = args.image.parent().unwrap_or(Path::new("."));
    let files = result_files(&config, image_dir.join(RESULTS_DIR), image_name(&args.image));
    let mut written = Vec::new();
    if config.save_level >= 1 {
        written.push(save_record(&files, "single", &args.image, &config)?);
    }
    if config.save_level >= 2 {
        written.push(files.save_single(fitted.components(), Some(&metrics))?);
    }
    warn_plots(config.save_level);
    Ok(written)
}

pub fn run_stack(args: &StackArgs) -> Result<Vec<PathBuf>> {
    let mut config = RunConfig::from_args(&args.analysis)?;
    config.apply_stack(args);
    let stack_config = config.stack_config()?;
    let labels = material_labels(config.material_names.as_deref(), stack_config.n_components)?;
    let pairs = config.pairs()?;

    let sequence = ImageSequence::open(&args.dir)
        .with_context(|| format!("Failed to open image sequence '{}'", args.dir.display()))?;
    tracing::info!(
        dir = %args.dir.display(),
        prefix = sequence.prefix(),
        first_index = sequence.first_index(),
        slices = sequence.slice_count(),
        "Imported image sequence"
    );

    let fit = fit_stack(&sequence, &stack_config, &config.fit).context("Stack fit failed")?;
    let summary_metrics = single_report(&fit.summary.components, &pairs)?;
    let slice_metrics = stack_report(&fit.slices, &pairs)?;

    println!(
        "Mean over {} slices:\n{}",
        fit.summary.slice_count,
        render_single(&labels, &fit.summary.components, Some(&summary_metrics))
    );
    if !slice_metrics.is_empty() {
        println!("{}", render_slice_metrics(&labels, &slice_metrics));
    }

    let files = result_files(&config, args.dir.join(RESULTS_DIR), dir_name(&args.dir));
    let mut written = Vec::new();
    if config.save_level >= 1 {
        written.push(save_record(&files, "stack", &args.dir, &config)?);
    }
    if config.save_level >= 2 {
        written.extend(files.save_stack(&fit, Some(&summary_metrics), Some(&slice_metrics))?);
    }
    warn_plots(config.save_level);
    Ok(written)
}

/// `--output-dir` when given, otherwise `default_dir`.
fn result_files(config: &RunConfig, default_dir: PathBuf, name: String) -> ResultFiles {
    let dir = config.output_dir.clone().unwrap_or(default_dir);
    ResultFiles::new(dir, name)
}

fn save_record(
    files: &ResultFiles,
    mode: &'static str,
    input: &Path,
    config: &RunConfig,
) -> Result<PathBuf> {
    let path = files.input();
    write_json(
        &path,
        &RunRecord {
            mode,
            input,
            config,
        },
    )?;
    Ok(path)
}

fn image_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stack".to_string())
}

fn warn_plots(save_level: u8) {
    if save_level >= 3 {
        tracing::warn!(save_level, "Plot output is not supported, nothing extra saved");
    }
}
