//! Image quality assessment by Gaussian mixture fitting.
//!
//! The grey-value histogram of an image, or of slices sampled from a 3-D
//! stack, is modelled as a mixture of Gaussians, one per material. The fitted
//! means and spreads give signal-to-noise and contrast-to-noise ratios between
//! a background and a feature material.
//!
//! ```text
//! sample_slices -> load + centered_crop -> fit_mixture -> summarize
//!                                                      -> snr / cnr
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod metrics;
pub mod mixture;
pub mod report;
pub mod sample;
pub mod slice_sampler;
pub mod stack;

#[cfg(test)]
mod testing;

pub use config::FitConfig;
pub use error::{Error, Result};
pub use crate::image::{load_grey_image, GreyImage, ImageSequence};
pub use metrics::{
    cnr, cnr_stack, mixture_cnr, mixture_snr, single_report, snr, snr_stack, stack_report,
    ComponentPair, QualityMetrics, SingleMetrics, StackMetrics,
};
pub use mixture::{fit_mixture, FittedMixture, MixtureComponent};
pub use report::{material_labels, ResultFiles};
pub use sample::{Sample, ValueRange};
pub use slice_sampler::sample_slices;
pub use stack::{
    fit_stack, summarize, SliceResult, SliceSource, StackConfig, StackFit, StackSummary,
};
