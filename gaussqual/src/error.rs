//! Error types for mixture fitting, stack aggregation and result I/O.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("No grey values left to fit")]
    EmptySample,

    #[error("Component index {index} is out of range for a mixture of {len} components")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode TIFF '{path}': {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Failed to decode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported image '{path}': {reason}")]
    UnsupportedImage { path: PathBuf, reason: String },

    #[error("Unrecognized image sequence in '{dir}': {reason}")]
    SequenceLayout { dir: PathBuf, reason: String },

    #[error("Failed to write results to '{path}': {source}")]
    WriteResults {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize results for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
