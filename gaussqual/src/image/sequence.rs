use std::path::{Path, PathBuf};

use super::{load_grey_image, GreyImage};
use crate::error::{Error, Result};
use crate::stack::SliceSource;

const IMAGE_EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// A directory of numbered slice images, e.g. `scan0000.tif .. scan0511.tif`.
///
/// The layout is inferred from the lexicographically first image file: its
/// trailing digits give the zero-padded index width and the first slice
/// number, the rest of the stem is the shared prefix. Only files that share
/// that prefix, width and extension count as slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSequence {
    dir: PathBuf,
    prefix: String,
    digits: usize,
    extension: String,
    first_index: usize,
    count: usize,
}

struct NumberedName {
    prefix: String,
    digits: usize,
    number: usize,
    extension: String,
}

impl NumberedName {
    fn parse(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if !IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &stem[prefix.len()..];
        if digits.is_empty() {
            return None;
        }

        Some(Self {
            prefix: prefix.to_string(),
            digits: digits.len(),
            number: digits.parse().ok()?,
            extension: extension.to_string(),
        })
    }
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut names = paths.iter().filter_map(|path| NumberedName::parse(path));
        let first = names.next().ok_or_else(|| Error::SequenceLayout {
            dir: dir.to_path_buf(),
            reason: "no numbered image files found".into(),
        })?;

        let mut numbers: Vec<usize> = std::iter::once(first.number)
            .chain(
                names
                    .filter(|name| {
                        name.prefix == first.prefix
                            && name.digits == first.digits
                            && name.extension == first.extension
                    })
                    .map(|name| name.number),
            )
            .collect();
        numbers.sort_unstable();
        numbers.dedup();

        let first_index = numbers[0];
        let count = numbers
            .iter()
            .enumerate()
            .take_while(|&(i, &number)| number == first_index + i)
            .count();
        if count != numbers.len() {
            tracing::warn!(
                dir = %dir.display(),
                contiguous = count,
                found = numbers.len(),
                "Slice numbering has gaps, using the contiguous run only"
            );
        }

        let sequence = Self {
            dir: dir.to_path_buf(),
            prefix: first.prefix,
            digits: first.digits,
            extension: first.extension,
            first_index,
            count,
        };
        tracing::info!(
            dir = %dir.display(),
            prefix = %sequence.prefix,
            first_index,
            slices = count,
            "Opened image sequence"
        );
        Ok(sequence)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn first_index(&self) -> usize {
        self.first_index
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Path of the slice at zero-based `index` within the sequence.
    pub fn slice_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}{:0width$}.{}",
            self.prefix,
            self.first_index + index,
            self.extension,
            width = self.digits
        ))
    }
}

impl SliceSource for ImageSequence {
    fn slice_count(&self) -> usize {
        self.count
    }

    fn load_slice(&self, index: usize) -> Result<GreyImage> {
        if index >= self.count {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.count,
            });
        }
        load_grey_image(self.slice_path(index))
    }
}
