//! Greyscale images, the centred spatial mask and image-sequence access.

mod io;
mod sequence;

pub use io::load_grey_image;
pub use sequence::ImageSequence;

use crate::error::{Error, Result};

/// Row-major greyscale image with grey values at their native scale.
#[derive(Debug, Clone, PartialEq)]
pub struct GreyImage {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl GreyImage {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(Error::invalid(
                "pixels",
                format!(
                    "expected {}x{} = {} values, got {}",
                    width,
                    height,
                    width * height,
                    pixels.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.pixels[y * self.width + x]
    }

    /// Centred rectangle covering `percentage` of each axis.
    ///
    /// 100 keeps the whole image, 0 yields an empty image.
    pub fn centered_crop(&self, percentage: f64) -> Result<GreyImage> {
        validate_mask_percentage(percentage)?;
        if percentage == 100.0 {
            return Ok(self.clone());
        }

        let (x0, x1) = centered_span(self.width, percentage);
        let (y0, y1) = centered_span(self.height, percentage);
        let width = x1 - x0;
        let height = y1 - y0;

        let mut pixels = Vec::with_capacity(width * height);
        for y in y0..y1 {
            let row = y * self.width;
            pixels.extend_from_slice(&self.pixels[row + x0..row + x1]);
        }

        Ok(GreyImage {
            width,
            height,
            pixels,
        })
    }
}

pub(crate) fn validate_mask_percentage(percentage: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&percentage) {
        return Err(Error::invalid(
            "mask_percentage",
            format!("must be in [0, 100], got {percentage}"),
        ));
    }
    Ok(())
}

/// Half-open range of `len * percentage / 100` (truncated) elements.
///
/// The window starts at `trunc(len / 2 - keep / 2)` with integer `len / 2`,
/// shifted back if needed so it ends inside the axis.
fn centered_span(len: usize, percentage: f64) -> (usize, usize) {
    let keep = ((len as f64 * percentage / 100.0) as usize).min(len);
    let start = ((len / 2) as f64 - keep as f64 / 2.0).max(0.0) as usize;
    let start = start.min(len - keep);
    (start, start + keep)
}
