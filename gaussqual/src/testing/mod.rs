//! Synthetic data for tests: seeded mixtures, images and slice sources.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::image::GreyImage;
use crate::stack::SliceSource;

/// True parameters of one synthetic material: (mean, std_dev, weight).
pub type TrueComponent = (f64, f64, f64);

/// The three well-separated materials used throughout the fitting tests.
pub const THREE_MATERIALS: [TrueComponent; 3] =
    [(50.0, 10.0, 0.3), (150.0, 8.0, 0.4), (220.0, 12.0, 0.3)];

/// Standard normal draw via Box-Muller.
pub fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `count` draws from the mixture, component sizes fixed by the weights.
pub fn mixture_values(components: &[TrueComponent], count: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(count);
    for (i, &(mean, std_dev, weight)) in components.iter().enumerate() {
        let n = if i + 1 == components.len() {
            count - values.len()
        } else {
            (weight * count as f64).round() as usize
        };
        values.extend((0..n).map(|_| mean + std_dev * standard_normal(&mut rng)));
    }
    values
}

/// Square image whose pixels are drawn from the mixture, rounded to integer
/// grey levels like a real detector output.
pub fn mixture_image(side: usize, components: &[TrueComponent], seed: u64) -> GreyImage {
    let pixels = mixture_values(components, side * side, seed)
        .into_iter()
        .map(|v| v.round() as f32)
        .collect();
    GreyImage::new(side, side, pixels).unwrap()
}

/// Stack whose slices are generated on demand from a per-slice seed.
pub struct SyntheticStack {
    pub slices: usize,
    pub side: usize,
    pub components: Vec<TrueComponent>,
    /// When true every slice uses the same seed and is therefore identical.
    pub identical: bool,
    pub loads: AtomicUsize,
}

impl SyntheticStack {
    pub fn new(slices: usize, side: usize, components: &[TrueComponent]) -> Self {
        Self {
            slices,
            side,
            components: components.to_vec(),
            identical: false,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn identical(mut self) -> Self {
        self.identical = true;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SliceSource for SyntheticStack {
    fn slice_count(&self) -> usize {
        self.slices
    }

    fn load_slice(&self, index: usize) -> Result<GreyImage> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let seed = if self.identical { 7 } else { 1000 + index as u64 };
        Ok(mixture_image(self.side, &self.components, seed))
    }
}

/// Stack where one slice cannot be loaded.
pub struct BrokenStack {
    pub inner: SyntheticStack,
    pub broken_index: usize,
}

impl SliceSource for BrokenStack {
    fn slice_count(&self) -> usize {
        self.inner.slice_count()
    }

    fn load_slice(&self, index: usize) -> Result<GreyImage> {
        if index == self.broken_index {
            return Err(Error::UnsupportedImage {
                path: format!("slice{index:04}.tif").into(),
                reason: "corrupt slice".into(),
            });
        }
        self.inner.load_slice(index)
    }
}
