//! Selection of representative slices from a 3-D stack.

use crate::error::{Error, Result};

/// Picks `n_runs` slice indices spread evenly over the central `z_percentage`
/// of a stack of `total_slices` slices.
///
/// The window is centred on slice `total_slices / 2`. Indices are
/// non-decreasing and clamped to the stack; when the window holds fewer slices
/// than `n_runs`, indices repeat. A single run always returns the central
/// slice.
pub fn sample_slices(total_slices: usize, z_percentage: f64, n_runs: usize) -> Result<Vec<usize>> {
    if total_slices == 0 {
        return Err(Error::invalid("total_slices", "stack has no slices"));
    }
    validate_z_percentage(z_percentage)?;
    if n_runs == 0 {
        return Err(Error::invalid("n_runs", "must be at least 1"));
    }

    let central = total_slices / 2;
    if n_runs == 1 {
        return Ok(vec![central]);
    }

    let span = (total_slices as f64 * z_percentage / 100.0).floor();
    let low = (central as f64 - span / 2.0).trunc().max(0.0);
    let high = (central as f64 + span / 2.0).trunc();
    let last = (total_slices - 1) as f64;

    let step = (high - low) / (n_runs - 1) as f64;
    let indices = (0..n_runs)
        .map(|i| {
            let position = if i + 1 == n_runs {
                high
            } else {
                low + step * i as f64
            };
            position.trunc().clamp(0.0, last) as usize
        })
        .collect();

    Ok(indices)
}

pub(crate) fn validate_z_percentage(z_percentage: f64) -> Result<()> {
    if !(z_percentage > 0.0 && z_percentage <= 100.0) {
        return Err(Error::invalid(
            "z_percentage",
            format!("must be in (0, 100], got {z_percentage}"),
        ));
    }
    Ok(())
}
