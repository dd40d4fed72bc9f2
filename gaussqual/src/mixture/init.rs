//! Deterministic selection of initial component means.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Lloyd refinement passes after k-means++ seeding.
const LLOYD_ITERATIONS: usize = 10;

/// Picks `k` initial means from weighted points `(value, count)` with
/// k-means++ seeding followed by a few Lloyd iterations.
///
/// The same points, `k` and seed always produce the same means.
pub(super) fn kmeans_plus_plus(points: &[(f64, f64)], k: usize, seed: u64) -> Vec<f64> {
    debug_assert!(!points.is_empty());
    debug_assert!(k > 0);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centers = Vec::with_capacity(k);

    let counts: Vec<f64> = points.iter().map(|&(_, count)| count).collect();
    centers.push(points[weighted_pick(&mut rng, &counts)].0);

    let mut dist_sq: Vec<f64> = points
        .iter()
        .map(|&(x, _)| (x - centers[0]).powi(2))
        .collect();

    while centers.len() < k {
        let scores: Vec<f64> = points
            .iter()
            .zip(&dist_sq)
            .map(|(&(_, count), &d)| count * d)
            .collect();

        // Fewer distinct values than components: every point is already a center.
        let pick = if scores.iter().sum::<f64>() > 0.0 {
            weighted_pick(&mut rng, &scores)
        } else {
            weighted_pick(&mut rng, &counts)
        };

        let center = points[pick].0;
        centers.push(center);
        for (d, &(x, _)) in dist_sq.iter_mut().zip(points) {
            *d = d.min((x - center).powi(2));
        }
    }

    lloyd(points, &mut centers);
    centers
}

/// Index drawn with probability proportional to `weights`.
fn weighted_pick(rng: &mut ChaCha8Rng, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut target = rng.random::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        if target < w {
            return i;
        }
        target -= w;
    }
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(0)
}

fn lloyd(points: &[(f64, f64)], centers: &mut [f64]) {
    let k = centers.len();
    let mut sums = vec![0.0; k];
    let mut masses = vec![0.0; k];

    for _ in 0..LLOYD_ITERATIONS {
        sums.iter_mut().for_each(|s| *s = 0.0);
        masses.iter_mut().for_each(|m| *m = 0.0);

        for &(x, count) in points {
            let nearest = nearest_center(centers, x);
            sums[nearest] += count * x;
            masses[nearest] += count;
        }

        let mut moved = false;
        for ((center, &sum), &mass) in centers.iter_mut().zip(&sums).zip(&masses) {
            if mass > 0.0 {
                let updated = sum / mass;
                moved |= updated != *center;
                *center = updated;
            }
        }
        if !moved {
            break;
        }
    }
}

/// Index of the closest center; ties go to the lowest index.
fn nearest_center(centers: &[f64], x: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &c) in centers.iter().enumerate() {
        let d = (x - c).abs();
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters() -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for center in [10.0, 100.0, 200.0] {
            for offset in -3..=3 {
                points.push((center + offset as f64, 5.0));
            }
        }
        points
    }

    #[test]
    fn test_finds_separated_clusters() {
        let mut centers = kmeans_plus_plus(&clusters(), 3, 3);
        centers.sort_by(f64::total_cmp);
        assert!((centers[0] - 10.0).abs() < 1e-9);
        assert!((centers[1] - 100.0).abs() < 1e-9);
        assert!((centers[2] - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_centers() {
        let points = clusters();
        assert_eq!(
            kmeans_plus_plus(&points, 3, 17),
            kmeans_plus_plus(&points, 3, 17)
        );
    }

    #[test]
    fn test_more_components_than_distinct_values() {
        let points = vec![(4.0, 10.0), (8.0, 2.0)];
        let centers = kmeans_plus_plus(&points, 4, 3);
        assert_eq!(centers.len(), 4);
        assert!(centers.iter().all(|&c| c == 4.0 || c == 8.0));
    }

    #[test]
    fn test_single_value() {
        let centers = kmeans_plus_plus(&[(7.0, 100.0)], 2, 3);
        assert_eq!(centers, vec![7.0, 7.0]);
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            let i = weighted_pick(&mut rng, &[0.0, 1.0, 0.0]);
            assert_eq!(i, 1);
        }
    }
}
