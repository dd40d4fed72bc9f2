//! Expectation-Maximization iterations over a weighted grey-value histogram.

use super::{MixtureComponent, LN_SQRT_2PI};
use crate::config::FitConfig;

/// Added to every variance when evaluating densities, so a component sitting on
/// a single grey level keeps a finite likelihood. Reported variances are not
/// regularized.
const VARIANCE_FLOOR: f64 = 1e-6;

/// Responsibility mass below which a component is treated as collapsed and its
/// mean and variance are left unchanged for the iteration.
const COLLAPSED_MASS: f64 = 1e-10;

pub(super) struct Outcome {
    pub components: Vec<MixtureComponent>,
    pub iterations: usize,
    pub converged: bool,
    pub mean_log_likelihood: f64,
}

/// Per-component sufficient statistics gathered in one E-step pass.
///
/// First and second moments are accumulated around the component's current
/// mean to keep the variance update well conditioned for large grey values.
#[derive(Clone, Copy, Default)]
struct Moments {
    mass: f64,
    first: f64,
    second: f64,
}

struct State {
    means: Vec<f64>,
    variances: Vec<f64>,
    weights: Vec<f64>,
}

impl State {
    fn new(means: Vec<f64>, std_dev: f64) -> Self {
        let k = means.len();
        Self {
            variances: vec![std_dev * std_dev; k],
            weights: vec![1.0 / k as f64; k],
            means,
        }
    }

    /// E-step: accumulates responsibilities into `moments` and returns the
    /// total log-likelihood under the current parameters.
    fn expectation(&self, points: &[(f64, f64)], moments: &mut [Moments]) -> f64 {
        let k = self.means.len();
        moments.iter_mut().for_each(|m| *m = Moments::default());

        let log_norm: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.variances)
            .map(|(&w, &var)| w.ln() - LN_SQRT_2PI - 0.5 * (var + VARIANCE_FLOOR).ln())
            .collect();
        let inv_two_var: Vec<f64> = self
            .variances
            .iter()
            .map(|&var| 0.5 / (var + VARIANCE_FLOOR))
            .collect();

        let mut log_joint = vec![0.0; k];
        let mut log_likelihood = 0.0;

        for &(x, count) in points {
            let mut max = f64::NEG_INFINITY;
            for j in 0..k {
                let d = x - self.means[j];
                log_joint[j] = log_norm[j] - d * d * inv_two_var[j];
                max = max.max(log_joint[j]);
            }

            let sum: f64 = log_joint.iter().map(|&l| (l - max).exp()).sum();
            let log_px = max + sum.ln();
            log_likelihood += count * log_px;

            for j in 0..k {
                let r = count * (log_joint[j] - log_px).exp();
                let d = x - self.means[j];
                let m = &mut moments[j];
                m.mass += r;
                m.first += r * d;
                m.second += r * d * d;
            }
        }

        log_likelihood
    }

    /// M-step: re-estimates weights, means and variances from `moments`.
    fn maximization(&mut self, moments: &[Moments]) {
        let total: f64 = moments.iter().map(|m| m.mass).sum();

        for (j, m) in moments.iter().enumerate() {
            self.weights[j] = m.mass / total;
            if m.mass <= COLLAPSED_MASS {
                continue;
            }
            let shift = m.first / m.mass;
            self.means[j] += shift;
            self.variances[j] = (m.second / m.mass - shift * shift).max(0.0);
        }
    }

    fn into_components(self) -> Vec<MixtureComponent> {
        self.means
            .into_iter()
            .zip(self.variances)
            .zip(self.weights)
            .map(|((mean, variance), weight)| MixtureComponent {
                mean,
                std_dev: variance.sqrt(),
                weight,
            })
            .collect()
    }
}

/// Runs EM from `means` with all standard deviations set to `std_dev` and
/// equal weights. `points` are `(value, count)` pairs.
pub(super) fn run(
    points: &[(f64, f64)],
    means: Vec<f64>,
    std_dev: f64,
    config: &FitConfig,
) -> Outcome {
    let observations: f64 = points.iter().map(|&(_, count)| count).sum();
    let mut state = State::new(means, std_dev);
    let mut moments = vec![Moments::default(); state.means.len()];

    let mut previous = f64::NEG_INFINITY;
    let mut mean_log_likelihood = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        mean_log_likelihood = state.expectation(points, &mut moments) / observations;
        state.maximization(&moments);

        if (mean_log_likelihood - previous).abs() < config.tolerance {
            converged = true;
            break;
        }
        previous = mean_log_likelihood;
    }

    Outcome {
        components: state.into_components(),
        iterations,
        converged,
        mean_log_likelihood,
    }
}
