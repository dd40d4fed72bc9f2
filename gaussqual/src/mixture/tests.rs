use super::*;
use crate::testing::{mixture_values, THREE_MATERIALS};

fn three_material_sample() -> Sample {
    Sample::new(mixture_values(&THREE_MATERIALS, 10_000, 11))
}

fn assert_sorted(mixture: &FittedMixture) {
    let means = mixture.means();
    assert!(
        means.windows(2).all(|w| w[0] <= w[1]),
        "means not sorted: {means:?}"
    );
}

fn weight_sum(mixture: &FittedMixture) -> f64 {
    mixture.weights().iter().sum()
}

#[test]
fn test_recovers_three_separated_materials() {
    let fitted =
        fit_mixture(three_material_sample(), 3, None, None, &FitConfig::default()).unwrap();

    assert_eq!(fitted.len(), 3);
    assert!(fitted.converged());
    assert!((weight_sum(&fitted) - 1.0).abs() < 1e-6);

    for (component, &(mean, std_dev, weight)) in fitted.components().iter().zip(&THREE_MATERIALS) {
        assert!(
            (component.mean - mean).abs() < 0.05 * mean,
            "mean {} too far from {}",
            component.mean,
            mean
        );
        assert!(
            (component.std_dev - std_dev).abs() < 0.2 * std_dev,
            "std_dev {} too far from {}",
            component.std_dev,
            std_dev
        );
        assert!((component.weight - weight).abs() < 0.05);
    }
}

#[test]
fn test_fit_is_deterministic() {
    let config = FitConfig::default();
    let a = fit_mixture(three_material_sample(), 3, None, None, &config).unwrap();
    let b = fit_mixture(three_material_sample(), 3, None, None, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_means_sorted_for_any_component_count() {
    let sample = three_material_sample();
    for n in 1..=5 {
        let fitted = fit_mixture(sample.clone(), n, None, None, &FitConfig::default()).unwrap();
        assert_eq!(fitted.len(), n);
        assert_sorted(&fitted);
        assert!((weight_sum(&fitted) - 1.0).abs() < 1e-6);
        assert!(fitted.components().iter().all(|c| c.std_dev >= 0.0));
    }
}

#[test]
fn test_initial_means_used_and_output_sorted() {
    let initial = [220.0, 50.0, 150.0];
    let fitted = fit_mixture(
        three_material_sample(),
        3,
        Some(&initial),
        None,
        &FitConfig::default(),
    )
    .unwrap();

    assert_sorted(&fitted);
    for (fitted_mean, &(mean, _, _)) in fitted.means().iter().zip(&THREE_MATERIALS) {
        assert!((fitted_mean - mean).abs() < 0.05 * mean);
    }
}

#[test]
fn test_single_component_matches_sample_moments() {
    let sample = three_material_sample();
    let mean = sample.mean().unwrap();
    let std_dev = sample.std_dev().unwrap();

    let fitted = fit_mixture(sample, 1, None, None, &FitConfig::default()).unwrap();
    let component = fitted.component(0).unwrap();

    assert!((component.mean - mean).abs() < 1e-9);
    assert!((component.std_dev - std_dev).abs() < 1e-9);
    assert!((component.weight - 1.0).abs() < 1e-12);
    assert!(fitted.converged());
}

#[test]
fn test_value_range_restricts_fit() {
    let range = ValueRange::new(100.0, 300.0).unwrap();
    let fitted = fit_mixture(
        three_material_sample(),
        2,
        None,
        Some(range),
        &FitConfig::default(),
    )
    .unwrap();

    let means = fitted.means();
    assert!((means[0] - 150.0).abs() < 7.5);
    assert!((means[1] - 220.0).abs() < 11.0);
}

#[test]
fn test_constant_sample_collapses() {
    let sample = Sample::new(vec![42.0; 500]);
    let fitted = fit_mixture(sample, 2, None, None, &FitConfig::default()).unwrap();

    for component in fitted.components() {
        assert_eq!(component.mean, 42.0);
        assert_eq!(component.std_dev, 0.0);
    }
    assert!((weight_sum(&fitted) - 1.0).abs() < 1e-12);
}

#[test]
fn test_zero_components_rejected() {
    let err =
        fit_mixture(three_material_sample(), 0, None, None, &FitConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameter {
            name: "n_components",
            ..
        }
    ));
}

#[test]
fn test_mismatched_initial_means_rejected() {
    let err = fit_mixture(
        three_material_sample(),
        3,
        Some(&[10.0, 20.0]),
        None,
        &FitConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameter {
            name: "initial_means",
            ..
        }
    ));
}

#[test]
fn test_parameters_checked_before_sample() {
    // An empty sample would fail with EmptySample, but parameter errors come first.
    let err = fit_mixture(Sample::default(), 0, None, None, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }));

    let err = fit_mixture(
        Sample::default(),
        2,
        Some(&[1.0, f64::NAN]),
        None,
        &FitConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }));
}

#[test]
fn test_empty_sample_rejected() {
    let err = fit_mixture(Sample::default(), 2, None, None, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, Error::EmptySample));
}

#[test]
fn test_range_that_removes_everything_rejected() {
    let range = ValueRange::new(1000.0, 2000.0).unwrap();
    let err = fit_mixture(
        three_material_sample(),
        3,
        None,
        Some(range),
        &FitConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptySample));
}

#[test]
fn test_iteration_cap_returns_last_iterate() {
    let config = FitConfig {
        max_iterations: 1,
        ..Default::default()
    };
    let fitted = fit_mixture(three_material_sample(), 3, None, None, &config).unwrap();

    assert!(!fitted.converged());
    assert_eq!(fitted.iterations(), 1);
    assert_sorted(&fitted);
    assert!((weight_sum(&fitted) - 1.0).abs() < 1e-6);
}

#[test]
fn test_density_integrates_to_one() {
    let fitted =
        fit_mixture(three_material_sample(), 3, None, None, &FitConfig::default()).unwrap();
    let step = 0.1;
    let integral: f64 = (0..4000).map(|i| fitted.density(i as f64 * step) * step).sum();
    assert!((integral - 1.0).abs() < 1e-3, "integral = {integral}");
}

#[test]
fn test_fit_improves_likelihood_over_single_gaussian() {
    let sample = three_material_sample();
    let config = FitConfig::default();
    let one = fit_mixture(sample.clone(), 1, None, None, &config).unwrap();
    let three = fit_mixture(sample.clone(), 3, None, None, &config).unwrap();
    assert!(three.log_likelihood(&sample) > one.log_likelihood(&sample));
}

#[test]
fn test_component_index_out_of_range() {
    let fitted =
        fit_mixture(three_material_sample(), 2, None, None, &FitConfig::default()).unwrap();
    assert!(matches!(
        fitted.component(2),
        Err(Error::IndexOutOfRange { index: 2, len: 2 })
    ));
}
