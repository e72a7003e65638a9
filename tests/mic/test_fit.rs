//! Tests for the bounded Hill 4-parameter fit
//!
//! Tests cover:
//! - Recovery of known parameters from noisy replicates
//! - Parameter box constraints
//! - Covariance behaviour

use approx::assert_relative_eq;
use micfit::optimize::*;
use micfit::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn series() -> Vec<f64> {
    (0..9).map(|i| 64.0 / 2f64.powi(i)).collect()
}

fn exact_curve(truth: Hill4Params) -> CurveRecord {
    let pairs: Vec<(f64, f64)> = series().into_iter().map(|x| (x, truth.evaluate(x))).collect();
    CurveRecord::from_pairs("exact", &pairs)
}

/// Replicated Hill curve with additive gaussian noise
fn noisy_curve(truth: Hill4Params, replicates: usize, sd: f64, seed: u64) -> CurveRecord {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sd).unwrap();
    let pairs: Vec<(f64, f64)> = (0..replicates)
        .flat_map(|_| series())
        .map(|x| (x, truth.evaluate(x) + noise.sample(&mut rng)))
        .collect();
    CurveRecord::from_pairs("noisy", &pairs)
}

#[test]
fn test_recovers_parameters_from_noisy_replicates() {
    let truth = Hill4Params::new(8.0, 2.0, 0.95, 0.02);
    let options = FitOptions::default();

    for seed in [1, 7, 42] {
        let curve = noisy_curve(truth, 3, 0.02, seed);
        let fit = DoseResponseFitter::new(&options).fit(&curve).unwrap();

        assert_eq!(fit.n_points, 27);
        assert_relative_eq!(fit.params.d0i, 8.0, max_relative = 0.2);
        assert_relative_eq!(fit.params.s, 0.95, max_relative = 0.2);
        assert!(fit.sse < 27.0 * 0.02f64.powi(2) * 3.0);

        let sd = fit.std_devs();
        assert!(sd.iter().all(|s| s.is_finite() && *s > 0.0));
    }
}

#[test]
fn test_parameters_respect_bounds() {
    // A sharp step pushes the slope toward its upper bound
    let pairs: Vec<(f64, f64)> = series()
        .into_iter()
        .map(|x| (x, if x > 10.0 { 0.02 } else { 0.98 }))
        .collect();
    let curve = CurveRecord::from_pairs("step", &pairs);
    let options = FitOptions::default();

    if let Ok(fit) = DoseResponseFitter::new(&options).fit(&curve) {
        let p = fit.params;
        assert!(p.n >= 0.01 && p.n <= 6.0);
        assert!(p.s >= 0.1 && p.s <= 4.0);
        assert!(p.o >= 0.01 && p.o <= 1.0);
        assert!(p.d0i >= 0.25 && p.d0i <= 64.0);
    }
}

#[test]
fn test_custom_bounds_are_honoured() {
    let truth = Hill4Params::new(8.0, 1.5, 0.95, 0.02);
    let curve = exact_curve(truth);
    let bounds = ParameterBounds {
        n: (0.5, 2.0),
        ..Default::default()
    };
    let options = FitOptions {
        bounds,
        ..Default::default()
    };

    let fit = DoseResponseFitter::new(&options).fit(&curve).unwrap();
    assert!(fit.params.n >= 0.5 && fit.params.n <= 2.0);
    assert_relative_eq!(fit.params.n, 1.5, max_relative = 1e-3);
}

#[test]
fn test_four_points_have_no_residual_degrees_of_freedom() {
    let truth = Hill4Params::new(4.0, 1.0, 0.9, 0.05);
    let pairs: Vec<(f64, f64)> = [1.0, 2.0, 8.0, 32.0]
        .iter()
        .map(|&x| (x, truth.evaluate(x)))
        .collect();
    let curve = CurveRecord::from_pairs("four", &pairs);

    let fit = DoseResponseFitter::new(&FitOptions::default())
        .fit(&curve)
        .unwrap();
    assert!(fit.std_devs().iter().all(|s| s.is_infinite()));
}

#[test]
fn test_fitted_model_is_monotone_decreasing() {
    let curve = noisy_curve(Hill4Params::new(2.0, 1.2, 0.9, 0.05), 2, 0.01, 3);
    let fit = DoseResponseFitter::new(&FitOptions::default())
        .fit(&curve)
        .unwrap();

    let sampled = fit.sample(0.25, 64.0, 200);
    assert!(sampled.windows(2).all(|w| w[0].1 >= w[1].1));
}
