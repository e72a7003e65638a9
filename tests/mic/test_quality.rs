//! Tests for the MIC quality decision table

use micfit::mic::{classify, Evidence};
use micfit::prelude::*;

/// Two-fold series from 64 down to 0.25 with the given growth fractions
fn evidence(growth: [f64; 9], fit_type: FitType) -> Evidence {
    let pairs: Vec<(f64, f64)> = growth
        .iter()
        .enumerate()
        .map(|(i, &g)| (64.0 / 2f64.powi(i as i32), g))
        .collect();
    Evidence::from_curve(&CurveRecord::from_pairs("c", &pairs), fit_type, 0.1)
}

const CROSSING: [f64; 9] = [0.02, 0.05, 0.3, 0.7, 0.9, 0.95, 0.97, 0.98, 0.99];
const RESISTANT: [f64; 9] = [0.6, 0.7, 0.8, 0.9, 0.95, 0.97, 0.98, 0.99, 1.0];
const SUSCEPTIBLE: [f64; 9] = [0.01, 0.01, 0.02, 0.02, 0.03, 0.03, 0.04, 0.05, 0.06];

#[test]
fn test_accepted_root_in_range_is_ok() {
    let mut e = evidence(CROSSING, FitType::Fitted);
    e.model_root = Some(24.0);
    e.model_accepted = true;

    let verdict = classify(&e);
    assert_eq!(verdict.quality, MicQuality::Ok);
    assert_eq!(verdict.concentration, Some(MicConcentration::Value(24.0)));
}

#[test]
fn test_lowest_growth_above_target_is_over_range() {
    // Even an accepted in-range root is overridden by the measured range
    let mut e = evidence(RESISTANT, FitType::Fitted);
    e.model_root = Some(40.0);
    e.model_accepted = true;

    let verdict = classify(&e);
    assert_eq!(verdict.quality, MicQuality::OverMeasuredRange);
    assert_eq!(verdict.concentration.unwrap().to_string(), "> 64 (60%)");
}

#[test]
fn test_highest_growth_below_target_is_under_range() {
    let mut e = evidence(SUSCEPTIBLE, FitType::Fitted);
    e.model_root = Some(0.1);
    e.model_accepted = true;

    let verdict = classify(&e);
    assert_eq!(verdict.quality, MicQuality::UnderMeasuredRange);
    assert_eq!(verdict.concentration.unwrap().to_string(), "< 0.25 (6%)");
}

#[test]
fn test_not_fitted_resistant_curve() {
    let verdict = classify(&evidence(RESISTANT, FitType::NotFitted));
    assert_eq!(verdict.quality, MicQuality::OverMeasuredRangeNotFitted);
    assert!(verdict.concentration.unwrap().is_bound());
}

#[test]
fn test_not_fitted_susceptible_curve_is_not_determined() {
    let verdict = classify(&evidence(SUSCEPTIBLE, FitType::NotFitted));
    assert_eq!(verdict, micfit::mic::Verdict::not_determined());
}

#[test]
fn test_rejected_root_beyond_range_is_over_range() {
    let mut e = evidence(CROSSING, FitType::Fitted);
    e.model_root = Some(500.0);
    e.model_accepted = false;

    assert_eq!(classify(&e).quality, MicQuality::OverMeasuredRange);
}

#[test]
fn test_interpolation_needs_lowest_growth_near_target() {
    let mut growth = CROSSING;
    growth[0] = 0.095;
    growth[1] = 0.2;
    let mut e = evidence(growth, FitType::Fitted);
    e.model_root = Some(50.0);
    e.model_accepted = false;
    e.interpolated_root = Some(60.0);

    let verdict = classify(&e);
    assert_eq!(verdict.quality, MicQuality::EstimatedFromInterpolation);
    assert_eq!(verdict.concentration, Some(MicConcentration::Value(60.0)));

    // Far from the target the spline root is not trusted
    let mut e = evidence(CROSSING, FitType::Fitted);
    e.model_accepted = false;
    e.interpolated_root = Some(20.0);
    assert_eq!(classify(&e).quality, MicQuality::NotDetermined);
}

#[test]
fn test_poor_is_never_assigned() {
    for growth in [CROSSING, RESISTANT, SUSCEPTIBLE] {
        for fit_type in [FitType::Fitted, FitType::NotFitted] {
            for accepted in [true, false] {
                let mut e = evidence(growth, fit_type);
                e.model_root = Some(20.0);
                e.model_accepted = accepted;
                e.interpolated_root = Some(20.0);
                assert_ne!(classify(&e).quality, MicQuality::Poor);
            }
        }
    }
}
