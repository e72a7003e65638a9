//! End-to-end tests from raw plate readings to MIC summaries

use approx::assert_relative_eq;
use micfit::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Raw readings with blank 0.05 and control 1.05 for a known Hill curve
fn plate_row(
    name: &str,
    truth: Hill4Params,
    noise: Option<(&Normal<f64>, &mut StdRng)>,
) -> AssayRow {
    let mut wells: [f64; 9] =
        std::array::from_fn(|i| 0.05 + truth.evaluate(64.0 / 2f64.powi(i as i32)));
    if let Some((normal, rng)) = noise {
        for well in wells.iter_mut() {
            *well += normal.sample(&mut *rng);
        }
    }
    AssayRow::builder(name)
        .blanks(0.04, 0.06)
        .wells(wells)
        .control(1.05)
        .initial_concentration_cell("64")
        .build()
}

#[test]
fn test_reference_plate() {
    let row = AssayRow::builder("reference")
        .wells([0.02, 0.05, 0.3, 0.7, 0.9, 0.95, 0.97, 0.98, 0.99])
        .initial_concentration(64.0)
        .build();

    let fits = RawAssayMatrix::from_rows(vec![row])
        .mic(&MicOptions::mic90())
        .unwrap();
    let fit = &fits[0];

    assert_eq!(fit.fit_type, FitType::Fitted);
    assert_eq!(fit.mic.quality, MicQuality::Ok);
    let mic = fit.mic.concentration.and_then(|c| c.value()).unwrap();
    assert!(mic > 16.0 && mic < 32.0);

    // The fitted curve passes through the target growth at the MIC
    let model = fit.model.as_ref().unwrap();
    assert_relative_eq!(model.evaluate(mic), 0.1, epsilon = 1e-8);
}

#[test]
fn test_noisy_triplicates() {
    let truth = Hill4Params::new(8.0, 2.0, 0.95, 0.02);
    let expected = 8.0 * (0.95 / (0.1 - 0.02) - 1.0f64).sqrt();

    let normal = Normal::new(0.0, 0.02).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut matrix = RawAssayMatrix::new();
    for _ in 0..3 {
        matrix.push(plate_row("noisy", truth, Some((&normal, &mut rng))));
    }

    let fits = matrix.mic(&MicOptions::mic90()).unwrap();
    assert_eq!(fits.len(), 1);
    let fit = &fits[0];

    assert_eq!(fit.fit_type, FitType::Fitted);
    assert_eq!(fit.mic.quality, MicQuality::Ok);
    let mic = fit.mic.concentration.and_then(|c| c.value()).unwrap();
    assert_relative_eq!(mic, expected, max_relative = 0.25);

    let uncertainty = fit.uncertainty.as_ref().unwrap().mic.unwrap();
    assert!(uncertainty.std_dev.is_finite() && uncertainty.std_dev > 0.0);
}

#[test]
fn test_batches_accumulate() {
    let truth = Hill4Params::new(8.0, 2.0, 0.95, 0.02);
    let mut matrix = RawAssayMatrix::from_rows(vec![plate_row("a", truth, None)]);
    let second = RawAssayMatrix::from_rows(vec![
        plate_row("b", Hill4Params::new(2.0, 1.0, 0.9, 0.05), None),
        plate_row("a", truth, None),
    ]);
    matrix.extend_from(&second);

    let fits = matrix.mic(&MicOptions::mic90()).unwrap();
    assert_eq!(fits.len(), 2);
    assert_eq!(fits[0].name(), "a");
    assert_eq!(fits[0].curve.len(), 18);
    assert_eq!(fits[1].name(), "b");

    matrix.clear();
    assert!(matrix.mic(&MicOptions::mic90()).unwrap().is_empty());
}

#[test]
fn test_dilution_factor_changes_concentrations() {
    let truth = Hill4Params::new(8.0, 2.0, 0.95, 0.02);
    let matrix = RawAssayMatrix::from_rows(vec![plate_row("a", truth, None)]);

    let fits = matrix
        .mic(&MicOptions::mic90().with_dilution_factor(4.0))
        .unwrap();
    let curve = &fits[0].curve;

    assert_eq!(curve.max_concentration(), Some(64.0));
    assert_relative_eq!(
        curve.min_concentration().unwrap(),
        64.0 / 4f64.powi(8),
        max_relative = 1e-12
    );
}

#[test]
fn test_serialized_concentration() {
    let matrix = RawAssayMatrix::from_rows(vec![
        plate_row("ok", Hill4Params::new(8.0, 2.0, 0.95, 0.02), None),
        plate_row("weak", Hill4Params::new(16.0, 2.0, 0.45, 0.5), None),
    ]);
    let fits = matrix.mic(&MicOptions::mic90()).unwrap();

    let ok = serde_json::to_value(&fits[0].mic).unwrap();
    assert!(ok["concentration"].is_number());
    assert_eq!(ok["quality"], "Ok");

    let weak = serde_json::to_value(&fits[1].mic).unwrap();
    assert_eq!(weak["concentration"], "> 64 (53%)");
    assert_eq!(weak["quality"], "OverMeasuredRange");
}

#[test]
fn test_summary_rows() {
    let matrix = RawAssayMatrix::from_rows(vec![
        plate_row("ok", Hill4Params::new(8.0, 2.0, 0.95, 0.02), None),
        plate_row("weak", Hill4Params::new(16.0, 2.0, 0.35, 0.6), None),
    ]);
    let summaries = matrix.mic_summary(&MicOptions::mic50()).unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "ok");
    assert_eq!(summaries[0].mic_percentage, 50);
    assert_eq!(summaries[0].mic_quality, "Ok");
    assert_eq!(summaries[1].mic_quality, "Over measured range");
    assert_eq!(summaries[1].mic_uncertainty, "None");

    let json = serde_json::to_string(&summaries).unwrap();
    let back: Vec<FitSummary> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summaries);
}

#[test]
fn test_options_round_trip_through_json() {
    let options = MicOptions::mic50().with_dilution_factor(3.0).sequential();
    let json = serde_json::to_string(&options).unwrap();
    let back: MicOptions = serde_json::from_str(&json).unwrap();

    assert_eq!(back.target, 0.5);
    assert_eq!(back.dilution_factor, 3.0);
    assert!(!back.parallel);
}
