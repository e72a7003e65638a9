//! Tests for plate normalization and curve assembly

use approx::assert_relative_eq;
use micfit::data::*;
use micfit::MicError;

fn plate_row(name: &str, initial: f64) -> AssayRow {
    AssayRow::builder(name)
        .blanks(0.08, 0.12)
        .wells([0.1, 0.1, 0.2, 0.5, 0.9, 1.1, 1.1, 1.1, 1.1])
        .control(1.1)
        .initial_concentration(initial)
        .build()
}

#[test]
fn test_concentrations_follow_dilution_series() {
    let matrix = RawAssayMatrix::from_rows(vec![plate_row("a", 128.0), plate_row("b", 10.0)]);

    for factor in [2.0, 3.0, 10.0] {
        let normalized = Normalizer::new(factor).unwrap().normalize(&matrix);
        for row in normalized.concentrations.rows() {
            for pair in row.to_vec().windows(2) {
                assert!(pair[0] > pair[1]);
                assert_relative_eq!(pair[0] / pair[1], factor, max_relative = 1e-12);
            }
        }
    }
}

#[test]
fn test_first_well_is_initial_concentration() {
    let matrix = RawAssayMatrix::from_rows(vec![plate_row("a", 128.0)]);
    let normalized = Normalizer::default().normalize(&matrix);

    assert_eq!(normalized.concentrations[[0, 0]], 128.0);
    assert_eq!(normalized.concentrations[[0, 8]], 0.5);
}

#[test]
fn test_blank_and_control_anchor_growth() {
    let matrix = RawAssayMatrix::from_rows(vec![plate_row("a", 64.0)]);
    let normalized = Normalizer::default().normalize(&matrix);

    // Wells equal to the mean blank read as no growth
    assert_relative_eq!(normalized.growth[[0, 0]], 0.0, epsilon = 1e-12);
    // Wells equal to the control read as full growth
    assert_relative_eq!(normalized.growth[[0, 5]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(normalized.growth[[0, 3]], 0.4, epsilon = 1e-12);
}

#[test]
fn test_normalization_leaves_input_untouched() {
    let matrix = RawAssayMatrix::from_rows(vec![plate_row("a", 64.0)]);
    let before = matrix.clone();
    let _ = Normalizer::default().normalize(&matrix);
    assert_eq!(matrix, before);
}

#[test]
fn test_invalid_dilution_factor() {
    assert_eq!(
        Normalizer::new(1.0).unwrap_err(),
        MicError::InvalidDilutionFactor(1.0)
    );
    assert!(Normalizer::new(0.5).is_err());
    assert!(Normalizer::new(f64::NAN).is_err());
}

#[test]
fn test_missing_initial_concentration_defaults_to_one() {
    let row = AssayRow::builder("a")
        .wells([0.5; DILUTION_WELLS])
        .initial_concentration_cell("n/a")
        .build();
    let normalized = Normalizer::default().normalize(&RawAssayMatrix::from_rows(vec![row]));

    assert_eq!(normalized.concentrations[[0, 0]], DEFAULT_INITIAL_CONCENTRATION);
}

#[test]
fn test_assembly_groups_replicates_across_batches() {
    let first = RawAssayMatrix::from_rows(vec![plate_row("a", 64.0), plate_row("b", 64.0)]);
    let second = RawAssayMatrix::from_rows(vec![plate_row("a", 64.0)]);
    let matrix = first.merge(second);

    let assembly = assemble(&Normalizer::default().normalize(&matrix));

    assert!(assembly.skipped.is_empty());
    assert_eq!(assembly.curves.len(), 2);
    assert_eq!(assembly.curves[0].name, "a");
    assert_eq!(assembly.curves[0].len(), 2 * DILUTION_WELLS);
    assert_eq!(assembly.curves[1].name, "b");
    assert_eq!(assembly.curves[1].len(), DILUTION_WELLS);

    // Replicates collapse back to one point per concentration
    let averaged = assembly.curves[0].averaged();
    assert_eq!(averaged.len(), DILUTION_WELLS);
    assert!(averaged.windows(2).all(|w| w[0].concentration < w[1].concentration));
}

#[test]
fn test_assembly_drops_non_finite_points() {
    let mut wells = [0.5; DILUTION_WELLS];
    wells[2] = f64::NAN;
    wells[7] = f64::INFINITY;
    let row = AssayRow::builder("holes")
        .blanks(0.0, 0.0)
        .wells(wells)
        .control(1.0)
        .build();

    let matrix = RawAssayMatrix::from_rows(vec![row]);
    let assembly = assemble(&Normalizer::default().normalize(&matrix));

    assert_eq!(assembly.curves[0].len(), DILUTION_WELLS - 2);
    assert!(assembly.curves[0]
        .points
        .iter()
        .all(|p| p.concentration.is_finite() && p.measured.is_finite()));
}
