//! Per-compound MIC pipeline and batch driver
//!
//! Each compound goes through fit → model root → (spline root) →
//! classification → uncertainty without looking at any other compound, so
//! the batch is a plain map over curves. Failures stay on the compound's
//! [`Fit`] record; only invalid options abort a batch.

use rayon::prelude::*;

use super::quality::{classify, Evidence};
use super::solve::MicSolver;
use super::types::*;
use super::uncertainty::propagate;
use crate::data::{assemble, CurveRecord, Normalizer, RawAssayMatrix};
use crate::error::MicError;
use crate::optimize::DoseResponseFitter;

/// Estimate the MIC of every compound in `matrix`
///
/// Returns one [`Fit`] per distinct compound name, in first appearance
/// order. Compounds whose rows held no finite point are reported as
/// not fitted with [`Issue::EmptyCurve`].
pub fn analyze(matrix: &RawAssayMatrix, options: &MicOptions) -> Result<Vec<Fit>, MicError> {
    options.validate()?;

    let normalized = Normalizer::new(options.dilution_factor)?.normalize(matrix);
    let assembly = assemble(&normalized);

    let mut fits = analyze_curves(&assembly.curves, options)?;
    fits.extend(
        assembly
            .skipped
            .into_iter()
            .map(|name| empty_curve(name, options)),
    );

    // Restore first appearance order across fitted and skipped compounds
    let order = matrix.names();
    fits.sort_by_key(|fit| order.iter().position(|name| *name == fit.name()));

    tracing::debug!(compounds = fits.len(), "MIC batch finished");
    Ok(fits)
}

/// Estimate the MIC of already assembled curves, preserving their order
pub fn analyze_curves(curves: &[CurveRecord], options: &MicOptions) -> Result<Vec<Fit>, MicError> {
    options.validate()?;

    let fits = if options.parallel {
        curves
            .par_iter()
            .map(|curve| analyze_curve(curve, options))
            .collect()
    } else {
        curves
            .iter()
            .map(|curve| analyze_curve(curve, options))
            .collect()
    };
    Ok(fits)
}

/// Estimate the MIC of a single curve
///
/// Options are assumed valid; see [`MicOptions::validate`].
pub fn analyze_curve(curve: &CurveRecord, options: &MicOptions) -> Fit {
    let target_growth = options.target_growth();
    let mut issues = Vec::new();

    let model = match DoseResponseFitter::new(&options.fit).fit(curve) {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::debug!(name = %curve.name, error = %e, "Compound not fitted");
            issues.push(Issue::from(e));
            None
        }
    };

    let fit_type = if model.is_some() {
        FitType::Fitted
    } else {
        FitType::NotFitted
    };
    let mut evidence = Evidence::from_curve(curve, fit_type, target_growth);
    evidence.interpolation_tolerance = options.solver.interpolation_tolerance;

    if let Some(model) = &model {
        let solver = MicSolver::new(&options.solver, target_growth);
        let primary = solver.solve_model(model, curve);
        evidence.model_root = primary.root;
        evidence.model_accepted = primary.accepted;

        if !primary.accepted {
            if let Some(reason) = primary.rejection {
                tracing::debug!(name = %curve.name, reason = %reason, "Model root rejected");
                issues.push(Issue::RootRejected { reason });
            }
            match solver.solve_interpolated(curve, primary.seed) {
                Ok(root) => evidence.interpolated_root = Some(root),
                Err(e) => issues.push(Issue::InterpolationFailed {
                    reason: e.to_string(),
                }),
            }
        }
    }

    let verdict = classify(&evidence);

    let uncertainty = model.as_ref().map(|model| {
        let (record, error) = propagate(model, options.target);
        if let Some(e) = error {
            tracing::debug!(name = %curve.name, error = %e, "MIC uncertainty unavailable");
            issues.push(Issue::UncertaintyUnavailable {
                reason: e.to_string(),
            });
        }
        record
    });

    Fit {
        curve: curve.clone(),
        fit_type,
        model,
        mic: MicResult {
            concentration: verdict.concentration,
            percentage: options.target,
            quality: verdict.quality,
        },
        uncertainty,
        issues,
    }
}

fn empty_curve(name: String, options: &MicOptions) -> Fit {
    Fit {
        curve: CurveRecord::new(name, Vec::new()),
        fit_type: FitType::NotFitted,
        model: None,
        mic: MicResult {
            concentration: None,
            percentage: options.target,
            quality: MicQuality::NotDetermined,
        },
        uncertainty: None,
        issues: vec![Issue::EmptyCurve],
    }
}
