//! MIC types: options, per-compound results and export summaries
//!
//! This module defines all public types for MIC estimation including:
//! - [`MicOptions`]: Configuration options
//! - [`Fit`]: Complete per-compound result
//! - [`MicResult`], [`MicQuality`], [`MicConcentration`]: The MIC estimate itself
//! - [`UncertaintyRecord`]: Parameter and MIC uncertainties

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::data::CurveRecord;
use crate::error::MicError;
use crate::optimize::{FitOptions, Hill4Params, HillFit};

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete MIC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicOptions {
    /// Target inhibition fraction, 0.9 for MIC90 (default: 0.9)
    pub target: f64,

    /// Ratio between two consecutive wells of the dilution series (default: 2.0)
    pub dilution_factor: f64,

    /// Least-squares options for the Hill 4-parameter fit
    pub fit: FitOptions,

    /// Root finding and interpolation options
    pub solver: SolverOptions,

    /// Fit compounds on the rayon thread pool (default: true)
    pub parallel: bool,
}

impl Default for MicOptions {
    fn default() -> Self {
        Self {
            target: 0.9,
            dilution_factor: 2.0,
            fit: FitOptions::default(),
            solver: SolverOptions::default(),
            parallel: true,
        }
    }
}

impl MicOptions {
    /// MIC90 with a two-fold dilution series
    pub fn mic90() -> Self {
        Self::default()
    }

    /// MIC50 with a two-fold dilution series
    pub fn mic50() -> Self {
        Self {
            target: 0.5,
            ..Default::default()
        }
    }

    /// Set the target inhibition fraction
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = target;
        self
    }

    /// Set the target as a percentage, `90` for MIC90
    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.target = f64::from(percentage) / 100.0;
        self
    }

    /// Set the dilution factor
    pub fn with_dilution_factor(mut self, dilution_factor: f64) -> Self {
        self.dilution_factor = dilution_factor;
        self
    }

    /// Set the fit options
    pub fn with_fit(mut self, fit: FitOptions) -> Self {
        self.fit = fit;
        self
    }

    /// Set the solver options
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Run compounds sequentially
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Growth fraction the MIC is solved for, `1 - target`
    pub fn target_growth(&self) -> f64 {
        1.0 - self.target
    }

    /// Check every option before any compound is processed
    pub fn validate(&self) -> Result<(), MicError> {
        if !(self.target > 0.0 && self.target < 1.0) {
            return Err(MicError::InvalidTarget(self.target));
        }
        if !(self.dilution_factor.is_finite() && self.dilution_factor > 1.0) {
            return Err(MicError::InvalidDilutionFactor(self.dilution_factor));
        }
        self.fit.validate()?;
        self.solver.validate()
    }
}

/// MIC root finding options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Points of the dense curve used to seed the root search (default: 1000)
    pub grid_points: usize,
    /// Absolute tolerance of the Brent solver (default: 1e-10)
    pub tolerance: f64,
    /// Iteration budget of the Brent solver (default: 100)
    pub max_iterations: u64,
    /// Bracket doublings attempted on each side of the seed (default: 64)
    pub max_bracket_expansions: usize,
    /// Largest distance between the lowest measured growth and the target
    /// growth for which a spline estimate is accepted (default: 0.01)
    pub interpolation_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            grid_points: 1000,
            tolerance: 1e-10,
            max_iterations: 100,
            max_bracket_expansions: 64,
            interpolation_tolerance: 0.01,
        }
    }
}

impl SolverOptions {
    fn validate(&self) -> Result<(), MicError> {
        if self.grid_points < 2 {
            return Err(MicError::InvalidOption {
                param: "solver.grid_points".to_string(),
                value: self.grid_points.to_string(),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MicError::InvalidOption {
                param: "solver.tolerance".to_string(),
                value: self.tolerance.to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(MicError::InvalidOption {
                param: "solver.max_iterations".to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_bracket_expansions == 0 {
            return Err(MicError::InvalidOption {
                param: "solver.max_bracket_expansions".to_string(),
                value: "0".to_string(),
            });
        }
        if !(self.interpolation_tolerance.is_finite() && self.interpolation_tolerance >= 0.0) {
            return Err(MicError::InvalidOption {
                param: "solver.interpolation_tolerance".to_string(),
                value: self.interpolation_tolerance.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Classification Types
// ============================================================================

/// Whether the Hill model converged for a compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitType {
    Fitted,
    NotFitted,
}

impl fmt::Display for FitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitType::Fitted => write!(f, "Fitted"),
            FitType::NotFitted => write!(f, "Not fitted"),
        }
    }
}

/// How trustworthy an MIC estimate is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MicQuality {
    #[default]
    NotDetermined,
    Ok,
    /// Reserved, never assigned by the classifier
    Poor,
    OverMeasuredRange,
    UnderMeasuredRange,
    EstimatedFromInterpolation,
    OverMeasuredRangeNotFitted,
}

impl fmt::Display for MicQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MicQuality::NotDetermined => "Not determined",
            MicQuality::Ok => "Ok",
            MicQuality::Poor => "Poor",
            MicQuality::OverMeasuredRange => "Over measured range",
            MicQuality::UnderMeasuredRange => "Under measured range",
            MicQuality::EstimatedFromInterpolation => "Estimated from interpolation",
            MicQuality::OverMeasuredRangeNotFitted => "Over measured range, not fitted",
        };
        write!(f, "{}", label)
    }
}

/// The reported MIC concentration
///
/// Either a solved value, or a bound when the crossing lies outside the
/// measured range. Bounds carry the growth percentage observed at the
/// boundary concentration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MicConcentration {
    Value(f64),
    /// MIC above the highest tested concentration
    Above { concentration: f64, growth_pct: f64 },
    /// MIC below the lowest tested concentration
    Below { concentration: f64, growth_pct: f64 },
}

impl MicConcentration {
    pub fn value(&self) -> Option<f64> {
        match self {
            MicConcentration::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, MicConcentration::Value(_))
    }
}

/// Percentages beyond this magnitude are printed in scientific notation
const PLAIN_PERCENT_LIMIT: f64 = 1e6;

struct Percent(f64);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.abs() < PLAIN_PERCENT_LIMIT || !self.0.is_finite() {
            write!(f, "{:.0}%", self.0)
        } else {
            write!(f, "{:.1e}%", self.0)
        }
    }
}

impl fmt::Display for MicConcentration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MicConcentration::Value(v) => write!(f, "{}", v),
            MicConcentration::Above {
                concentration,
                growth_pct,
            } => write!(f, "> {} ({})", concentration, Percent(*growth_pct)),
            MicConcentration::Below {
                concentration,
                growth_pct,
            } => write!(f, "< {} ({})", concentration, Percent(*growth_pct)),
        }
    }
}

/// Numbers stay numbers, bounds become their display string
impl Serialize for MicConcentration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MicConcentration::Value(v) => serializer.serialize_f64(*v),
            bound => serializer.collect_str(bound),
        }
    }
}

/// An MIC estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicResult {
    /// `None` when no estimate could be made
    pub concentration: Option<MicConcentration>,
    /// Target inhibition fraction
    pub percentage: f64,
    pub quality: MicQuality,
}

// ============================================================================
// Uncertainty Types
// ============================================================================

/// A value with its standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uncertain {
    pub value: f64,
    pub std_dev: f64,
}

impl Uncertain {
    pub fn new(value: f64, std_dev: f64) -> Self {
        Self { value, std_dev }
    }
}

impl fmt::Display for Uncertain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+/-{}", self.value, self.std_dev)
    }
}

/// Parameter uncertainties and the propagated MIC uncertainty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRecord {
    pub d0i: Uncertain,
    pub n: Uncertain,
    pub s: Uncertain,
    pub o: Uncertain,
    /// `None` when the MIC formula is not defined for the fitted parameters
    pub mic: Option<Uncertain>,
}

// ============================================================================
// Result Types
// ============================================================================

/// Per-compound conditions worth reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Issue {
    /// No finite point survived normalization
    EmptyCurve,
    /// Fewer points than model parameters
    InsufficientPoints { n: usize, required: usize },
    /// The least-squares fit did not converge
    NotConverged { reason: String },
    /// The fitted model gave no acceptable root
    RootRejected { reason: String },
    /// The spline fallback gave no root
    InterpolationFailed { reason: String },
    /// The MIC formula could not be evaluated for uncertainty propagation
    UncertaintyUnavailable { reason: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::EmptyCurve => write!(f, "Curve has no valid points"),
            Issue::InsufficientPoints { n, required } => {
                write!(f, "Only {} points, at least {} required", n, required)
            }
            Issue::NotConverged { reason } => write!(f, "Fit did not converge: {}", reason),
            Issue::RootRejected { reason } => write!(f, "Model root rejected: {}", reason),
            Issue::InterpolationFailed { reason } => {
                write!(f, "Interpolation failed: {}", reason)
            }
            Issue::UncertaintyUnavailable { reason } => {
                write!(f, "Uncertainty unavailable: {}", reason)
            }
        }
    }
}

impl From<MicError> for Issue {
    fn from(error: MicError) -> Self {
        match error {
            MicError::EmptyCurve { .. } => Issue::EmptyCurve,
            MicError::InsufficientPoints { n, required } => {
                Issue::InsufficientPoints { n, required }
            }
            other => Issue::NotConverged {
                reason: other.to_string(),
            },
        }
    }
}

/// Complete result for one compound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fit {
    /// Curve the result was computed from
    pub curve: CurveRecord,
    pub fit_type: FitType,
    /// Hill 4-parameter fit, if it converged
    pub model: Option<HillFit>,
    pub mic: MicResult,
    /// Parameter uncertainties, if the model converged
    pub uncertainty: Option<UncertaintyRecord>,
    /// Conditions encountered while processing this compound
    pub issues: Vec<Issue>,
}

impl Fit {
    pub fn name(&self) -> &str {
        &self.curve.name
    }

    pub fn params(&self) -> Option<Hill4Params> {
        self.model.as_ref().map(|m| m.params)
    }

    /// Fitted model sampled over the measured concentration range
    pub fn fitted_curve(&self, points: usize) -> Option<Vec<(f64, f64)>> {
        let model = self.model.as_ref()?;
        let min = self.curve.min_concentration()?;
        let max = self.curve.max_concentration()?;
        Some(model.sample(min, max, points))
    }

    /// Flatten to a single export row
    pub fn summary(&self) -> FitSummary {
        let params = self.params();
        FitSummary {
            name: self.curve.name.clone(),
            initial_concentration: self.curve.max_concentration(),
            type_of_fit: self.fit_type.to_string(),
            mic_percentage: (self.mic.percentage * 100.0).round() as u32,
            mic_concentration: self
                .mic
                .concentration
                .map(|c| c.to_string())
                .unwrap_or_else(|| "None".to_string()),
            mic_quality: self.mic.quality.to_string(),
            mic_uncertainty: self
                .uncertainty
                .as_ref()
                .and_then(|u| u.mic)
                .map(|u| u.to_string())
                .unwrap_or_else(|| "None".to_string()),
            hill4p_d0i: params.map(|p| p.d0i),
            hill4p_n: params.map(|p| p.n),
            hill4p_s: params.map(|p| p.s),
            hill4p_o: params.map(|p| p.o),
        }
    }
}

/// One export row per compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub name: String,
    /// Highest concentration of the curve
    pub initial_concentration: Option<f64>,
    pub type_of_fit: String,
    pub mic_percentage: u32,
    pub mic_concentration: String,
    pub mic_quality: String,
    pub mic_uncertainty: String,
    pub hill4p_d0i: Option<f64>,
    pub hill4p_n: Option<f64>,
    pub hill4p_s: Option<f64>,
    pub hill4p_o: Option<f64>,
}
