//! Minimum Inhibitory Concentration (MIC) estimation
//!
//! This module turns serially diluted growth assays into MIC estimates. For
//! each compound it fits a Hill 4-parameter dose-response curve, solves for
//! the concentration at which growth drops to `1 - target`, classifies how
//! trustworthy that estimate is and propagates the fit uncertainty.
//!
//! # Pipeline
//!
//! | Step | Module |
//! |------|--------|
//! | Blank subtraction, control scaling, dilution series | [`crate::data::normalize`] |
//! | Replicate grouping by compound name | [`crate::data::curve`] |
//! | Bounded Hill 4p least squares | [`crate::optimize::hill`] |
//! | Model root, spline fallback | [`solve`] |
//! | Quality decision table | [`quality`] |
//! | First-order uncertainty propagation | [`uncertainty`] |
//!
//! # Usage
//!
//! ```rust
//! use micfit::prelude::*;
//!
//! let growth = [0.02, 0.05, 0.3, 0.7, 0.9, 0.95, 0.97, 0.98, 0.99];
//! let row = AssayRow::builder("compound_a")
//!     .blanks(0.0, 0.0)
//!     .wells(growth)
//!     .control(1.0)
//!     .initial_concentration(64.0)
//!     .build();
//! let matrix = RawAssayMatrix::from_rows(vec![row]);
//!
//! let fits = matrix.mic(&MicOptions::mic90()).unwrap();
//! assert_eq!(fits.len(), 1);
//! assert_eq!(fits[0].fit_type, FitType::Fitted);
//! assert_eq!(fits[0].mic.quality, MicQuality::Ok);
//! ```

mod analyze;
pub mod quality;
pub mod solve;
mod traits;
mod types;
pub mod uncertainty;


pub use analyze::{analyze, analyze_curve, analyze_curves};
pub use quality::{classify, Evidence, Verdict};
pub use solve::{MicSolver, ModelRoot};
pub use traits::MicAnalysis;
pub use types::{
    Fit, FitSummary, FitType, Issue, MicConcentration, MicOptions, MicQuality, MicResult,
    SolverOptions, Uncertain, UncertaintyRecord,
};
pub use uncertainty::{mic_uncertainty, propagate};
