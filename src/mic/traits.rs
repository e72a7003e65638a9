//! Extension traits for MIC estimation on assay data types
//!
//! ```rust,ignore
//! use micfit::prelude::*;
//!
//! let fits = matrix.mic(&MicOptions::mic90())?;
//! ```

use super::analyze::{analyze, analyze_curve, analyze_curves};
use super::types::{Fit, FitSummary, MicOptions};
use crate::data::{CurveRecord, RawAssayMatrix};
use crate::error::MicError;

/// MIC estimation for a batch of compounds
pub trait MicAnalysis {
    /// One [`Fit`] per compound
    fn mic(&self, options: &MicOptions) -> Result<Vec<Fit>, MicError>;

    /// One flat export row per compound
    fn mic_summary(&self, options: &MicOptions) -> Result<Vec<FitSummary>, MicError> {
        Ok(self.mic(options)?.iter().map(Fit::summary).collect())
    }
}

impl MicAnalysis for RawAssayMatrix {
    fn mic(&self, options: &MicOptions) -> Result<Vec<Fit>, MicError> {
        analyze(self, options)
    }
}

impl MicAnalysis for [CurveRecord] {
    fn mic(&self, options: &MicOptions) -> Result<Vec<Fit>, MicError> {
        analyze_curves(self, options)
    }
}

impl MicAnalysis for CurveRecord {
    fn mic(&self, options: &MicOptions) -> Result<Vec<Fit>, MicError> {
        options.validate()?;
        Ok(vec![analyze_curve(self, options)])
    }
}
