use thiserror::Error;

/// Errors produced while estimating MICs
///
/// Only configuration errors cross the batch boundary. Everything else is
/// recorded per compound on the resulting [`crate::mic::Fit`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MicError {
    /// The dilution factor does not describe a decreasing series
    #[error("Dilution factor must be greater than 1.0, got {0}")]
    InvalidDilutionFactor(f64),

    /// The target inhibition fraction is outside (0, 1)
    #[error("Target inhibition fraction must lie in (0, 1), got {0}")]
    InvalidTarget(f64),

    /// An option value is not usable
    #[error("Invalid option: {param} = {value}")]
    InvalidOption { param: String, value: String },

    /// The curve has no finite points
    #[error("Curve '{name}' has no valid points")]
    EmptyCurve { name: String },

    /// Fewer points than model parameters
    #[error("Insufficient data: {n} points, need at least {required}")]
    InsufficientPoints { n: usize, required: usize },

    /// The optimizer did not converge within its budget
    #[error("Fit did not converge: {reason}")]
    NonConvergence { reason: String },

    /// No root could be bracketed or the root finder failed
    #[error("Root not found: {reason}")]
    RootNotFound { reason: String },

    /// A formula was evaluated outside its domain
    #[error("Numerical domain error: {reason}")]
    Domain { reason: String },
}
