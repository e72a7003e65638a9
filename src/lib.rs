pub mod data;
pub mod error;
pub mod mic;
pub mod optimize;

pub use crate::data::*;
pub use crate::mic::*;
pub use crate::optimize::{DoseResponseFitter, FitOptions, Hill4Params, HillFit, ParameterBounds};
pub use error::MicError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            assemble, dilution_series, AssayRow, CurvePoint, CurveRecord, NormalizedMatrix,
            Normalizer, RawAssayMatrix,
        };
    }
    pub mod optimize {
        pub use crate::optimize::{
            hill_4p, CubicSpline, DoseResponseFitter, FitOptions, Hill4Params, HillFit,
            ParameterBounds,
        };
    }

    pub use crate::data::{AssayRow, CurvePoint, CurveRecord, RawAssayMatrix};
    pub use crate::error::MicError;
    pub use crate::mic::{
        Fit, FitSummary, FitType, Issue, MicAnalysis, MicConcentration, MicOptions, MicQuality,
        MicResult, SolverOptions, Uncertain, UncertaintyRecord,
    };
    pub use crate::optimize::{FitOptions, Hill4Params};
}
