//! Numerical building blocks: the Hill model fit, scalar root finding and
//! cubic spline interpolation

pub mod hill;
pub mod root;
pub mod spline;

pub use hill::{
    hill_4p, DoseResponseFitter, FitOptions, Hill4Params, HillFit, ParameterBounds,
    HILL_PARAMETERS,
};
pub use root::{bracket_on_grid, bracket_positive, brent_root, Root};
pub use spline::CubicSpline;
