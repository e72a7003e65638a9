//! Hill 4-parameter dose-response model and its bounded least-squares fit
//!
//! ```text
//! f(x; d0i, n, s, o) = o + s / (1 + (x / d0i)^n)
//! ```
//!
//! The fit is a projected Levenberg-Marquardt iteration: each damped
//! Gauss-Newton step is clipped back into the parameter box. It stops on the
//! usual relative cost, step and projected-gradient tolerances, and reports
//! non-convergence when the iteration budget runs out.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use crate::data::CurveRecord;
use crate::error::MicError;

/// Number of free parameters in the model
pub const HILL_PARAMETERS: usize = 4;

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;
const DAMPING_FLOOR: f64 = 1e-12;
/// Damping increases tried within one outer iteration before giving up
const MAX_DAMPING_INCREASES: usize = 64;

/// Evaluate the Hill 4-parameter model
#[inline]
pub fn hill_4p(x: f64, d0i: f64, n: f64, s: f64, o: f64) -> f64 {
    o + s / (1.0 + (x / d0i).powf(n))
}

/// Parameters of the Hill 4-parameter model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hill4Params {
    /// Inflection concentration
    pub d0i: f64,
    /// Slope
    pub n: f64,
    /// Span
    pub s: f64,
    /// Offset (lower asymptote)
    pub o: f64,
}

impl Hill4Params {
    pub fn new(d0i: f64, n: f64, s: f64, o: f64) -> Self {
        Self { d0i, n, s, o }
    }

    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        hill_4p(x, self.d0i, self.n, self.s, self.o)
    }

    /// Partial derivatives of the model at `x`, in (d0i, n, s, o) order
    fn gradient(&self, x: f64) -> Vector4<f64> {
        let ratio = x / self.d0i;
        let r = ratio.powf(self.n);
        let denom = 1.0 + r;
        let denom2 = denom * denom;
        Vector4::new(
            self.s * self.n * r / (self.d0i * denom2),
            -self.s * r * ratio.ln() / denom2,
            1.0 / denom,
            1.0,
        )
    }

    fn to_vector(self) -> Vector4<f64> {
        Vector4::new(self.d0i, self.n, self.s, self.o)
    }

    fn from_vector(v: &Vector4<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn to_array(self) -> [f64; HILL_PARAMETERS] {
        [self.d0i, self.n, self.s, self.o]
    }
}

/// Box constraints on (n, s, o)
///
/// The inflection concentration is always bounded by the measured
/// concentration range of the curve being fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub n: (f64, f64),
    pub s: (f64, f64),
    pub o: (f64, f64),
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            n: (0.01, 6.0),
            s: (0.1, 4.0),
            o: (0.01, 1.0),
        }
    }
}

impl ParameterBounds {
    fn to_box(self, min_x: f64, max_x: f64) -> (Vector4<f64>, Vector4<f64>) {
        (
            Vector4::new(min_x, self.n.0, self.s.0, self.o.0),
            Vector4::new(max_x, self.n.1, self.s.1, self.o.1),
        )
    }

    fn is_valid(&self) -> bool {
        [self.n, self.s, self.o]
            .iter()
            .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo <= hi)
            && self.n.0 > 0.0
    }
}

/// Least-squares fitting options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    /// Parameter box (default: n ∈ [0.01, 6], s ∈ [0.1, 4], o ∈ [0.01, 1])
    pub bounds: ParameterBounds,
    /// Maximum number of accepted or rejected outer iterations (default: 400)
    pub max_iterations: usize,
    /// Relative cost reduction tolerance (default: 1e-8)
    pub ftol: f64,
    /// Relative step tolerance (default: 1e-8)
    pub xtol: f64,
    /// Projected gradient tolerance (default: 1e-8)
    pub gtol: f64,
    /// Starting Levenberg-Marquardt damping (default: 1e-3)
    pub initial_damping: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            bounds: ParameterBounds::default(),
            max_iterations: 400,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_damping: 1e-3,
        }
    }
}

impl FitOptions {
    pub(crate) fn validate(&self) -> Result<(), MicError> {
        if !self.bounds.is_valid() {
            return Err(MicError::InvalidOption {
                param: "fit.bounds".to_string(),
                value: format!("{:?}", self.bounds),
            });
        }
        if self.max_iterations == 0 {
            return Err(MicError::InvalidOption {
                param: "fit.max_iterations".to_string(),
                value: "0".to_string(),
            });
        }
        if !(self.initial_damping.is_finite() && self.initial_damping > 0.0) {
            return Err(MicError::InvalidOption {
                param: "fit.initial_damping".to_string(),
                value: self.initial_damping.to_string(),
            });
        }
        for (param, value) in [
            ("fit.ftol", self.ftol),
            ("fit.xtol", self.xtol),
            ("fit.gtol", self.gtol),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MicError::InvalidOption {
                    param: param.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A converged Hill 4-parameter fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HillFit {
    pub params: Hill4Params,
    /// Parameter covariance in (d0i, n, s, o) order
    ///
    /// Scaled by the residual variance. Infinite when the curve has exactly
    /// as many points as parameters.
    pub covariance: [[f64; HILL_PARAMETERS]; HILL_PARAMETERS],
    /// Sum of squared residuals at the solution
    pub sse: f64,
    /// Number of points the fit used
    pub n_points: usize,
    /// Outer iterations performed
    pub iterations: usize,
}

impl HillFit {
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.params.evaluate(x)
    }

    pub fn covariance_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|i, j| self.covariance[i][j])
    }

    /// Square roots of the covariance diagonal
    pub fn std_devs(&self) -> [f64; HILL_PARAMETERS] {
        std::array::from_fn(|i| self.covariance[i][i].sqrt())
    }

    /// Sample the fitted curve at `points` evenly spaced concentrations
    pub fn sample(&self, min: f64, max: f64, points: usize) -> Vec<(f64, f64)> {
        linspace(min, max, points)
            .into_iter()
            .map(|x| (x, self.evaluate(x)))
            .collect()
    }
}

/// `points` evenly spaced values from `start` to `end` inclusive
pub(crate) fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Bounded nonlinear least-squares fitter for [`Hill4Params`]
#[derive(Debug, Clone)]
pub struct DoseResponseFitter<'a> {
    options: &'a FitOptions,
}

impl<'a> DoseResponseFitter<'a> {
    pub fn new(options: &'a FitOptions) -> Self {
        Self { options }
    }

    /// Fit the model to the finite points of `curve`
    pub fn fit(&self, curve: &CurveRecord) -> Result<HillFit, MicError> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = curve
            .points
            .iter()
            .filter(|p| {
                p.concentration.is_finite() && p.concentration > 0.0 && p.measured.is_finite()
            })
            .map(|p| (p.concentration, p.measured))
            .unzip();

        if xs.is_empty() {
            return Err(MicError::EmptyCurve {
                name: curve.name.clone(),
            });
        }
        if xs.len() < HILL_PARAMETERS {
            return Err(MicError::InsufficientPoints {
                n: xs.len(),
                required: HILL_PARAMETERS,
            });
        }

        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (lower, upper) = self.options.bounds.to_box(min_x, max_x);

        let mut p = clamp(
            &initial_guess(curve, min_x, max_x).to_vector(),
            &lower,
            &upper,
        );
        let mut cost = sse(&xs, &ys, &p);
        if !cost.is_finite() {
            return Err(MicError::NonConvergence {
                reason: "non-finite residuals at the initial guess".to_string(),
            });
        }

        let mut damping = self.options.initial_damping;

        for iteration in 1..=self.options.max_iterations {
            let (jtj, jtr) = normal_equations(&xs, &ys, &p);

            if projected_gradient_norm(&p, &jtr, &lower, &upper) <= self.options.gtol {
                return Ok(self.finish(&xs, &ys, p, cost, iteration));
            }

            let mut increases = 0;
            loop {
                if increases > MAX_DAMPING_INCREASES || !(damping > 0.0) {
                    return Err(MicError::NonConvergence {
                        reason: format!(
                            "no acceptable step at iteration {} (damping {})",
                            iteration, damping
                        ),
                    });
                }
                increases += 1;

                let mut damped = jtj;
                for k in 0..HILL_PARAMETERS {
                    damped[(k, k)] += damping * jtj[(k, k)].max(DAMPING_FLOOR);
                }

                let Some(step) = damped.cholesky().map(|chol| chol.solve(&jtr)) else {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        return Err(MicError::NonConvergence {
                            reason: "normal equations are singular".to_string(),
                        });
                    }
                    continue;
                };

                let candidate = clamp(&(p + step), &lower, &upper);
                let moved = (candidate - p).norm();
                let small_step = moved <= self.options.xtol * (self.options.xtol + p.norm());
                let candidate_cost = sse(&xs, &ys, &candidate);

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let reduction = cost - candidate_cost;
                    let previous = cost;
                    p = candidate;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(MIN_DAMPING);

                    if small_step || reduction <= self.options.ftol * previous {
                        return Ok(self.finish(&xs, &ys, p, cost, iteration));
                    }
                    break;
                }

                if small_step {
                    // Neither the step nor a stronger damping can improve the cost
                    return Ok(self.finish(&xs, &ys, p, cost, iteration));
                }

                damping *= 10.0;
                if damping > MAX_DAMPING {
                    return Err(MicError::NonConvergence {
                        reason: format!("damping diverged after {} iterations", iteration),
                    });
                }
            }
        }

        Err(MicError::NonConvergence {
            reason: format!(
                "maximum number of iterations ({}) reached",
                self.options.max_iterations
            ),
        })
    }

    fn finish(
        &self,
        xs: &[f64],
        ys: &[f64],
        p: Vector4<f64>,
        sse: f64,
        iterations: usize,
    ) -> HillFit {
        let (jtj, _) = normal_equations(xs, ys, &p);
        let dof = xs.len().saturating_sub(HILL_PARAMETERS);

        let covariance = if dof == 0 {
            Matrix4::from_element(f64::INFINITY)
        } else {
            let svd = jtj.svd(true, true);
            let tol = f64::EPSILON * HILL_PARAMETERS as f64 * svd.singular_values.max();
            match svd.pseudo_inverse(tol) {
                Ok(inverse) => inverse * (sse / dof as f64),
                Err(reason) => {
                    tracing::debug!(reason, "Covariance could not be estimated");
                    Matrix4::from_element(f64::INFINITY)
                }
            }
        };

        tracing::debug!(iterations, sse, "Hill 4p fit converged");

        HillFit {
            params: Hill4Params::from_vector(&p),
            covariance: std::array::from_fn(|i| std::array::from_fn(|j| covariance[(i, j)])),
            sse,
            n_points: xs.len(),
            iterations,
        }
    }
}

fn sse(xs: &[f64], ys: &[f64], p: &Vector4<f64>) -> f64 {
    let params = Hill4Params::from_vector(p);
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - params.evaluate(x);
            r * r
        })
        .sum()
}

/// JᵀJ and Jᵀr for residuals r = y - f(x)
fn normal_equations(xs: &[f64], ys: &[f64], p: &Vector4<f64>) -> (Matrix4<f64>, Vector4<f64>) {
    let params = Hill4Params::from_vector(p);
    let mut jtj = Matrix4::zeros();
    let mut jtr = Vector4::zeros();
    for (&x, &y) in xs.iter().zip(ys) {
        let g = params.gradient(x);
        jtj += g * g.transpose();
        jtr += g * (y - params.evaluate(x));
    }
    (jtj, jtr)
}

fn clamp(p: &Vector4<f64>, lower: &Vector4<f64>, upper: &Vector4<f64>) -> Vector4<f64> {
    Vector4::from_fn(|k, _| p[k].clamp(lower[k], upper[k]))
}

/// Largest descent component that is not blocked by an active bound
fn projected_gradient_norm(
    p: &Vector4<f64>,
    descent: &Vector4<f64>,
    lower: &Vector4<f64>,
    upper: &Vector4<f64>,
) -> f64 {
    (0..HILL_PARAMETERS)
        .map(|k| {
            let blocked = (p[k] <= lower[k] && descent[k] < 0.0)
                || (p[k] >= upper[k] && descent[k] > 0.0);
            if blocked {
                0.0
            } else {
                descent[k].abs()
            }
        })
        .fold(0.0, f64::max)
}

/// Starting point read off the data: plateaus for offset and span, the
/// log-interpolated half-growth crossing for the inflection, unit slope
fn initial_guess(curve: &CurveRecord, min_x: f64, max_x: f64) -> Hill4Params {
    let averaged = curve.averaged();
    let (low, high) = averaged
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.measured), hi.max(p.measured))
        });
    let half = (low + high) / 2.0;

    let d0i = averaged
        .windows(2)
        .find(|w| w[0].measured >= half && w[1].measured < half)
        .map(|w| {
            let (x0, x1) = (w[0].concentration.ln(), w[1].concentration.ln());
            let t = (w[0].measured - half) / (w[0].measured - w[1].measured);
            (x0 + t * (x1 - x0)).exp()
        })
        .unwrap_or_else(|| (min_x * max_x).sqrt());

    Hill4Params::new(d0i, 1.0, high - low, low)
}
