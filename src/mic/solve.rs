//! MIC root finding
//!
//! The primary path solves `f(x) = 1 - target` on the fitted Hill model. The
//! search is seeded from a dense sampling of the fitted curve over the
//! measured range, bracketed outward from the seed and refined with Brent's
//! method. When the model root is rejected, the same equation is solved on a
//! cubic spline through the replicate-averaged measurements.

use super::types::SolverOptions;
use crate::data::CurveRecord;
use crate::error::MicError;
use crate::optimize::hill::linspace;
use crate::optimize::{bracket_on_grid, bracket_positive, brent_root, CubicSpline, HillFit};

/// Outcome of the model-based root search
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRoot {
    /// Concentration the search started from
    pub seed: f64,
    /// Root estimate, accepted or not
    pub root: Option<f64>,
    /// Whether the root is trusted as an MIC
    pub accepted: bool,
    /// Why the root was rejected
    pub rejection: Option<String>,
}

/// Solves for the concentration at which growth reaches `target_growth`
#[derive(Debug, Clone)]
pub struct MicSolver<'a> {
    options: &'a SolverOptions,
    target_growth: f64,
}

impl<'a> MicSolver<'a> {
    pub fn new(options: &'a SolverOptions, target_growth: f64) -> Self {
        Self {
            options,
            target_growth,
        }
    }

    /// Grid point of `f` whose value is closest to the target growth
    fn seed<F: Fn(f64) -> f64>(&self, f: F, min: f64, max: f64) -> f64 {
        linspace(min, max, self.options.grid_points)
            .into_iter()
            .map(|x| (x, (f(x) - self.target_growth).abs()))
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(x, _)| x)
            .unwrap_or((min * max).sqrt())
    }

    /// Solve on the fitted model
    ///
    /// The root is accepted when Brent's method converged and the lower
    /// asymptote of the model lies below the target growth, so that a
    /// crossing genuinely exists.
    pub fn solve_model(&self, model: &HillFit, curve: &CurveRecord) -> ModelRoot {
        let (Some(min), Some(max)) = (curve.min_concentration(), curve.max_concentration())
        else {
            return ModelRoot {
                seed: f64::NAN,
                root: None,
                accepted: false,
                rejection: Some("curve has no points".to_string()),
            };
        };

        let target = self.target_growth;
        let equation = |x: f64| model.evaluate(x) - target;
        let seed = self.seed(|x| model.evaluate(x), min, max);

        let root = bracket_positive(&equation, seed, self.options.max_bracket_expansions)
            .ok_or_else(|| MicError::RootNotFound {
                reason: format!("no sign change around seed {}", seed),
            })
            .and_then(|(lower, upper)| {
                brent_root(
                    equation,
                    lower,
                    upper,
                    self.options.tolerance,
                    self.options.max_iterations,
                )
            });

        match root {
            Ok(root) => {
                let rejection = if !root.converged {
                    Some(format!(
                        "solver stopped after {} iterations without converging",
                        root.iterations
                    ))
                } else if model.params.o >= target {
                    Some(format!(
                        "fitted minimum {} is not below target growth {}",
                        model.params.o, target
                    ))
                } else {
                    None
                };
                ModelRoot {
                    seed,
                    root: Some(root.x),
                    accepted: rejection.is_none(),
                    rejection,
                }
            }
            Err(e) => ModelRoot {
                seed,
                root: None,
                accepted: false,
                rejection: Some(e.to_string()),
            },
        }
    }

    /// Solve on a cubic spline through the measured points
    ///
    /// Replicates are averaged per concentration first. The root is searched
    /// within the measured range only, starting from the crossing closest
    /// to `seed`.
    pub fn solve_interpolated(&self, curve: &CurveRecord, seed: f64) -> Result<f64, MicError> {
        let averaged = curve.averaged();
        let xs: Vec<f64> = averaged.iter().map(|p| p.concentration).collect();
        let ys: Vec<f64> = averaged.iter().map(|p| p.measured).collect();
        let spline = CubicSpline::interpolate(&xs, &ys)?;

        let target = self.target_growth;
        let equation = |x: f64| spline.evaluate(x) - target;
        let seed = if seed.is_finite() {
            seed
        } else {
            self.seed(|x| spline.evaluate(x), spline.min_x(), spline.max_x())
        };

        let grid = linspace(spline.min_x(), spline.max_x(), self.options.grid_points);
        let (lower, upper) =
            bracket_on_grid(&equation, &grid, seed).ok_or_else(|| MicError::RootNotFound {
                reason: "interpolated curve does not cross the target growth".to_string(),
            })?;

        let root = brent_root(
            equation,
            lower,
            upper,
            self.options.tolerance,
            self.options.max_iterations,
        )?;
        if !root.converged {
            return Err(MicError::RootNotFound {
                reason: format!(
                    "solver stopped after {} iterations without converging",
                    root.iterations
                ),
            });
        }
        Ok(root.x)
    }
}
