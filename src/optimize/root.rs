//! Bracketed scalar root finding on top of argmin's Brent solver

use argmin::{
    core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus},
    solver::brent::BrentRoot,
};

use crate::error::MicError;

/// Adapts a closure to argmin's [`CostFunction`]
struct Equation<F> {
    f: F,
}

impl<F: Fn(f64) -> f64> CostFunction for Equation<F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok((self.f)(*x))
    }
}

/// Outcome of a root search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Whether the solver terminated on its own convergence criterion
    pub converged: bool,
    pub iterations: u64,
}

/// Find a root of `f` inside `[lower, upper]`
///
/// `f(lower)` and `f(upper)` must have opposite signs.
pub fn brent_root<F>(
    f: F,
    lower: f64,
    upper: f64,
    tol: f64,
    max_iters: u64,
) -> Result<Root, MicError>
where
    F: Fn(f64) -> f64,
{
    for end in [lower, upper] {
        if f(end) == 0.0 {
            return Ok(Root {
                x: end,
                converged: true,
                iterations: 0,
            });
        }
    }

    let solver = BrentRoot::new(lower, upper, tol);
    let res = Executor::new(Equation { f }, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()
        .map_err(|e| MicError::RootNotFound {
            reason: e.to_string(),
        })?;

    let state = res.state();
    // Brent reports a signed cost, so the latest iterate is the root estimate
    let x = state
        .get_param()
        .or(state.get_best_param())
        .copied()
        .ok_or_else(|| MicError::RootNotFound {
            reason: "solver returned no parameter".to_string(),
        })?;

    Ok(Root {
        x,
        converged: matches!(
            state.get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        ),
        iterations: state.get_iter(),
    })
}

/// Expand a bracket geometrically around `seed` until `f` changes sign
///
/// The search stays on the positive half-line. Returns `None` when no sign
/// change is found within `max_expansions` doublings in each direction.
pub fn bracket_positive<F>(f: &F, seed: f64, max_expansions: usize) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    if !(seed.is_finite() && seed > 0.0) {
        return None;
    }

    let mut lower = seed;
    let mut upper = seed;
    let f_seed = f(seed);
    if f_seed == 0.0 {
        return Some((seed, seed));
    }

    for _ in 0..max_expansions {
        lower /= 2.0;
        upper *= 2.0;

        let f_lower = f(lower);
        if f_lower.is_finite() && f_lower.signum() != f_seed.signum() {
            return Some((lower, lower * 2.0));
        }
        let f_upper = f(upper);
        if f_upper.is_finite() && f_upper.signum() != f_seed.signum() {
            return Some((upper / 2.0, upper));
        }
    }
    None
}

/// Sign change of `f` on the grid closest to `seed`
///
/// Returns the grid interval enclosing the crossing closest to `seed`.
pub fn bracket_on_grid<F>(f: &F, grid: &[f64], seed: f64) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let values: Vec<f64> = grid.iter().map(|&x| f(x)).collect();
    grid.windows(2)
        .zip(values.windows(2))
        .filter(|(_, v)| v[0].is_finite() && v[1].is_finite() && v[0] * v[1] <= 0.0)
        .map(|(x, _)| (x[0], x[1]))
        .min_by(|a, b| {
            let da = distance_to_interval(seed, *a);
            let db = distance_to_interval(seed, *b);
            da.total_cmp(&db)
        })
}

fn distance_to_interval(x: f64, (lo, hi): (f64, f64)) -> f64 {
    if x < lo {
        lo - x
    } else if x > hi {
        x - hi
    } else {
        0.0
    }
}
