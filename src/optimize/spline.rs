//! Interpolating cubic spline
//!
//! Not-a-knot end conditions are used from four knots upwards (the third
//! derivative is continuous across the second and the penultimate knot).
//! Three knots fall back to natural end conditions and two knots reduce to a
//! straight line.

use nalgebra::{DMatrix, DVector};

use crate::error::MicError;

/// Cubic spline through a set of strictly increasing knots
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot
    moments: Vec<f64>,
}

impl CubicSpline {
    /// Interpolate through `(x, y)` pairs sorted by strictly increasing `x`
    pub fn interpolate(xs: &[f64], ys: &[f64]) -> Result<Self, MicError> {
        let n = xs.len();
        if n != ys.len() {
            return Err(MicError::InvalidOption {
                param: "spline.knots".to_string(),
                value: format!("{} x values for {} y values", n, ys.len()),
            });
        }
        if n < 2 {
            return Err(MicError::InsufficientPoints { n, required: 2 });
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(MicError::InvalidOption {
                param: "spline.knots".to_string(),
                value: "x values must be strictly increasing".to_string(),
            });
        }

        let moments = if n == 2 {
            vec![0.0, 0.0]
        } else {
            solve_moments(xs, ys)?
        };

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            moments,
        })
    }

    pub fn min_x(&self) -> f64 {
        self.xs[0]
    }

    pub fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Evaluate the spline, extrapolating with the end polynomials
    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.xs.len() - 2;
        let i = match self.xs.partition_point(|&knot| knot <= x) {
            0 => 0,
            k => (k - 1).min(last),
        };

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

fn solve_moments(xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, MicError> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }

    if n >= 4 {
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];

        let k = n - 1;
        a[(k, k - 2)] = h[k - 1];
        a[(k, k - 1)] = -(h[k - 2] + h[k - 1]);
        a[(k, k)] = h[k - 2];
    } else {
        a[(0, 0)] = 1.0;
        a[(n - 1, n - 1)] = 1.0;
    }

    a.lu()
        .solve(&rhs)
        .map(|m| m.iter().copied().collect())
        .ok_or_else(|| MicError::Domain {
            reason: "spline system is singular".to_string(),
        })
}
