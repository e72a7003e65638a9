//! First-order uncertainty propagation through the closed-form MIC
//!
//! ```text
//! MIC = d0i * (s / ((1 - target) - o) - 1)^(1 / n)
//! ```
//!
//! The variance is `gᵀ C g` with `g` the gradient of the formula and `C` the
//! full fitted covariance, so parameter correlations are accounted for.

use nalgebra::Vector4;

use super::types::{Uncertain, UncertaintyRecord};
use crate::error::MicError;
use crate::optimize::HillFit;

/// Closed-form MIC and its gradient in (d0i, n, s, o) order
fn mic_with_gradient(fit: &HillFit, target: f64) -> Result<(f64, Vector4<f64>), MicError> {
    let p = fit.params;
    let q = (1.0 - target) - p.o;
    if q == 0.0 {
        return Err(MicError::Domain {
            reason: "fitted offset equals the target growth".to_string(),
        });
    }

    let base = p.s / q - 1.0;
    if !(base > 0.0) {
        return Err(MicError::Domain {
            reason: format!("fractional power of non-positive base {}", base),
        });
    }

    let exponent = 1.0 / p.n;
    let powered = base.powf(exponent);
    let mic = p.d0i * powered;
    let d_base = p.d0i * exponent * base.powf(exponent - 1.0);

    let gradient = Vector4::new(
        powered,
        -mic * base.ln() / (p.n * p.n),
        d_base / q,
        d_base * p.s / (q * q),
    );

    if !mic.is_finite() {
        return Err(MicError::Domain {
            reason: "MIC formula is not finite".to_string(),
        });
    }
    Ok((mic, gradient))
}

/// Propagate the fitted covariance to the MIC
pub fn mic_uncertainty(fit: &HillFit, target: f64) -> Result<Uncertain, MicError> {
    let (mic, gradient) = mic_with_gradient(fit, target)?;
    let covariance = fit.covariance_matrix();

    let std_dev = if covariance.iter().all(|c| c.is_finite()) {
        let variance = (gradient.transpose() * covariance * gradient)[(0, 0)];
        variance.max(0.0).sqrt()
    } else {
        f64::INFINITY
    };

    Ok(Uncertain::new(mic, std_dev))
}

/// Parameter uncertainties plus the MIC uncertainty when it is defined
///
/// The error explains why the MIC uncertainty is missing; the record is
/// returned either way.
pub fn propagate(fit: &HillFit, target: f64) -> (UncertaintyRecord, Option<MicError>) {
    let p = fit.params;
    let sd = fit.std_devs();
    let (mic, error) = match mic_uncertainty(fit, target) {
        Ok(u) => (Some(u), None),
        Err(e) => (None, Some(e)),
    };

    (
        UncertaintyRecord {
            d0i: Uncertain::new(p.d0i, sd[0]),
            n: Uncertain::new(p.n, sd[1]),
            s: Uncertain::new(p.s, sd[2]),
            o: Uncertain::new(p.o, sd[3]),
            mic,
        },
        error,
    )
}
