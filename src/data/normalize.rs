//! Blank subtraction, control scaling and dilution series
//!
//! Every row is normalized independently:
//!
//! ```text
//! blank         = (blank1 + blank2) / 2
//! growth[i]     = (well[i] - blank) / (control - blank)
//! concentration = initial / dilution_factor^i
//! ```
//!
//! A row whose control equals its blank produces non-finite growth values.
//! They are passed through untouched and dropped later by the curve assembler.

use ndarray::Array2;

use super::row::{AssayRow, RawAssayMatrix, DILUTION_WELLS};
use crate::error::MicError;

/// Concentrations of a dilution series, highest first
///
/// ```rust
/// use micfit::data::dilution_series;
///
/// let series = dilution_series(64.0, 2.0, 4);
/// assert_eq!(series, vec![64.0, 32.0, 16.0, 8.0]);
/// ```
pub fn dilution_series(initial: f64, dilution_factor: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| initial / dilution_factor.powi(i as i32))
        .collect()
}

/// Normalized growth and concentrations, row-aligned with the source matrix
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMatrix {
    /// Fraction of control growth, one row per assay row
    pub growth: Array2<f64>,
    /// Concentration of each well, same shape as `growth`
    pub concentrations: Array2<f64>,
    /// Compound name of each row
    pub names: Vec<String>,
}

impl NormalizedMatrix {
    pub fn nrows(&self) -> usize {
        self.names.len()
    }
}

/// Turns raw plate readings into fractions of control growth
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    dilution_factor: f64,
}

impl Normalizer {
    /// Create a normalizer, rejecting degenerate dilution factors
    pub fn new(dilution_factor: f64) -> Result<Self, MicError> {
        if !(dilution_factor.is_finite() && dilution_factor > 1.0) {
            return Err(MicError::InvalidDilutionFactor(dilution_factor));
        }
        Ok(Self { dilution_factor })
    }

    pub fn dilution_factor(&self) -> f64 {
        self.dilution_factor
    }

    /// Normalize every row of `matrix`
    ///
    /// The input matrix is left untouched.
    pub fn normalize(&self, matrix: &RawAssayMatrix) -> NormalizedMatrix {
        let rows = matrix.rows();

        for row in rows {
            if row.control == row.blank() {
                tracing::warn!(
                    name = %row.name,
                    "Control equals blank, normalized growth is undefined for this row"
                );
            }
        }

        let growth = Array2::from_shape_fn((rows.len(), DILUTION_WELLS), |(r, i)| {
            let row = &rows[r];
            let blank = row.blank();
            (row.wells[i] - blank) / (row.control - blank)
        });

        let initial: Vec<f64> = rows.iter().map(AssayRow::initial_concentration).collect();
        let concentrations = Array2::from_shape_fn((rows.len(), DILUTION_WELLS), |(r, i)| {
            initial[r] / self.dilution_factor.powi(i as i32)
        });

        NormalizedMatrix {
            growth,
            concentrations,
            names: rows.iter().map(|row| row.name.clone()).collect(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            dilution_factor: 2.0,
        }
    }
}
