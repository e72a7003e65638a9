//! Row representation of a plate-reader export
//!
//! # Example
//!
//! ```rust
//! use micfit::data::{AssayRow, RawAssayMatrix};
//!
//! let row = AssayRow::builder("ciprofloxacin")
//!     .blanks(0.05, 0.05)
//!     .wells([0.05, 0.06, 0.2, 0.6, 0.9, 0.95, 1.0, 1.0, 1.0])
//!     .control(1.05)
//!     .initial_concentration(64.0)
//!     .build();
//!
//! let mut matrix = RawAssayMatrix::new();
//! matrix.push(row);
//! assert_eq!(matrix.len(), 1);
//! ```

use serde::{Deserialize, Serialize};

/// Number of dilution wells on every assay row
pub const DILUTION_WELLS: usize = 9;

/// Initial concentration used when a row carries none
pub const DEFAULT_INITIAL_CONCENTRATION: f64 = 1.0;

/// A single measured replicate
///
/// Column roles are fixed: two blanks, nine dilution wells (highest
/// concentration first), one growth control, the compound name and the
/// initial concentration of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayRow {
    /// First blank well
    pub blank1: f64,
    /// Dilution series readings, well 0 holds the initial concentration
    pub wells: [f64; DILUTION_WELLS],
    /// Growth control well
    pub control: f64,
    /// Second blank well
    pub blank2: f64,
    /// Compound name, rows sharing a name are replicates
    pub name: String,
    /// Concentration of well 0, if the source provided a usable one
    pub initial_concentration: Option<f64>,
}

impl AssayRow {
    /// Create a new builder for constructing an AssayRow
    pub fn builder(name: impl Into<String>) -> AssayRowBuilder {
        AssayRowBuilder::new(name)
    }

    /// Mean of the two blank wells
    pub fn blank(&self) -> f64 {
        (self.blank1 + self.blank2) / 2.0
    }

    /// Initial concentration, falling back to [`DEFAULT_INITIAL_CONCENTRATION`]
    ///
    /// Missing, non-finite and non-positive values all fall back.
    pub fn initial_concentration(&self) -> f64 {
        match self.initial_concentration {
            Some(c) if c.is_finite() && c > 0.0 => c,
            Some(c) => {
                tracing::warn!(
                    name = %self.name,
                    value = c,
                    "Unusable initial concentration, using {}",
                    DEFAULT_INITIAL_CONCENTRATION
                );
                DEFAULT_INITIAL_CONCENTRATION
            }
            None => DEFAULT_INITIAL_CONCENTRATION,
        }
    }
}

/// Parse an initial concentration cell
///
/// Spreadsheet cells arrive as text; anything that is not a number yields
/// `None` rather than an error.
///
/// ```rust
/// use micfit::data::parse_initial_concentration;
///
/// assert_eq!(parse_initial_concentration(" 64 "), Some(64.0));
/// assert_eq!(parse_initial_concentration("n/a"), None);
/// assert_eq!(parse_initial_concentration(""), None);
/// ```
pub fn parse_initial_concentration(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Builder for [`AssayRow`]
#[derive(Debug, Clone)]
pub struct AssayRowBuilder {
    row: AssayRow,
}

impl AssayRowBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            row: AssayRow {
                blank1: 0.0,
                wells: [0.0; DILUTION_WELLS],
                control: 1.0,
                blank2: 0.0,
                name: name.into(),
                initial_concentration: None,
            },
        }
    }

    /// Set both blank wells
    pub fn blanks(mut self, blank1: f64, blank2: f64) -> Self {
        self.row.blank1 = blank1;
        self.row.blank2 = blank2;
        self
    }

    /// Set the nine dilution wells
    pub fn wells(mut self, wells: [f64; DILUTION_WELLS]) -> Self {
        self.row.wells = wells;
        self
    }

    /// Set the growth control well
    pub fn control(mut self, control: f64) -> Self {
        self.row.control = control;
        self
    }

    /// Set the initial concentration
    pub fn initial_concentration(mut self, concentration: f64) -> Self {
        self.row.initial_concentration = Some(concentration);
        self
    }

    /// Set the initial concentration from a raw cell, see [`parse_initial_concentration`]
    pub fn initial_concentration_cell(mut self, cell: &str) -> Self {
        self.row.initial_concentration = parse_initial_concentration(cell);
        self
    }

    /// Finalize and build the AssayRow
    pub fn build(self) -> AssayRow {
        self.row
    }
}

/// All rows currently loaded, in arrival order
///
/// Several batches (for instance several plate files) can be accumulated;
/// rows from later batches are appended after earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAssayMatrix {
    rows: Vec<AssayRow>,
}

impl RawAssayMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<AssayRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: AssayRow) {
        self.rows.push(row);
    }

    /// Append the rows of another batch after the current ones
    pub fn extend_from(&mut self, other: &RawAssayMatrix) {
        self.rows.extend(other.rows.iter().cloned());
    }

    /// Consume two batches into one
    pub fn merge(mut self, other: RawAssayMatrix) -> Self {
        self.rows.extend(other.rows);
        self
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[AssayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct compound names in first appearance order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.name.as_str()) {
                names.push(&row.name);
            }
        }
        names
    }
}

impl FromIterator<AssayRow> for RawAssayMatrix {
    fn from_iter<I: IntoIterator<Item = AssayRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
