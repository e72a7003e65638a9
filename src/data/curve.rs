//! Per-compound dose-response curves
//!
//! Rows sharing a compound name are replicates of the same curve, whether
//! they came from one plate or from several accumulated batches. Their
//! points are concatenated into a single [`CurveRecord`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::normalize::NormalizedMatrix;

/// Relative tolerance under which two concentrations are the same well level
const SAME_CONCENTRATION_RTOL: f64 = 1e-9;

/// A single (concentration, growth) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub concentration: f64,
    /// Fraction of control growth, not clamped to [0, 1]
    pub measured: f64,
}

impl CurvePoint {
    pub fn new(concentration: f64, measured: f64) -> Self {
        Self {
            concentration,
            measured,
        }
    }

    fn is_valid(&self) -> bool {
        self.concentration.is_finite() && self.concentration > 0.0 && self.measured.is_finite()
    }
}

/// All replicate points of one compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    pub name: String,
    pub points: Vec<CurvePoint>,
}

impl CurveRecord {
    pub fn new(name: impl Into<String>, points: Vec<CurvePoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Build a curve from `(concentration, measured)` pairs
    pub fn from_pairs(name: impl Into<String>, pairs: &[(f64, f64)]) -> Self {
        Self::new(
            name,
            pairs.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn concentrations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.concentration).collect()
    }

    pub fn measured(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.measured).collect()
    }

    pub fn min_concentration(&self) -> Option<f64> {
        self.points.iter().map(|p| p.concentration).reduce(f64::min)
    }

    pub fn max_concentration(&self) -> Option<f64> {
        self.points.iter().map(|p| p.concentration).reduce(f64::max)
    }

    pub fn min_measured(&self) -> Option<f64> {
        self.points.iter().map(|p| p.measured).reduce(f64::min)
    }

    pub fn max_measured(&self) -> Option<f64> {
        self.points.iter().map(|p| p.measured).reduce(f64::max)
    }

    /// Replicates averaged per concentration level, sorted by concentration
    pub fn averaged(&self) -> Vec<CurvePoint> {
        let mut sorted = self.points.clone();
        sorted.sort_by(|a, b| a.concentration.total_cmp(&b.concentration));

        let mut levels: Vec<(f64, f64, usize)> = Vec::new();
        for point in sorted {
            match levels.last_mut() {
                Some((x, sum, count))
                    if (point.concentration - *x).abs()
                        <= SAME_CONCENTRATION_RTOL * x.abs().max(point.concentration.abs()) =>
                {
                    *sum += point.measured;
                    *count += 1;
                }
                _ => levels.push((point.concentration, point.measured, 1)),
            }
        }

        levels
            .into_iter()
            .map(|(x, sum, count)| CurvePoint::new(x, sum / count as f64))
            .collect()
    }

    /// Mean growth observed at the highest concentration
    pub fn growth_at_max_concentration(&self) -> Option<f64> {
        self.averaged().last().map(|p| p.measured)
    }

    /// Mean growth observed at the lowest concentration
    pub fn growth_at_min_concentration(&self) -> Option<f64> {
        self.averaged().first().map(|p| p.measured)
    }
}

/// Curves built from a normalized matrix
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// One curve per compound with at least one valid point, first appearance order
    pub curves: Vec<CurveRecord>,
    /// Compounds whose rows held no valid point at all
    pub skipped: Vec<String>,
}

/// Group normalized rows by compound name
///
/// Non-finite points are dropped. A compound left without any point is not
/// turned into a curve; its name is reported in [`Assembly::skipped`].
pub fn assemble(normalized: &NormalizedMatrix) -> Assembly {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<CurvePoint>)> = Vec::new();
    let mut dropped = 0usize;

    for (r, name) in normalized.names.iter().enumerate() {
        let slot = *index.entry(name.as_str()).or_insert_with(|| {
            grouped.push((name.clone(), Vec::new()));
            grouped.len() - 1
        });

        let growth = normalized.growth.row(r);
        let concentrations = normalized.concentrations.row(r);
        for (&x, &y) in concentrations.iter().zip(growth.iter()) {
            let point = CurvePoint::new(x, y);
            if point.is_valid() {
                grouped[slot].1.push(point);
            } else {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Dropped non-finite curve points");
    }

    let mut assembly = Assembly::default();
    for (name, points) in grouped {
        if points.is_empty() {
            tracing::warn!(name = %name, "Compound has no valid points, skipping curve");
            assembly.skipped.push(name);
        } else {
            assembly.curves.push(CurveRecord::new(name, points));
        }
    }
    assembly
}
