//! MIC quality classification
//!
//! Classification is an ordered decision table. Every rule looks at the same
//! [`Evidence`] and either stays silent or proposes a [`Verdict`]; the last
//! rule that speaks wins. The measured-range rules come last so they
//! override whatever the root searches concluded.
//!
//! | Order | Rule | Verdict |
//! |-------|------|---------|
//! | 1 | Accepted model root | `Ok`, or `OverMeasuredRange` beyond the highest concentration |
//! | 2 | Rejected model root beyond the highest concentration | `OverMeasuredRange` |
//! | 3 | Spline root with lowest growth within tolerance of the target | `EstimatedFromInterpolation` |
//! | 4 | Lowest measured growth at or above the target | `OverMeasuredRange` (`OverMeasuredRangeNotFitted` without a model) |
//! | 5 | Highest measured growth at or below the target | `UnderMeasuredRange` |
//!
//! [`MicQuality::Poor`] is reserved and no rule produces it.

use super::types::{FitType, MicConcentration, MicQuality};
use crate::data::CurveRecord;

/// Everything the decision table looks at
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub fit_type: FitType,
    /// Growth fraction the MIC is solved for
    pub target_growth: f64,
    /// Model root estimate, accepted or not
    pub model_root: Option<f64>,
    pub model_accepted: bool,
    /// Root of the spline fallback
    pub interpolated_root: Option<f64>,
    /// Largest |lowest growth - target| for which the spline root is kept
    pub interpolation_tolerance: f64,
    pub min_measured: f64,
    pub max_measured: f64,
    pub min_concentration: f64,
    pub max_concentration: f64,
    /// Mean growth at the lowest concentration
    pub growth_at_min_concentration: f64,
    /// Mean growth at the highest concentration
    pub growth_at_max_concentration: f64,
}

impl Evidence {
    /// Evidence from the measured curve alone, no root searched yet
    pub fn from_curve(curve: &CurveRecord, fit_type: FitType, target_growth: f64) -> Self {
        Self {
            fit_type,
            target_growth,
            model_root: None,
            model_accepted: false,
            interpolated_root: None,
            interpolation_tolerance: 0.01,
            min_measured: curve.min_measured().unwrap_or(f64::NAN),
            max_measured: curve.max_measured().unwrap_or(f64::NAN),
            min_concentration: curve.min_concentration().unwrap_or(f64::NAN),
            max_concentration: curve.max_concentration().unwrap_or(f64::NAN),
            growth_at_min_concentration: curve.growth_at_min_concentration().unwrap_or(f64::NAN),
            growth_at_max_concentration: curve.growth_at_max_concentration().unwrap_or(f64::NAN),
        }
    }

    fn fitted(&self) -> bool {
        self.fit_type == FitType::Fitted
    }

    fn above(&self) -> MicConcentration {
        MicConcentration::Above {
            concentration: self.max_concentration,
            growth_pct: 100.0 * self.growth_at_max_concentration,
        }
    }

    fn below(&self) -> MicConcentration {
        MicConcentration::Below {
            concentration: self.min_concentration,
            growth_pct: 100.0 * self.growth_at_min_concentration,
        }
    }
}

/// Quality and reported concentration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub quality: MicQuality,
    pub concentration: Option<MicConcentration>,
}

impl Verdict {
    pub fn not_determined() -> Self {
        Self {
            quality: MicQuality::NotDetermined,
            concentration: None,
        }
    }

    fn new(quality: MicQuality, concentration: MicConcentration) -> Self {
        Self {
            quality,
            concentration: Some(concentration),
        }
    }
}

type Rule = fn(&Evidence) -> Option<Verdict>;

const RULES: [(&str, Rule); 5] = [
    ("accepted model root", accepted_model_root),
    ("rejected model root beyond range", rejected_root_beyond_range),
    ("spline interpolation", interpolated_root),
    ("no crossing up to highest concentration", no_crossing_above),
    ("no crossing down to lowest concentration", no_crossing_below),
];

fn accepted_model_root(e: &Evidence) -> Option<Verdict> {
    let root = e.model_root.filter(|_| e.fitted() && e.model_accepted)?;
    Some(if root > e.max_concentration {
        Verdict::new(MicQuality::OverMeasuredRange, e.above())
    } else {
        Verdict::new(MicQuality::Ok, MicConcentration::Value(root))
    })
}

fn rejected_root_beyond_range(e: &Evidence) -> Option<Verdict> {
    let root = e.model_root.filter(|_| e.fitted() && !e.model_accepted)?;
    (root > e.max_concentration).then(|| Verdict::new(MicQuality::OverMeasuredRange, e.above()))
}

fn interpolated_root(e: &Evidence) -> Option<Verdict> {
    let root = e.interpolated_root.filter(|_| e.fitted() && !e.model_accepted)?;
    ((e.min_measured - e.target_growth).abs() < e.interpolation_tolerance).then(|| {
        Verdict::new(
            MicQuality::EstimatedFromInterpolation,
            MicConcentration::Value(root),
        )
    })
}

fn no_crossing_above(e: &Evidence) -> Option<Verdict> {
    (e.target_growth <= e.min_measured).then(|| {
        let quality = if e.fitted() {
            MicQuality::OverMeasuredRange
        } else {
            MicQuality::OverMeasuredRangeNotFitted
        };
        Verdict::new(quality, e.above())
    })
}

fn no_crossing_below(e: &Evidence) -> Option<Verdict> {
    (e.fitted() && e.target_growth >= e.max_measured && e.target_growth > e.min_measured)
        .then(|| Verdict::new(MicQuality::UnderMeasuredRange, e.below()))
}

/// Run the decision table
pub fn classify(evidence: &Evidence) -> Verdict {
    RULES
        .iter()
        .fold(Verdict::not_determined(), |verdict, (name, rule)| {
            match rule(evidence) {
                Some(next) => {
                    tracing::trace!(rule = *name, quality = %next.quality, "Quality rule fired");
                    next
                }
                None => verdict,
            }
        })
}
