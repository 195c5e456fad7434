use serde::{Deserialize, Serialize};

use super::domain::{CompKind, ConfidenceGrade, WarningCode};
use super::policy::ConfidenceRubric;

/// Everything the grader needs from the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct ConfidenceInput<'a> {
    pub comp_kind_used: CompKind,
    pub comp_count_used: usize,
    pub suggested_arv: Option<f64>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub force_confidence_c: bool,
    pub warning_codes: &'a [WarningCode],
    pub rubric: &'a ConfidenceRubric,
}

/// Why a grade landed where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceReason {
    ForcedDowngrade,
    InsufficientClosedSalesComps,
    ListingBasedCompsOnly,
    LowCompCount,
    RangeMissing,
    WideRange,
}

/// Dispersion and count metrics backing the grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub comp_kind_used: CompKind,
    pub comp_count_used: usize,
    pub range_pct: Option<f64>,
}

/// The grade plus the audit trail behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub grade: ConfidenceGrade,
    pub reasons: Vec<ConfidenceReason>,
    pub metrics: ConfidenceMetrics,
}

/// Comp counts below this are always called out when the grade is not A.
const LOW_COMP_COUNT: usize = 5;

/// Grades the valuation A/B/C. A forced downgrade (listing fallback) clamps
/// to C before any rubric band is consulted; otherwise the first band whose
/// count and dispersion requirements hold wins.
pub fn grade(input: &ConfidenceInput<'_>) -> ConfidenceReport {
    let mut reasons: Vec<ConfidenceReason> = Vec::new();

    let range_pct = match (input.suggested_arv, input.range_low, input.range_high) {
        (Some(arv), Some(low), Some(high)) if arv != 0.0 => Some((high - low) / arv),
        _ => None,
    };

    let listing_fallback = input
        .warning_codes
        .contains(&WarningCode::ListingBasedCompsOnly)
        || input
            .warning_codes
            .contains(&WarningCode::InsufficientClosedSalesComps);
    let hard_downgrade = input.force_confidence_c || listing_fallback;

    let grade = if hard_downgrade {
        ConfidenceGrade::C
    } else {
        input
            .rubric
            .bands
            .iter()
            .find(|band| {
                let comps_ok = band
                    .min_comps
                    .map_or(true, |minimum| input.comp_count_used >= minimum);
                let range_ok = band
                    .max_range_pct
                    .map_or(true, |maximum| range_pct.is_some_and(|pct| pct <= maximum));
                comps_ok && range_ok
            })
            .map(|band| band.grade)
            .unwrap_or(ConfidenceGrade::C)
    };

    if input
        .warning_codes
        .contains(&WarningCode::ListingBasedCompsOnly)
    {
        reasons.push(ConfidenceReason::ListingBasedCompsOnly);
    }
    if input
        .warning_codes
        .contains(&WarningCode::InsufficientClosedSalesComps)
    {
        reasons.push(ConfidenceReason::InsufficientClosedSalesComps);
    }
    if input.force_confidence_c && !listing_fallback {
        reasons.push(ConfidenceReason::ForcedDowngrade);
    }
    if range_pct.is_some_and(|pct| pct > input.rubric.wide_range_threshold()) {
        reasons.push(ConfidenceReason::WideRange);
    }
    if input.comp_count_used < LOW_COMP_COUNT && grade != ConfidenceGrade::A {
        reasons.push(ConfidenceReason::LowCompCount);
    }
    if range_pct.is_none() {
        reasons.push(ConfidenceReason::RangeMissing);
    }

    reasons.sort();
    reasons.dedup();

    ConfidenceReport {
        grade,
        reasons,
        metrics: ConfidenceMetrics {
            comp_kind_used: input.comp_kind_used,
            comp_count_used: input.comp_count_used,
            range_pct,
        },
    }
}
