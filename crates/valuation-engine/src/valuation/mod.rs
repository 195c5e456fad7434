pub mod adjustments;
pub mod confidence;
pub mod domain;
pub mod median;
pub mod normalize;
pub mod policy;
pub mod selection;
pub mod sort;

pub use adjustments::build_comp_adjusted_value;
pub use confidence::{ConfidenceReason, ConfidenceReport};
pub use domain::{
    AdjustmentLineItem, AdjustmentType, Comp, CompAdjustedValue, CompKind, ConfidenceGrade,
    MarketTimeAdjustment, SelectionResult, SkipReason, Subject, ValueBasisMethod, WarningCode,
};
pub use median::{weighted_median_deterministic, MedianSample};
pub use policy::{AdjustmentsPolicy, PolicyError};
pub use selection::{select_arv_comps, SelectionInput};
pub use sort::sort_comps_deterministic;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use confidence::ConfidenceInput;
use median::nearest_rank_quantile;
use normalize::normalize_comp;

/// One valuation request: the subject, its candidate comps, and the
/// selection parameters. The policy lives on the engine so it can be shared
/// across concurrent valuations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub subject: Subject,
    pub comps: Vec<Comp>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    pub min_closed_comps: usize,
    pub median_set_size: usize,
}

/// Terminal artifact of a valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationOutcome {
    pub comp_kind_used: CompKind,
    pub suggested_arv: Option<f64>,
    pub suggested_arv_range_low: Option<f64>,
    pub suggested_arv_range_high: Option<f64>,
    pub selected_comp_ids: Vec<String>,
    pub warning_codes: Vec<WarningCode>,
    pub force_confidence_c: bool,
    pub per_comp: Vec<CompAdjustedValue>,
    pub confidence: ConfidenceReport,
}

/// Structural errors a caller must treat as fatal; everything softer is a
/// warning code or a skip reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("subject field {field} must be a finite number")]
    NonFiniteSubjectField { field: &'static str },
    #[error("median_set_size must be at least 1")]
    InvalidMedianSetSize,
}

fn validate_subject(subject: &Subject) -> Result<(), EngineError> {
    let fields = [
        ("sqft", subject.sqft),
        ("beds", subject.beds),
        ("baths", subject.baths),
        ("lot_sqft", subject.lot_sqft),
        ("year_built", subject.year_built),
    ];
    for (field, value) in fields {
        if value.is_some_and(|number| !number.is_finite()) {
            return Err(EngineError::NonFiniteSubjectField { field });
        }
    }
    Ok(())
}

/// Stateless valuation pipeline bound to one adjustments policy.
pub struct ValuationEngine {
    policy: AdjustmentsPolicy,
}

impl ValuationEngine {
    pub fn new(policy: AdjustmentsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdjustmentsPolicy {
        &self.policy
    }

    /// Runs the full pipeline: normalize, sort, select, adjust, aggregate,
    /// grade. Deterministic for any permutation of the same comp set.
    pub fn run(&self, request: &ValuationRequest) -> Result<ValuationOutcome, EngineError> {
        self.policy.validate()?;
        validate_subject(&request.subject)?;
        if request.median_set_size == 0 {
            return Err(EngineError::InvalidMedianSetSize);
        }

        let comps: Vec<Comp> = request.comps.iter().cloned().map(normalize_comp).collect();
        let comps = sort_comps_deterministic(comps);

        let selection = select_arv_comps(&SelectionInput {
            comps: &comps,
            min_closed_comps: request.min_closed_comps,
            median_set_size: request.median_set_size,
            rounding: self.policy.rounding,
        });

        let per_comp: Vec<CompAdjustedValue> = selection
            .selected_comp_ids
            .iter()
            .filter_map(|id| comps.iter().find(|comp| &comp.id == id))
            .map(|comp| build_comp_adjusted_value(&request.subject, comp, &self.policy, request.as_of))
            .collect();

        let samples: Vec<MedianSample> = per_comp
            .iter()
            .filter_map(|adjusted| {
                adjusted.adjusted_value.map(|value| MedianSample {
                    value,
                    weight: 1.0,
                    id: adjusted.comp_id.clone(),
                })
            })
            .collect();

        // Adjusted values drive the final number; the selector's plain price
        // median stands in only when no selected comp could be adjusted.
        let suggested_arv = if samples.is_empty() {
            selection.suggested_arv
        } else {
            weighted_median_deterministic(&samples, self.policy.rounding.cents)
        };

        let adjusted_values: Vec<f64> = samples.iter().map(|sample| sample.value).collect();
        let suggested_arv_range_low = nearest_rank_quantile(&adjusted_values, 0.25)
            .map(|value| self.policy.rounding.apply(value));
        let suggested_arv_range_high = nearest_rank_quantile(&adjusted_values, 0.75)
            .map(|value| self.policy.rounding.apply(value));

        let confidence = confidence::grade(&ConfidenceInput {
            comp_kind_used: selection.comp_kind_used,
            comp_count_used: selection.selected_comp_ids.len(),
            suggested_arv,
            range_low: suggested_arv_range_low,
            range_high: suggested_arv_range_high,
            force_confidence_c: selection.force_confidence_c,
            warning_codes: &selection.warning_codes,
            rubric: &self.policy.confidence_rubric,
        });

        Ok(ValuationOutcome {
            comp_kind_used: selection.comp_kind_used,
            suggested_arv,
            suggested_arv_range_low,
            suggested_arv_range_high,
            selected_comp_ids: selection.selected_comp_ids,
            warning_codes: selection.warning_codes,
            force_confidence_c: selection.force_confidence_c,
            per_comp,
            confidence,
        })
    }
}
