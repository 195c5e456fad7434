use serde::{Deserialize, Serialize};

use super::domain::{AdjustmentType, ConfidenceGrade};

/// Maximum decimal precision honored for monetary rounding.
const MAX_ROUNDING_CENTS: u32 = 6;

/// Rounds a monetary value to `cents` decimal places. Precision outside
/// 0..=6 clamps rather than erroring, matching the policy contract.
pub fn round_money(value: f64, cents: u32) -> f64 {
    let factor = 10f64.powi(cents.min(MAX_ROUNDING_CENTS) as i32);
    (value * factor).round() / factor
}

/// Decimal precision for every monetary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rounding {
    pub cents: u32,
}

impl Default for Rounding {
    fn default() -> Self {
        Self { cents: 2 }
    }
}

impl Rounding {
    pub fn apply(&self, value: f64) -> f64 {
        round_money(value, self.cents)
    }

    pub fn apply_opt(&self, value: Option<f64>) -> Option<f64> {
        value.map(|v| self.apply(v))
    }
}

/// What to record when an adjustment's preconditions fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldBehavior {
    /// Skip the adjustment and record a skip reason (the default).
    #[default]
    Skip,
    /// Skip the adjustment without recording a reason.
    Silent,
}

/// Symmetric caps applied to adjustment deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentCaps {
    pub beds_delta_cap: f64,
    pub baths_delta_cap: f64,
    pub year_delta_cap: f64,
    pub lot_delta_cap_ratio: f64,
    pub sqft_basis_allowed_delta_ratio: f64,
}

impl Default for AdjustmentCaps {
    fn default() -> Self {
        Self {
            beds_delta_cap: 2.0,
            baths_delta_cap: 2.0,
            year_delta_cap: 20.0,
            lot_delta_cap_ratio: 0.5,
            sqft_basis_allowed_delta_ratio: 0.5,
        }
    }
}

/// Dollar value of one unit of each feature delta. Zero disables the
/// adjustment (recorded as `unit_value_zero`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitValues {
    pub beds: f64,
    pub baths: f64,
    pub lot_per_sqft: f64,
    pub year_built_per_year: f64,
}

/// One rubric band; bands are evaluated in order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub grade: ConfidenceGrade,
    #[serde(default)]
    pub min_comps: Option<usize>,
    #[serde(default)]
    pub max_range_pct: Option<f64>,
}

/// Ordered grading bands for the confidence rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceRubric {
    pub bands: Vec<ConfidenceBand>,
}

impl Default for ConfidenceRubric {
    fn default() -> Self {
        Self {
            bands: vec![
                ConfidenceBand {
                    grade: ConfidenceGrade::A,
                    min_comps: Some(8),
                    max_range_pct: Some(0.15),
                },
                ConfidenceBand {
                    grade: ConfidenceGrade::B,
                    min_comps: Some(5),
                    max_range_pct: Some(0.25),
                },
                ConfidenceBand {
                    grade: ConfidenceGrade::C,
                    min_comps: None,
                    max_range_pct: None,
                },
            ],
        }
    }
}

impl ConfidenceRubric {
    /// Threshold beyond which the range counts as wide in the report's
    /// reasons, taken from the loosest band that bounds it.
    pub fn wide_range_threshold(&self) -> f64 {
        self.bands
            .iter()
            .filter_map(|band| band.max_range_pct)
            .fold(None::<f64>, |acc, value| {
                Some(acc.map_or(value, |current| current.max(value)))
            })
            .unwrap_or(0.25)
    }
}

/// Externally supplied configuration governing caps, unit values, rounding,
/// and confidence grading. Read-only for the duration of a valuation and
/// safe to share across concurrent valuations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentsPolicy {
    pub rounding: Rounding,
    pub missing_field_behavior: MissingFieldBehavior,
    /// Adjustment types to compute; empty means all six.
    pub enabled_types: Vec<AdjustmentType>,
    pub caps: AdjustmentCaps,
    pub unit_values: UnitValues,
    pub confidence_rubric: ConfidenceRubric,
}

impl AdjustmentsPolicy {
    pub fn is_enabled(&self, adjustment_type: AdjustmentType) -> bool {
        self.enabled_types.is_empty() || self.enabled_types.contains(&adjustment_type)
    }

    /// Fails fast on a malformed policy rather than producing a misleading
    /// number downstream.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let caps = [
            ("caps.beds_delta_cap", self.caps.beds_delta_cap),
            ("caps.baths_delta_cap", self.caps.baths_delta_cap),
            ("caps.year_delta_cap", self.caps.year_delta_cap),
            ("caps.lot_delta_cap_ratio", self.caps.lot_delta_cap_ratio),
            (
                "caps.sqft_basis_allowed_delta_ratio",
                self.caps.sqft_basis_allowed_delta_ratio,
            ),
        ];
        for (field, value) in caps {
            if !value.is_finite() {
                return Err(PolicyError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(PolicyError::NegativeCap { field });
            }
        }

        let units = [
            ("unit_values.beds", self.unit_values.beds),
            ("unit_values.baths", self.unit_values.baths),
            ("unit_values.lot_per_sqft", self.unit_values.lot_per_sqft),
            (
                "unit_values.year_built_per_year",
                self.unit_values.year_built_per_year,
            ),
        ];
        for (field, value) in units {
            if !value.is_finite() {
                return Err(PolicyError::NonFinite { field });
            }
        }

        if self.confidence_rubric.bands.is_empty() {
            return Err(PolicyError::EmptyConfidenceRubric);
        }
        for band in &self.confidence_rubric.bands {
            if let Some(max_range) = band.max_range_pct {
                if !max_range.is_finite() || max_range < 0.0 {
                    return Err(PolicyError::NonFinite {
                        field: "confidence_rubric.max_range_pct",
                    });
                }
            }
        }

        Ok(())
    }
}

/// Structural policy errors. These are fatal to the caller, unlike
/// missing-data conditions which degrade to skip reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("policy field {field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("policy cap {field} must not be negative")]
    NegativeCap { field: &'static str },
    #[error("confidence rubric must declare at least one band")]
    EmptyConfidenceRubric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_money_honors_cents() {
        assert_eq!(round_money(123.4567, 2), 123.46);
        assert_eq!(round_money(123.4567, 0), 123.0);
        assert_eq!(round_money(-2.346, 2), -2.35);
    }

    #[test]
    fn round_money_clamps_excess_precision() {
        assert_eq!(round_money(1.123456789, 9), 1.123457);
    }

    #[test]
    fn empty_enabled_types_means_all() {
        let policy = AdjustmentsPolicy::default();
        for adjustment_type in AdjustmentType::ordered() {
            assert!(policy.is_enabled(adjustment_type));
        }

        let beds_only = AdjustmentsPolicy {
            enabled_types: vec![AdjustmentType::Beds],
            ..AdjustmentsPolicy::default()
        };
        assert!(beds_only.is_enabled(AdjustmentType::Beds));
        assert!(!beds_only.is_enabled(AdjustmentType::Baths));
    }

    #[test]
    fn default_policy_validates() {
        assert_eq!(AdjustmentsPolicy::default().validate(), Ok(()));
    }

    #[test]
    fn nan_cap_is_rejected() {
        let mut policy = AdjustmentsPolicy::default();
        policy.caps.year_delta_cap = f64::NAN;
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::NonFinite { field }) if field == "caps.year_delta_cap"
        ));
    }

    #[test]
    fn negative_cap_is_rejected() {
        let mut policy = AdjustmentsPolicy::default();
        policy.caps.beds_delta_cap = -1.0;
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::NegativeCap { .. })
        ));
    }

    #[test]
    fn empty_rubric_is_rejected() {
        let policy = AdjustmentsPolicy {
            confidence_rubric: ConfidenceRubric { bands: Vec::new() },
            ..AdjustmentsPolicy::default()
        };
        assert_eq!(policy.validate(), Err(PolicyError::EmptyConfidenceRubric));
    }

    #[test]
    fn policy_deserializes_from_sparse_json() {
        let policy: AdjustmentsPolicy = serde_json::from_value(serde_json::json!({
            "rounding": { "cents": 0 },
            "unit_values": { "beds": 5000 }
        }))
        .expect("sparse policy deserializes");
        assert_eq!(policy.rounding.cents, 0);
        assert_eq!(policy.unit_values.beds, 5000.0);
        assert_eq!(policy.caps.beds_delta_cap, 2.0);
        assert_eq!(policy.missing_field_behavior, MissingFieldBehavior::Skip);
    }
}
