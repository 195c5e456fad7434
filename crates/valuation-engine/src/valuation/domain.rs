use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::normalize::flexible_number;

/// Classification of a comparable as a completed or active transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompKind {
    ClosedSale,
    SaleListing,
}

impl CompKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ClosedSale => "Closed Sale",
            Self::SaleListing => "Sale Listing",
        }
    }
}

/// The six adjustment line-item types, in their canonical audit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Time,
    Sqft,
    Beds,
    Baths,
    Lot,
    YearBuilt,
}

impl AdjustmentType {
    /// Emission order for line items. Audit output depends on this order,
    /// never on map iteration order.
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Time,
            Self::Sqft,
            Self::Beds,
            Self::Baths,
            Self::Lot,
            Self::YearBuilt,
        ]
    }

    pub const fn is_feature(self) -> bool {
        matches!(self, Self::Beds | Self::Baths | Self::Lot | Self::YearBuilt)
    }
}

/// Reason a line item was recorded without being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingCompPrice,
    MissingTimeAdjustment,
    MissingSqft,
    SqftDeltaTooLarge,
    MissingTimeAdjustedPrice,
    MissingBeds,
    MissingBaths,
    MissingYearBuilt,
    MissingSubjectLotSqft,
    MissingCompLotSqft,
    UnitValueZero,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCompPrice => "missing_comp_price",
            Self::MissingTimeAdjustment => "missing_time_adjustment",
            Self::MissingSqft => "missing_sqft",
            Self::SqftDeltaTooLarge => "sqft_delta_too_large",
            Self::MissingTimeAdjustedPrice => "missing_time_adjusted_price",
            Self::MissingBeds => "missing_beds",
            Self::MissingBaths => "missing_baths",
            Self::MissingYearBuilt => "missing_year_built",
            Self::MissingSubjectLotSqft => "missing_subject_lot_sqft",
            Self::MissingCompLotSqft => "missing_comp_lot_sqft",
            Self::UnitValueZero => "unit_value_zero",
        }
    }
}

/// Machine-readable caveats attached to a selection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    InsufficientClosedSalesComps,
    ListingBasedCompsOnly,
    NoCompsAvailable,
}

impl WarningCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientClosedSalesComps => "insufficient_closed_sales_comps",
            Self::ListingBasedCompsOnly => "listing_based_comps_only",
            Self::NoCompsAvailable => "no_comps_available",
        }
    }
}

/// Confidence grade attached to a suggested ARV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceGrade {
    A,
    B,
    C,
}

/// The property being valued. All fields nullable; null means missing,
/// never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default, deserialize_with = "flexible_number")]
    pub sqft: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub beds: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub baths: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub lot_sqft: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub year_built: Option<f64>,
}

/// Market-level time adjustment applied upstream to a comp's price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTimeAdjustment {
    #[serde(default, deserialize_with = "flexible_number")]
    pub factor: Option<f64>,
    #[serde(default)]
    pub applied: bool,
}

/// A candidate comparable sale or listing. Read-only snapshot; the engine
/// derives new records and never mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comp {
    pub id: String,
    pub comp_kind: CompKind,
    #[serde(default, deserialize_with = "flexible_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub sqft: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub beds: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub baths: Option<f64>,
    #[serde(default, alias = "lot_size", deserialize_with = "flexible_number")]
    pub lot_sqft: Option<f64>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub year_built: Option<f64>,
    #[serde(default)]
    pub close_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub distance_miles: Option<f64>,
    #[serde(default)]
    pub market_time_adjustment: Option<MarketTimeAdjustment>,
    #[serde(default, deserialize_with = "flexible_number")]
    pub price_adjusted: Option<f64>,
}

/// A line-item value that is numeric for most types but textual for the
/// time row, which records the as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineValue {
    Number(f64),
    Text(String),
}

impl From<f64> for LineValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for LineValue {
    fn from(value: NaiveDate) -> Self {
        Self::Text(value.to_string())
    }
}

/// Provenance of an adjustment's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSource {
    Policy,
}

/// One audit row per (comp, adjustment type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentLineItem {
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub subject_value: Option<LineValue>,
    pub comp_value: Option<LineValue>,
    pub delta_units_raw: Option<f64>,
    pub delta_units_capped: Option<f64>,
    pub unit_value: Option<f64>,
    pub amount_raw: Option<f64>,
    pub amount_capped: Option<f64>,
    pub applied: bool,
    pub skip_reason: Option<SkipReason>,
    pub source: AdjustmentSource,
    pub notes: Option<String>,
}

/// How a comp's value basis was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueBasisMethod {
    PpsfSubject,
    TimeAdjustedPrice,
}

/// Per-comp output of the adjustment calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompAdjustedValue {
    pub comp_id: String,
    pub base_price_raw: Option<f64>,
    pub time_adjusted_price: Option<f64>,
    pub value_basis_before_adjustments: Option<f64>,
    pub value_basis_method: ValueBasisMethod,
    pub adjustments: Vec<AdjustmentLineItem>,
    pub adjusted_value: Option<f64>,
}

/// Outcome of comp-kind selection and the interim price median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub comp_kind_used: CompKind,
    pub suggested_arv: Option<f64>,
    pub selected_comp_ids: Vec<String>,
    pub warning_codes: Vec<WarningCode>,
    pub force_confidence_c: bool,
}
