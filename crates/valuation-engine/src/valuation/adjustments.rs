use chrono::NaiveDate;

use super::domain::{
    AdjustmentLineItem, AdjustmentSource, AdjustmentType, Comp, CompAdjustedValue, LineValue,
    SkipReason, Subject, ValueBasisMethod,
};
use super::policy::{AdjustmentsPolicy, MissingFieldBehavior, Rounding};

/// Computes the full audit trail for one comp: six adjustment line items,
/// value-basis resolution, and the aggregated adjusted value. Pure function;
/// every precondition failure degrades to a recorded skip reason rather than
/// aborting the comp.
pub fn build_comp_adjusted_value(
    subject: &Subject,
    comp: &Comp,
    policy: &AdjustmentsPolicy,
    as_of: Option<NaiveDate>,
) -> CompAdjustedValue {
    let rounding = policy.rounding;

    let base_price_raw = comp.price;
    let time_adjusted_price = comp.price_adjusted.or(base_price_raw);

    let sqft = resolve_sqft_basis(subject, comp, policy, time_adjusted_price);

    let mut adjustments = Vec::with_capacity(AdjustmentType::ordered().len());
    for adjustment_type in AdjustmentType::ordered() {
        match adjustment_type {
            // Time and sqft rows are always emitted, applied or not, so the
            // audit trail can explain the basis decision.
            AdjustmentType::Time => adjustments.push(time_line_item(
                comp,
                base_price_raw,
                as_of,
                rounding,
            )),
            AdjustmentType::Sqft => adjustments.push(sqft_line_item(subject, comp, &sqft, rounding)),
            feature => {
                if policy.is_enabled(feature) {
                    adjustments.push(feature_line_item(feature, subject, comp, policy));
                }
            }
        }
    }

    let feature_sum: f64 = adjustments
        .iter()
        .filter(|item| item.applied && item.adjustment_type.is_feature())
        .filter_map(|item| item.amount_capped)
        .sum();

    let value_basis_before_adjustments = sqft.value_basis;
    let adjusted_value =
        value_basis_before_adjustments.map(|basis| rounding.apply(basis + feature_sum));

    CompAdjustedValue {
        comp_id: comp.id.clone(),
        base_price_raw: rounding.apply_opt(base_price_raw),
        time_adjusted_price: rounding.apply_opt(time_adjusted_price),
        value_basis_before_adjustments,
        value_basis_method: sqft.method,
        adjustments,
        adjusted_value,
    }
}

/// Outcome of the value-basis decision, shared between the sqft line item
/// and the final aggregation.
struct SqftBasis {
    value_basis: Option<f64>,
    method: ValueBasisMethod,
    delta_units: Option<f64>,
    delta_ratio: Option<f64>,
    unit_value: Option<f64>,
    amount: Option<f64>,
    applied: bool,
    skip_reason: Option<SkipReason>,
}

fn resolve_sqft_basis(
    subject: &Subject,
    comp: &Comp,
    policy: &AdjustmentsPolicy,
    time_adjusted_price: Option<f64>,
) -> SqftBasis {
    let rounding = policy.rounding;
    let threshold = policy.caps.sqft_basis_allowed_delta_ratio;

    let subject_sqft = subject.sqft;
    let comp_sqft = comp.sqft;

    let delta_units = match (subject_sqft, comp_sqft) {
        (Some(subject_value), Some(comp_value)) => Some(subject_value - comp_value),
        _ => None,
    };
    let has_values = matches!(
        (subject_sqft, comp_sqft),
        (Some(subject_value), Some(comp_value)) if subject_value > 0.0 && comp_value > 0.0
    );
    let delta_ratio = match (subject_sqft, delta_units) {
        (Some(subject_value), Some(delta)) if has_values => Some(delta.abs() / subject_value),
        _ => None,
    };

    let delta_ok = delta_ratio.is_some_and(|ratio| ratio <= threshold);
    let applied = has_values && delta_ok && time_adjusted_price.is_some();

    let unit_value = match (time_adjusted_price, comp_sqft) {
        (Some(price), Some(comp_value)) if comp_value > 0.0 => Some(price / comp_value),
        _ => None,
    };
    let amount = if applied {
        match (unit_value, delta_units) {
            (Some(unit), Some(delta)) => Some(unit * delta),
            _ => None,
        }
    } else {
        None
    };

    let skip_reason = if applied {
        None
    } else if !has_values {
        Some(SkipReason::MissingSqft)
    } else if !delta_ok {
        Some(SkipReason::SqftDeltaTooLarge)
    } else {
        Some(SkipReason::MissingTimeAdjustedPrice)
    };

    // The ppsf basis folds the sqft delta into the basis itself; the plain
    // time-adjusted price carries no sqft scaling.
    let value_basis = if applied {
        match (time_adjusted_price, comp_sqft, subject_sqft) {
            (Some(price), Some(comp_value), Some(subject_value)) => {
                Some(rounding.apply((price / comp_value) * subject_value))
            }
            _ => rounding.apply_opt(time_adjusted_price),
        }
    } else {
        rounding.apply_opt(time_adjusted_price)
    };
    let method = if applied {
        ValueBasisMethod::PpsfSubject
    } else {
        ValueBasisMethod::TimeAdjustedPrice
    };

    SqftBasis {
        value_basis,
        method,
        delta_units,
        delta_ratio,
        unit_value,
        amount,
        applied,
        skip_reason,
    }
}

fn time_line_item(
    comp: &Comp,
    base_price_raw: Option<f64>,
    as_of: Option<NaiveDate>,
    rounding: Rounding,
) -> AdjustmentLineItem {
    let adjustment = comp.market_time_adjustment.as_ref();
    let factor = adjustment.and_then(|a| a.factor);
    let applied_flag = adjustment.is_some_and(|a| a.applied);

    let can_apply = applied_flag && base_price_raw.is_some() && factor.is_some();
    let delta_units = if can_apply { factor.map(|f| f - 1.0) } else { None };
    let amount = match (base_price_raw, delta_units) {
        (Some(price), Some(delta)) if can_apply => Some(price * delta),
        _ => None,
    };
    let skip_reason = if can_apply {
        None
    } else if base_price_raw.is_none() {
        Some(SkipReason::MissingCompPrice)
    } else {
        Some(SkipReason::MissingTimeAdjustment)
    };
    let notes = if can_apply {
        format!(
            "factor={}; delta={}; price={}",
            factor.unwrap_or_default(),
            delta_units.unwrap_or_default(),
            base_price_raw.unwrap_or_default()
        )
    } else {
        "time adjustment not applied".to_string()
    };

    AdjustmentLineItem {
        adjustment_type: AdjustmentType::Time,
        subject_value: as_of.map(LineValue::from),
        comp_value: base_price_raw.map(LineValue::from),
        delta_units_raw: rounding.apply_opt(delta_units),
        delta_units_capped: rounding.apply_opt(delta_units),
        unit_value: rounding.apply_opt(base_price_raw),
        amount_raw: rounding.apply_opt(amount),
        amount_capped: rounding.apply_opt(amount),
        applied: can_apply,
        skip_reason,
        source: AdjustmentSource::Policy,
        notes: Some(notes),
    }
}

fn sqft_line_item(
    subject: &Subject,
    comp: &Comp,
    sqft: &SqftBasis,
    rounding: Rounding,
) -> AdjustmentLineItem {
    let notes = if sqft.applied {
        format!(
            "basis=ppsf_subject; delta_ratio={}",
            sqft.delta_ratio.unwrap_or_default()
        )
    } else {
        format!(
            "basis=time_adjusted_price; reason={}",
            sqft.skip_reason.map(SkipReason::as_str).unwrap_or("none")
        )
    };

    AdjustmentLineItem {
        adjustment_type: AdjustmentType::Sqft,
        subject_value: subject.sqft.map(LineValue::from),
        comp_value: comp.sqft.map(LineValue::from),
        delta_units_raw: rounding.apply_opt(sqft.delta_units),
        delta_units_capped: rounding.apply_opt(sqft.delta_units),
        unit_value: rounding.apply_opt(sqft.unit_value),
        amount_raw: rounding.apply_opt(sqft.amount),
        amount_capped: rounding.apply_opt(sqft.amount),
        applied: sqft.applied,
        skip_reason: sqft.skip_reason,
        source: AdjustmentSource::Policy,
        notes: Some(notes),
    }
}

fn feature_line_item(
    adjustment_type: AdjustmentType,
    subject: &Subject,
    comp: &Comp,
    policy: &AdjustmentsPolicy,
) -> AdjustmentLineItem {
    let rounding = policy.rounding;
    let caps = policy.caps;
    let units = policy.unit_values;

    let (subject_value, comp_value, cap, unit, missing_reason) = match adjustment_type {
        AdjustmentType::Beds => (
            subject.beds,
            comp.beds,
            Some(caps.beds_delta_cap),
            units.beds,
            SkipReason::MissingBeds,
        ),
        AdjustmentType::Baths => (
            subject.baths,
            comp.baths,
            Some(caps.baths_delta_cap),
            units.baths,
            SkipReason::MissingBaths,
        ),
        AdjustmentType::YearBuilt => (
            subject.year_built,
            comp.year_built,
            Some(caps.year_delta_cap),
            units.year_built_per_year,
            SkipReason::MissingYearBuilt,
        ),
        AdjustmentType::Lot => {
            // The lot cap is absolute, derived from the subject's lot size;
            // without a subject lot there is no cap to derive.
            let cap = subject
                .lot_sqft
                .map(|lot| (lot * caps.lot_delta_cap_ratio).abs());
            let missing = if subject.lot_sqft.is_none() {
                SkipReason::MissingSubjectLotSqft
            } else {
                SkipReason::MissingCompLotSqft
            };
            (subject.lot_sqft, comp.lot_sqft, cap, units.lot_per_sqft, missing)
        }
        AdjustmentType::Time | AdjustmentType::Sqft => {
            unreachable!("time and sqft rows are built separately")
        }
    };

    let delta = match (subject_value, comp_value) {
        (Some(subject_num), Some(comp_num)) => Some(subject_num - comp_num),
        _ => None,
    };
    let has_values = delta.is_some();
    let unit_is_zero = unit == 0.0;
    let capped_delta = match (cap, delta) {
        (Some(cap_value), Some(delta_value)) => Some(delta_value.clamp(-cap_value, cap_value)),
        (Some(_), None) => None,
        (None, delta_value) => delta_value,
    };

    let applied = has_values && !unit_is_zero;
    let amount_raw = if applied { delta.map(|d| unit * d) } else { None };
    let amount_capped = if applied {
        capped_delta.map(|d| unit * d)
    } else {
        amount_raw
    };

    let skip_reason = if applied || policy.missing_field_behavior != MissingFieldBehavior::Skip {
        None
    } else if !has_values {
        Some(missing_reason)
    } else {
        Some(SkipReason::UnitValueZero)
    };

    AdjustmentLineItem {
        adjustment_type,
        subject_value: subject_value.map(LineValue::from),
        comp_value: comp_value.map(LineValue::from),
        delta_units_raw: rounding.apply_opt(delta),
        delta_units_capped: rounding.apply_opt(capped_delta),
        unit_value: Some(rounding.apply(unit)),
        amount_raw: rounding.apply_opt(amount_raw),
        amount_capped: rounding.apply_opt(amount_capped),
        applied,
        skip_reason,
        source: AdjustmentSource::Policy,
        notes: None,
    }
}
