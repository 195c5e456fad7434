use chrono::NaiveDate;
use valuation_engine::valuation::domain::MarketTimeAdjustment;
use valuation_engine::valuation::policy::{Rounding, UnitValues};
use valuation_engine::valuation::selection::{select_arv_comps, SelectionInput};
use valuation_engine::valuation::{
    sort_comps_deterministic, AdjustmentType, AdjustmentsPolicy, Comp, CompKind, ConfidenceGrade,
    SkipReason, Subject, ValuationEngine, ValuationRequest, ValueBasisMethod, WarningCode,
};

fn comp(id: &str, price: f64, kind: CompKind) -> Comp {
    Comp {
        id: id.to_string(),
        comp_kind: kind,
        price: Some(price),
        sqft: None,
        beds: None,
        baths: None,
        lot_sqft: None,
        year_built: None,
        close_date: None,
        distance_miles: None,
        market_time_adjustment: None,
        price_adjusted: None,
    }
}

fn scenario_comps() -> Vec<Comp> {
    vec![
        comp("c1", 200_000.0, CompKind::ClosedSale),
        comp("c2", 210_000.0, CompKind::ClosedSale),
        comp("c3", 220_000.0, CompKind::SaleListing),
    ]
}

fn request(comps: Vec<Comp>, min_closed: usize, set_size: usize) -> ValuationRequest {
    ValuationRequest {
        subject: Subject {
            sqft: Some(1900.0),
            beds: Some(3.0),
            baths: Some(2.0),
            lot_sqft: Some(7000.0),
            year_built: Some(1995.0),
        },
        comps,
        as_of: NaiveDate::from_ymd_opt(2025, 6, 1),
        min_closed_comps: min_closed,
        median_set_size: set_size,
    }
}

#[test]
fn scenario_a_sufficient_closed_sales() {
    let comps = sort_comps_deterministic(scenario_comps());
    let selection = select_arv_comps(&SelectionInput {
        comps: &comps,
        min_closed_comps: 2,
        median_set_size: 2,
        rounding: Rounding::default(),
    });

    assert_eq!(selection.comp_kind_used, CompKind::ClosedSale);
    assert_eq!(selection.suggested_arv, Some(205_000.0));
    assert!(!selection
        .warning_codes
        .contains(&WarningCode::ListingBasedCompsOnly));
    assert!(!selection.force_confidence_c);
}

#[test]
fn scenario_b_listing_fallback_forces_confidence_c() {
    let engine = ValuationEngine::new(AdjustmentsPolicy::default());
    let outcome = engine
        .run(&request(scenario_comps(), 3, 2))
        .expect("fallback still succeeds");

    assert_eq!(outcome.comp_kind_used, CompKind::SaleListing);
    assert!(outcome
        .warning_codes
        .contains(&WarningCode::ListingBasedCompsOnly));
    assert!(outcome.force_confidence_c);
    assert_eq!(outcome.confidence.grade, ConfidenceGrade::C);
}

#[test]
fn scenario_c_missing_subject_sqft_skips_sqft_adjustment() {
    let engine = ValuationEngine::new(AdjustmentsPolicy::default());
    let mut req = request(scenario_comps(), 2, 2);
    req.subject.sqft = None;
    let outcome = engine.run(&req).expect("runs without subject sqft");

    for adjusted in &outcome.per_comp {
        assert_eq!(
            adjusted.value_basis_method,
            ValueBasisMethod::TimeAdjustedPrice
        );
        let sqft = adjusted
            .adjustments
            .iter()
            .find(|item| item.adjustment_type == AdjustmentType::Sqft)
            .expect("sqft row always emitted");
        assert!(!sqft.applied);
        assert_eq!(sqft.skip_reason, Some(SkipReason::MissingSqft));
    }
}

#[test]
fn outcome_is_identical_for_any_input_permutation() {
    let engine = ValuationEngine::new(AdjustmentsPolicy {
        unit_values: UnitValues {
            beds: 4000.0,
            baths: 2000.0,
            lot_per_sqft: 0.5,
            year_built_per_year: 150.0,
        },
        ..AdjustmentsPolicy::default()
    });

    let mut comps = vec![
        comp("c5", 291_000.0, CompKind::ClosedSale),
        comp("c2", 305_000.0, CompKind::ClosedSale),
        comp("c4", 298_500.0, CompKind::ClosedSale),
        comp("c1", 310_000.0, CompKind::ClosedSale),
        comp("c3", 301_250.0, CompKind::SaleListing),
    ];
    for (index, item) in comps.iter_mut().enumerate() {
        item.sqft = Some(1800.0 + 50.0 * index as f64);
        item.beds = Some(3.0);
        item.baths = Some(2.5);
        item.lot_sqft = Some(6500.0);
        item.year_built = Some(1990.0 + index as f64);
        item.distance_miles = Some(0.3 + 0.1 * index as f64);
        item.market_time_adjustment = Some(MarketTimeAdjustment {
            factor: Some(1.02),
            applied: true,
        });
    }

    let baseline = engine
        .run(&request(comps.clone(), 3, 4))
        .expect("baseline runs");

    for rotation in 1..comps.len() {
        let mut permuted = comps.clone();
        permuted.rotate_left(rotation);
        let outcome = engine
            .run(&request(permuted, 3, 4))
            .expect("permuted run succeeds");
        assert_eq!(outcome, baseline);
    }

    let mut reversed = comps;
    reversed.reverse();
    let outcome = engine
        .run(&request(reversed, 3, 4))
        .expect("reversed run succeeds");
    assert_eq!(outcome, baseline);
}

#[test]
fn monetary_outputs_close_under_policy_rounding() {
    let engine = ValuationEngine::new(AdjustmentsPolicy {
        unit_values: UnitValues {
            beds: 3333.333,
            baths: 1111.111,
            lot_per_sqft: 0.777,
            year_built_per_year: 99.99,
        },
        ..AdjustmentsPolicy::default()
    });

    let mut comps = scenario_comps();
    for item in &mut comps {
        item.sqft = Some(1777.0);
        item.beds = Some(2.0);
        item.baths = Some(1.5);
        item.lot_sqft = Some(5432.0);
        item.year_built = Some(1983.0);
    }

    let outcome = engine.run(&request(comps, 2, 3)).expect("runs");

    let representable = |value: f64| (value * 100.0 - (value * 100.0).round()).abs() < 1e-6;
    assert!(representable(outcome.suggested_arv.expect("arv present")));
    for adjusted in &outcome.per_comp {
        for field in [
            adjusted.base_price_raw,
            adjusted.time_adjusted_price,
            adjusted.value_basis_before_adjustments,
            adjusted.adjusted_value,
        ] {
            if let Some(value) = field {
                assert!(representable(value), "field {value} not at cents precision");
            }
        }
        for item in &adjusted.adjustments {
            for field in [item.amount_raw, item.amount_capped, item.unit_value] {
                if let Some(value) = field {
                    assert!(representable(value), "line {value} not at cents precision");
                }
            }
        }
    }
}

#[test]
fn caps_bound_every_feature_delta() {
    let policy = AdjustmentsPolicy {
        unit_values: UnitValues {
            beds: 5000.0,
            baths: 2500.0,
            lot_per_sqft: 1.0,
            year_built_per_year: 100.0,
        },
        ..AdjustmentsPolicy::default()
    };
    let engine = ValuationEngine::new(policy.clone());

    let mut extreme = comp("far", 400_000.0, CompKind::ClosedSale);
    extreme.sqft = Some(1900.0);
    extreme.beds = Some(9.0);
    extreme.baths = Some(7.0);
    extreme.lot_sqft = Some(40_000.0);
    extreme.year_built = Some(1900.0);

    let outcome = engine
        .run(&request(vec![extreme], 1, 1))
        .expect("runs with extreme comp");

    let adjusted = &outcome.per_comp[0];
    for item in &adjusted.adjustments {
        let cap = match item.adjustment_type {
            AdjustmentType::Beds => Some(policy.caps.beds_delta_cap),
            AdjustmentType::Baths => Some(policy.caps.baths_delta_cap),
            AdjustmentType::YearBuilt => Some(policy.caps.year_delta_cap),
            AdjustmentType::Lot => Some(7000.0 * policy.caps.lot_delta_cap_ratio),
            _ => None,
        };
        if let (Some(cap), Some(capped)) = (cap, item.delta_units_capped) {
            assert!(
                capped.abs() <= cap + 1e-9,
                "{:?} capped delta {capped} exceeds {cap}",
                item.adjustment_type
            );
        }
    }
}

#[test]
fn json_wire_request_round_trips_through_the_engine() {
    let raw = serde_json::json!({
        "subject": { "sqft": "2000", "beds": 3, "baths": 2, "lot_sqft": null, "year_built": 1999 },
        "comps": [
            { "id": "c1", "comp_kind": "closed_sale", "price": "425000", "sqft": 2100,
              "lot_size": 6200, "close_date": "2025-04-02", "distance_miles": 0.4 },
            { "id": "c2", "comp_kind": "closed_sale", "price": 418000, "sqft": 1950,
              "close_date": "2025-03-15", "distance_miles": 0.9 }
        ],
        "min_closed_comps": 2,
        "median_set_size": 2
    });
    let request: ValuationRequest = serde_json::from_value(raw).expect("request deserializes");
    assert_eq!(request.comps[0].lot_sqft, Some(6200.0));

    let engine = ValuationEngine::new(AdjustmentsPolicy::default());
    let outcome = engine.run(&request).expect("runs");
    assert_eq!(outcome.comp_kind_used, CompKind::ClosedSale);
    assert!(outcome.suggested_arv.is_some());

    let serialized = serde_json::to_value(&outcome).expect("outcome serializes");
    assert!(serialized["per_comp"][0]["adjustments"][0]["type"].is_string());
}
