use super::domain::{Comp, CompKind, SelectionResult, WarningCode};
use super::median::median;
use super::policy::Rounding;

/// Inputs to comp-kind selection. `comps` must already be normalized and in
/// deterministic order; the selector takes the first eligible comps as the
/// closest/most recent.
#[derive(Debug, Clone, Copy)]
pub struct SelectionInput<'a> {
    pub comps: &'a [Comp],
    pub min_closed_comps: usize,
    pub median_set_size: usize,
    pub rounding: Rounding,
}

/// Chooses the comp kind to value on, falling back from closed sales to
/// listings below the minimum-closed threshold, and computes the interim
/// unweighted price median over the selected set. Never fails; insufficiency
/// is reported through warning codes and a null ARV.
pub fn select_arv_comps(input: &SelectionInput<'_>) -> SelectionResult {
    // Only priced comps can move a price median, so the threshold counts
    // priced comps per kind.
    let closed: Vec<&Comp> = priced_of_kind(input.comps, CompKind::ClosedSale);
    let listings: Vec<&Comp> = priced_of_kind(input.comps, CompKind::SaleListing);

    let mut warning_codes: Vec<WarningCode> = Vec::new();
    let (comp_kind_used, pool, force_confidence_c) = if closed.len() >= input.min_closed_comps {
        (CompKind::ClosedSale, closed, false)
    } else {
        warning_codes.push(WarningCode::InsufficientClosedSalesComps);
        warning_codes.push(WarningCode::ListingBasedCompsOnly);
        (CompKind::SaleListing, listings, true)
    };

    let selected: Vec<&Comp> = pool.into_iter().take(input.median_set_size.max(1)).collect();
    let selected_comp_ids: Vec<String> = selected.iter().map(|comp| comp.id.clone()).collect();

    let prices: Vec<f64> = selected.iter().filter_map(|comp| comp.price).collect();
    let suggested_arv = median(&prices).map(|value| input.rounding.apply(value));
    if suggested_arv.is_none() {
        warning_codes.push(WarningCode::NoCompsAvailable);
    }

    warning_codes.sort();
    warning_codes.dedup();

    SelectionResult {
        comp_kind_used,
        suggested_arv,
        selected_comp_ids,
        warning_codes,
        force_confidence_c,
    }
}

fn priced_of_kind(comps: &[Comp], kind: CompKind) -> Vec<&Comp> {
    comps
        .iter()
        .filter(|comp| comp.comp_kind == kind && comp.price.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::sort::sort_comps_deterministic;

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

    #[test]
    fn sufficient_closed_sales_use_closed_kind() {
        let comps = sort_comps_deterministic(scenario_comps());
        let result = select_arv_comps(&SelectionInput {
            comps: &comps,
            min_closed_comps: 2,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        assert_eq!(result.comp_kind_used, CompKind::ClosedSale);
        assert_eq!(result.suggested_arv, Some(205_000.0));
        assert!(!result.force_confidence_c);
        assert!(!result
            .warning_codes
            .contains(&WarningCode::ListingBasedCompsOnly));
        assert_eq!(result.selected_comp_ids, vec!["c1", "c2"]);
    }

    #[test]
    fn insufficient_closed_sales_fall_back_to_listings() {
        let comps = sort_comps_deterministic(scenario_comps());
        let result = select_arv_comps(&SelectionInput {
            comps: &comps,
            min_closed_comps: 3,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        assert_eq!(result.comp_kind_used, CompKind::SaleListing);
        assert_eq!(result.suggested_arv, Some(220_000.0));
        assert!(result.force_confidence_c);
        assert!(result
            .warning_codes
            .contains(&WarningCode::ListingBasedCompsOnly));
        assert!(result
            .warning_codes
            .contains(&WarningCode::InsufficientClosedSalesComps));
    }

    #[test]
    fn empty_selected_kind_yields_null_arv_with_warning() {
        let comps = vec![
            comp("c1", 200_000.0, CompKind::ClosedSale),
            comp("c2", 210_000.0, CompKind::ClosedSale),
        ];
        let result = select_arv_comps(&SelectionInput {
            comps: &comps,
            min_closed_comps: 3,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        assert_eq!(result.comp_kind_used, CompKind::SaleListing);
        assert_eq!(result.suggested_arv, None);
        assert!(result.warning_codes.contains(&WarningCode::NoCompsAvailable));
        assert!(result.force_confidence_c);
        assert!(result.selected_comp_ids.is_empty());
    }

    #[test]
    fn unpriced_comps_do_not_count_toward_the_threshold() {
        let mut comps = scenario_comps();
        comps[1].price = None;
        let comps = sort_comps_deterministic(comps);
        let result = select_arv_comps(&SelectionInput {
            comps: &comps,
            min_closed_comps: 2,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        assert_eq!(result.comp_kind_used, CompKind::SaleListing);
        assert!(result.force_confidence_c);
    }

    #[test]
    fn warning_codes_are_sorted_and_deduplicated() {
        let result = select_arv_comps(&SelectionInput {
            comps: &[],
            min_closed_comps: 1,
            median_set_size: 3,
            rounding: Rounding::default(),
        });

        let mut sorted = result.warning_codes.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(result.warning_codes, sorted);
    }

    #[test]
    fn selection_is_order_independent() {
        let base = scenario_comps();
        let expected = select_arv_comps(&SelectionInput {
            comps: &sort_comps_deterministic(base.clone()),
            min_closed_comps: 2,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        let mut shuffled = base;
        shuffled.reverse();
        let result = select_arv_comps(&SelectionInput {
            comps: &sort_comps_deterministic(shuffled),
            min_closed_comps: 2,
            median_set_size: 2,
            rounding: Rounding::default(),
        });

        assert_eq!(result, expected);
    }
}
