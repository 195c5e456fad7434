use std::cmp::Ordering;

use super::domain::Comp;

/// Imposes the canonical total order on a comp set: nearest first, then most
/// recent, then `id` ascending. Any permutation of the same set sorts to an
/// identical sequence, so downstream median and weighting stages are
/// independent of provider ordering.
pub fn sort_comps_deterministic(mut comps: Vec<Comp>) -> Vec<Comp> {
    comps.sort_by(compare_comps);
    comps
}

fn compare_comps(a: &Comp, b: &Comp) -> Ordering {
    cmp_distance(a.distance_miles, b.distance_miles)
        .then_with(|| cmp_recency(a.close_date, b.close_date))
        .then_with(|| a.id.cmp(&b.id))
}

/// Ascending distance; comps without one sort last.
fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Most recent close first; comps without a close date sort last.
fn cmp_recency(a: Option<chrono::NaiveDate>, b: Option<chrono::NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
