use super::policy::round_money;

/// One weighted observation for the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianSample {
    pub value: f64,
    pub weight: f64,
    pub id: String,
}

/// Weighted median with an explicit tie-break rule: samples sort by
/// `(value, id)` ascending, never by input order, so two callers passing the
/// same logical set in different orders get the same answer. Weights
/// normalize to `max(1, w)`; non-finite weights count as 1. Empty input
/// yields `None`.
pub fn weighted_median_deterministic(samples: &[MedianSample], cents: u32) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut normalized: Vec<(f64, f64, &str)> = samples
        .iter()
        .map(|sample| {
            let weight = if sample.weight.is_finite() {
                sample.weight.max(1.0)
            } else {
                1.0
            };
            (sample.value, weight, sample.id.as_str())
        })
        .collect();
    normalized.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.2.cmp(b.2)));

    let total: f64 = normalized.iter().map(|(_, weight, _)| weight).sum();
    let mut cumulative = 0.0;
    for (value, weight, _) in &normalized {
        cumulative += weight;
        if cumulative >= total / 2.0 {
            return Some(round_money(*value, cents));
        }
    }

    normalized
        .last()
        .map(|(value, _, _)| round_money(*value, cents))
}

/// Plain median: middle value, or the mean of the two middle values for an
/// even count. Used for the selector's interim price median.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Nearest-rank quantile over unsorted values; `p` in [0, 1].
pub fn nearest_rank_quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p * sorted.len() as f64).ceil() as isize - 1;
    let idx = rank.clamp(0, sorted.len() as isize - 1) as usize;
    Some(sorted[idx])
}
