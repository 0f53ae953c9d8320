use crate::config::PipelineConfig;
use crate::outcome::compute_outcome;
use crate::price::PricePoint;
use crate::scenario::Scenario;
use chrono::Duration;
use rayon::prelude::*;

/// Enumerates candidate as-of dates for one security and materializes a
/// scenario for each date with a computable outcome.
///
/// The valid as-of window is
/// `[first_price + min_history_years * 365d, last_price - forward_months * 30d]`,
/// optionally floored by `config.earliest_as_of`. Candidates stride
/// `stride_days` from the window start through the end inclusive. Candidates
/// without a primary-horizon price are dropped silently; an empty or
/// inverted window yields zero scenarios, which is a legitimately thin
/// security rather than an error.
///
/// The generator is a pure batch transform: identical price input produces
/// identical scenario dates and outcomes, so re-running it and upserting is
/// idempotent given the store's (security, as-of) uniqueness.
pub fn generate_scenarios(
    security_id: i64,
    prices: &[PricePoint],
    config: &PipelineConfig,
) -> Vec<Scenario> {
    let mut prices = prices.to_vec();
    prices.sort_by_key(|p| p.date);

    let (first, last) = match (prices.first(), prices.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Vec::new(),
    };

    let mut earliest = first + Duration::days(config.min_history_years * 365);
    if let Some(floor) = config.earliest_as_of {
        earliest = earliest.max(floor);
    }
    let latest = last - Duration::days(config.forward_months * 30);

    if earliest > latest {
        return Vec::new();
    }

    let mut scenarios = Vec::new();
    let mut as_of = earliest;
    while as_of <= latest {
        if let Some(outcome) = compute_outcome(&prices, as_of, config) {
            scenarios.push(Scenario::from_outcome(security_id, as_of, outcome));
        }
        as_of += Duration::days(config.stride_days);
    }

    scenarios
}

/// Generates scenarios for many securities in parallel.
///
/// Each security's generation is independent with no shared mutable state,
/// so the batch fans out across the rayon thread pool. Output order follows
/// input order regardless of scheduling.
pub fn generate_all(
    batches: &[(i64, Vec<PricePoint>)],
    config: &PipelineConfig,
) -> Vec<Scenario> {
    batches
        .par_iter()
        .flat_map(|(security_id, prices)| generate_scenarios(*security_id, prices, config))
        .collect()
}
