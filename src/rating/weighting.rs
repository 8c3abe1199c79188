use std::cmp::Ordering;

use super::types::{ScoreRowId, ScoreWeightUpdate, WeightedScore, WeightedScoreList};

/// Each further score counts 3.5% less than the one before it.
pub const DECAY_FACTOR: f64 = 0.965;

/// Floor for weights. `0.965^i` leaves the normal f64 range past index ~19,900,
/// every later score gets this value.
pub const MIN_WEIGHT: f64 = f64::MIN_POSITIVE;

/// `DECAY_FACTOR^index`. Always positive, strictly decreasing until it reaches
/// [`MIN_WEIGHT`].
pub fn compute_weight(index: usize) -> f64 {
    let exponent = i32::try_from(index).unwrap_or(i32::MAX);
    DECAY_FACTOR.powi(exponent).max(MIN_WEIGHT)
}

/// Sorts `(score id, pp)` pairs by pp descending and assigns decaying weights.
///
/// Equal pp keeps input order. Non-finite pp is treated as 0.
pub fn weigh_scores(scores: &[(ScoreRowId, f64)]) -> WeightedScoreList {
    let mut sorted: Vec<(ScoreRowId, f64)> = scores
        .iter()
        .map(|&(id, pp)| (id, sanitize_pp(pp)))
        .collect();
    sorted.sort_by(|a, b| compare_pp_desc(a.1, b.1));

    let scores: Vec<WeightedScore> = sorted
        .into_iter()
        .enumerate()
        .map(|(index, (score_id, pp))| WeightedScore {
            score_id,
            pp,
            weight: compute_weight(index),
        })
        .collect();

    let total_pp = scores.iter().map(WeightedScore::weighted_pp).sum();

    WeightedScoreList { scores, total_pp }
}

/// Total weighted pp of a list already sorted best first.
#[cfg(test)]
pub(crate) fn total_weighted_pp(sorted_pps: &[f64]) -> f64 {
    sorted_pps
        .iter()
        .enumerate()
        .map(|(index, pp)| pp * compute_weight(index))
        .sum()
}

/// Weight updates for a full player: ranked scores get their weight, the rest are cleared.
pub fn weight_updates(
    weighted: &WeightedScoreList,
    unranked_ids: &[ScoreRowId],
) -> Vec<ScoreWeightUpdate> {
    let ranked = weighted.scores.iter().map(|s| ScoreWeightUpdate {
        score_id: s.score_id,
        weight: Some(s.weight),
    });
    let cleared = unranked_ids.iter().map(|&score_id| ScoreWeightUpdate {
        score_id,
        weight: None,
    });

    ranked.chain(cleared).collect()
}

fn sanitize_pp(pp: f64) -> f64 {
    if pp.is_finite() { pp.max(0.0) } else { 0.0 }
}

fn compare_pp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
