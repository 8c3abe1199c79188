use std::cmp::Ordering;

use super::weighting::{DECAY_FACTOR, compute_weight};

/// Bisection stops once the bracket is this narrow (pp).
pub const BOUNDARY_PRECISION: f64 = 0.001;
pub const MAX_SEARCH_ITERATIONS: usize = 100;

/// Answers "how much raw pp does a new score need to add `k` weighted pp".
///
/// Inserting a score of `x` raw pp at position `i` adds `x * w^i` and pushes every
/// score below it down one slot, losing `(1 - w) * Σ_{j>=i} pp_j * w^j`. Both terms are
/// kept in `suffix` so a gain evaluation is a binary search plus O(1).
#[derive(Debug, Clone)]
pub struct PpBoundarySearch {
    pps: Vec<f64>,
    suffix: Vec<f64>,
}

impl PpBoundarySearch {
    pub fn new(pps: &[f64]) -> Self {
        let mut pps: Vec<f64> = pps
            .iter()
            .copied()
            .filter(|pp| pp.is_finite() && *pp > 0.0)
            .collect();
        pps.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let mut suffix = vec![0.0; pps.len() + 1];
        for index in (0..pps.len()).rev() {
            suffix[index] = suffix[index + 1] + pps[index] * compute_weight(index);
        }

        Self { pps, suffix }
    }

    pub fn is_empty(&self) -> bool {
        self.pps.is_empty()
    }

    pub fn total_pp(&self) -> f64 {
        self.suffix[0]
    }

    /// Weighted pp gained by adding one score worth `raw_pp`.
    pub fn gain(&self, raw_pp: f64) -> f64 {
        if !raw_pp.is_finite() || raw_pp <= 0.0 {
            return 0.0;
        }

        let position = self.pps.partition_point(|&pp| pp >= raw_pp);
        raw_pp * compute_weight(position) - (1.0 - DECAY_FACTOR) * self.suffix[position]
    }

    /// Smallest raw pp whose gain reaches `expected_gain`, within [`BOUNDARY_PRECISION`].
    pub fn boundary(&self, expected_gain: f64) -> f64 {
        if !expected_gain.is_finite() || expected_gain <= 0.0 {
            return 0.0;
        }

        let mut low = 0.0;
        let mut high = self.upper_bound(expected_gain);

        for _ in 0..MAX_SEARCH_ITERATIONS {
            if high - low <= BOUNDARY_PRECISION {
                break;
            }

            let mid = (low + high) / 2.0;
            if self.gain(mid) < expected_gain {
                low = mid;
            } else {
                high = mid;
            }
        }

        high
    }

    // Any score at or above this lands first and gains at least `expected_gain`.
    fn upper_bound(&self, expected_gain: f64) -> f64 {
        let top = self.pps.first().copied().unwrap_or(0.0);
        top.max(expected_gain + (1.0 - DECAY_FACTOR) * self.total_pp())
    }
}

/// Boundaries for +1 .. +`count` weighted pp. Empty for a player without ranked scores.
pub fn pp_boundaries(pps: &[f64], count: usize) -> Vec<f64> {
    let search = PpBoundarySearch::new(pps);
    if search.is_empty() {
        return Vec::new();
    }

    (1..=count).map(|step| search.boundary(step as f64)).collect()
}

/// Raw pp needed for +1 weighted pp.
pub fn plus_one_pp(pps: &[f64]) -> Option<f64> {
    pp_boundaries(pps, 1).first().copied()
}
