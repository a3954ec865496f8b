//! Candidate ranking for the reference sampler
//!
//! Candidates are ordered by descending score; equal scores keep their
//! original index order, so the lower index always ranks first. Any stable
//! sort-then-truncate gives the same prefix; a partial selection on the
//! total order `(score desc, index asc)` does it in linear time.

use crate::tensor::ScoreElement;
use serde::Serialize;
use std::cmp::Ordering;

/// A score paired with its position in the original vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedCandidate {
    /// Widened without loss from the element type
    pub score: f64,
    pub index: usize,
}

fn rank_order<T: ScoreElement>(scores: &[T], a: usize, b: usize) -> Ordering {
    scores[b]
        .partial_cmp(&scores[a])
        .unwrap_or(Ordering::Equal)
        .then(a.cmp(&b))
}

/// Index of the first maximum, or `None` for an empty slice
pub fn argmax<T: ScoreElement>(scores: &[T]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, score) in scores.iter().enumerate() {
        match best {
            Some(b) if *score <= scores[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

/// The `k` best candidates, best first
///
/// `k` is clamped to the vector length.
pub fn top_k<T: ScoreElement>(scores: &[T], k: usize) -> Vec<RankedCandidate> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    if k < order.len() {
        order.select_nth_unstable_by(k - 1, |&a, &b| rank_order(scores, a, b));
        order.truncate(k);
    }
    order.sort_unstable_by(|&a, &b| rank_order(scores, a, b));

    order
        .into_iter()
        .map(|index| RankedCandidate {
            score: scores[index].to_f64(),
            index,
        })
        .collect()
}
