//! Ground-truth sampling algorithm
//!
//! 1. `topp <= 0` or `topk <= 1`: arg-max over the whole vector.
//! 2. Rank the top-`topk` candidates (see [`super::ranking`]).
//! 3. Softmax over those candidates only, after subtracting the best score
//!    and dividing by the temperature.
//! 4. Cut the nucleus at the first rank whose running mass reaches `topp`,
//!    keeping that rank.
//! 5. Scale `random_val` by the nucleus mass and return the first candidate
//!    whose running mass exceeds it.
//!
//! The shift `s - max` is taken in `f64` and only then narrowed, so wide
//! `f64` scores underflow to zero probability instead of turning into NaN.
//! All probability arithmetic after that is `f32` and accumulates in rank
//! order, so an implementation that follows the same order reproduces every
//! comparison.

use super::ranking::{argmax, top_k, RankedCandidate};
use super::{SamplerError, SamplerResult, SamplingConfig};
use crate::tensor::ScoreElement;
use serde::Serialize;

/// The chosen token
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    pub index: usize,
    pub score: f64,
}

/// Everything the nucleus walk saw, for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct NucleusTrace {
    /// Top-k candidates, best first
    pub candidates: Vec<RankedCandidate>,
    /// Softmax over `candidates`, same order
    pub probabilities: Vec<f32>,
    /// Exclusive end of the nucleus within `candidates`
    pub end: usize,
    /// `random_val` scaled by the nucleus mass
    pub threshold: f32,
    /// Rank of the chosen candidate
    pub selected_rank: usize,
}

impl NucleusTrace {
    pub fn selection(&self) -> Selection {
        let chosen = self.candidates[self.selected_rank];
        Selection {
            index: chosen.index,
            score: chosen.score,
        }
    }

    pub fn nucleus(&self) -> &[RankedCandidate] {
        &self.candidates[..self.end]
    }
}

fn check_scores<T: ScoreElement>(scores: &[T]) -> SamplerResult<()> {
    match scores.iter().position(|s| !s.to_f64().is_finite()) {
        Some(index) => Err(SamplerError::NonFiniteScore(index)),
        None => Ok(()),
    }
}

/// Select one index from `scores`
pub fn sample<T: ScoreElement>(scores: &[T], config: &SamplingConfig) -> SamplerResult<Selection> {
    config.validate(scores.len())?;
    check_scores(scores)?;

    if config.is_greedy() {
        let index = argmax(scores).ok_or(SamplerError::EmptyScores)?;
        return Ok(Selection {
            index,
            score: scores[index].to_f64(),
        });
    }

    Ok(walk_nucleus(scores, config).selection())
}

/// Run the non-greedy path and keep the intermediate state
///
/// Greedy configs are rejected with `InvalidTopK`/`InvalidTopP` because no
/// nucleus exists for them.
pub fn sample_ranked<T: ScoreElement>(
    scores: &[T],
    config: &SamplingConfig,
) -> SamplerResult<NucleusTrace> {
    config.validate(scores.len())?;
    check_scores(scores)?;

    if config.topk <= 1 {
        return Err(SamplerError::InvalidTopK {
            topk: config.topk,
            voc: scores.len(),
        });
    }
    if config.topp <= 0.0 {
        return Err(SamplerError::InvalidTopP(config.topp));
    }

    Ok(walk_nucleus(scores, config))
}

fn walk_nucleus<T: ScoreElement>(scores: &[T], config: &SamplingConfig) -> NucleusTrace {
    let topk = config.topk as usize;
    let candidates = top_k(scores, topk);
    let probabilities = softmax_shifted(&candidates, config.temperature);
    let end = nucleus_end(&probabilities, config.topp);

    let mass: f32 = probabilities[..end].iter().sum();
    let threshold = config.random_val * mass;

    let mut cumulative = 0.0f32;
    let mut selected_rank = end - 1;
    for (rank, &p) in probabilities[..end].iter().enumerate() {
        cumulative += p;
        if threshold < cumulative {
            selected_rank = rank;
            break;
        }
    }

    NucleusTrace {
        candidates,
        probabilities,
        end,
        threshold,
        selected_rank,
    }
}

/// `exp((s - max) / temperature)` normalized over the candidates
fn softmax_shifted(candidates: &[RankedCandidate], temperature: f32) -> Vec<f32> {
    let max = candidates[0].score;
    let exps: Vec<f32> = candidates
        .iter()
        .map(|c| (((c.score - max) as f32) / temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Exclusive end of the nucleus
///
/// The rank at which the running mass first reaches `topp` is included; if
/// it never does, every candidate is.
fn nucleus_end(probabilities: &[f32], topp: f32) -> usize {
    let topk = probabilities.len();
    let mut cumulative = 0.0f32;
    let mut crossing = topk - 1;
    for (rank, &p) in probabilities.iter().enumerate() {
        cumulative += p;
        if cumulative >= topp {
            crossing = rank;
            break;
        }
    }

    if crossing < topk - 1 {
        crossing + 1
    } else {
        topk
    }
}
