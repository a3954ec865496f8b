//! Reference random-sample operator
//!
//! Temperature-scaled, top-k restricted, top-p filtered selection over a
//! single score vector, with a pure arg-max fallback. The reference is the
//! ground truth accelerated implementations are compared against; it is a
//! pure function of its inputs.

pub mod ranking;
pub mod reference;

pub use ranking::{argmax, top_k, RankedCandidate};
pub use reference::{sample, sample_ranked, NucleusTrace, Selection};

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the reference sampler for unusable inputs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error("Empty score vector")]
    EmptyScores,

    #[error("Invalid temperature: {0}. Must be finite and > 0")]
    InvalidTemperature(f32),

    #[error("Invalid top_k: {topk}. Must be in 1..={voc}")]
    InvalidTopK { topk: i32, voc: usize },

    #[error("Invalid top_p: {0}. Must be in [0, 1]")]
    InvalidTopP(f32),

    #[error("Invalid random value: {0}. Must be in [0, 1)")]
    InvalidRandomValue(f32),

    #[error("Score at index {0} is not finite")]
    NonFiniteScore(usize),
}

pub type SamplerResult<T> = Result<T, SamplerError>;

/// Sampling knobs for one invocation
///
/// `random_val` is drawn by the caller, so two implementations fed the same
/// config must make the same choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub random_val: f32,
    pub topp: f32,
    pub topk: i32,
    pub temperature: f32,
}

impl SamplingConfig {
    pub fn new(random_val: f32, topp: f32, topk: i32, temperature: f32) -> Self {
        SamplingConfig {
            random_val,
            topp,
            topk,
            temperature,
        }
    }

    /// Config that always takes the arg-max
    pub fn greedy() -> Self {
        SamplingConfig::new(0.0, 0.0, 1, 1.0)
    }

    /// Whether sampling degenerates to a plain arg-max
    pub fn is_greedy(&self) -> bool {
        self.topp <= 0.0 || self.topk <= 1
    }

    /// Check every knob against a vocabulary of `voc` entries
    pub fn validate(&self, voc: usize) -> SamplerResult<()> {
        if voc == 0 {
            return Err(SamplerError::EmptyScores);
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(SamplerError::InvalidTemperature(self.temperature));
        }
        if self.topk <= 0 || self.topk as usize > voc {
            return Err(SamplerError::InvalidTopK {
                topk: self.topk,
                voc,
            });
        }
        if !(0.0..=1.0).contains(&self.topp) {
            return Err(SamplerError::InvalidTopP(self.topp));
        }
        if !(0.0..1.0).contains(&self.random_val) {
            return Err(SamplerError::InvalidRandomValue(self.random_val));
        }
        Ok(())
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig::new(0.5, 0.9, 50, 1.0)
    }
}
