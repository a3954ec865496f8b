//! Scenario definitions and the default table

use serde::Serialize;
use std::fmt;

use crate::error::{ForgeError, ForgeResult};
use crate::operator::SampleArgs;
use crate::sampler::SamplingConfig;

/// Gap between consecutive generated scores before the shuffle
pub const SCORE_STEP: f32 = 1e-4;

/// One row of the verification table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scenario {
    pub voc: usize,
    pub random_val: f32,
    pub topp: f32,
    pub topk: i32,
    pub temperature: f32,
}

impl Scenario {
    pub fn new(voc: usize, random_val: f32, topp: f32, topk: i32, temperature: f32) -> Self {
        Scenario {
            voc,
            random_val,
            topp,
            topk,
            temperature,
        }
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig::new(self.random_val, self.topp, self.topk, self.temperature)
    }

    pub fn sample_args(&self) -> SampleArgs {
        SampleArgs::from(&self.sampling_config())
    }

    /// Whether this row exercises the arg-max path
    pub fn is_greedy(&self) -> bool {
        self.sampling_config().is_greedy()
    }

    pub fn validate(&self) -> ForgeResult<()> {
        if self.voc == 0 {
            return Err(ForgeError::InvalidScenario(
                "vocabulary size must be at least 1".to_string(),
            ));
        }
        self.sampling_config().validate(self.voc)?;
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "voc={} random_val={} topp={} topk={} temperature={}",
            self.voc, self.random_val, self.topp, self.topk, self.temperature
        )
    }
}

/// The standard verification table
///
/// Covers small and large vocabularies, nucleus and arg-max paths, a repeated
/// arg-max row and a full-mass (`topp = 1.0`) row.
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(512, 0.8, 0.8, 3, 0.5),
        Scenario::new(4096, 0.05, 0.9, 5, 1.0),
        Scenario::new(16384, 0.15, 0.85, 10, 2.0),
        Scenario::new(512, 0.08, 0.0, 3, 0.5),
        Scenario::new(4096, 0.5, 0.9, 1, 1.0),
        Scenario::new(16384, 0.15, 0.0, 1, 2.0),
        Scenario::new(16384, 0.15, 0.0, 1, 2.0),
        Scenario::new(32000, 0.08, 0.8, 50, 1.0),
        Scenario::new(32000, 0.08, 1.0, 25, 1.0),
    ]
}
