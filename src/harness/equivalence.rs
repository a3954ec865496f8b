//! Tie-aware comparison of an operator answer with the reference
//!
//! The operator passes when it returns the reference index, or any index
//! whose score is exactly equal (in the element type) to the reference pick.

use serde::Serialize;
use std::fmt;

use super::Scenario;
use crate::tensor::{DataType, ScoreElement};

/// How the answers agreed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Agreement {
    SameIndex,
    /// Different index carrying an identical score
    TiedScore,
}

/// How the answers disagreed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Disagreement {
    /// Operator index is not a valid token id
    OutOfRange { actual: u64, voc: usize },
    DifferentScore {
        expected_index: usize,
        expected_score: f64,
        actual_index: usize,
        actual_score: f64,
    },
}

impl fmt::Display for Disagreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disagreement::OutOfRange { actual, voc } => {
                write!(f, "operator returned index {} outside [0, {})", actual, voc)
            }
            Disagreement::DifferentScore {
                expected_index,
                expected_score,
                actual_index,
                actual_score,
            } => write!(
                f,
                "expected index {} (score {}), operator returned {} (score {})",
                expected_index, expected_score, actual_index, actual_score
            ),
        }
    }
}

/// Compare `actual` against the reference pick `expected`
pub fn check_equivalence<T: ScoreElement>(
    scores: &[T],
    expected: usize,
    actual: u64,
) -> Result<Agreement, Disagreement> {
    let voc = scores.len();
    let actual_index = match usize::try_from(actual) {
        Ok(i) if i < voc => i,
        _ => return Err(Disagreement::OutOfRange { actual, voc }),
    };

    if actual_index == expected {
        return Ok(Agreement::SameIndex);
    }
    if scores[actual_index] == scores[expected] {
        return Ok(Agreement::TiedScore);
    }
    Err(Disagreement::DifferentScore {
        expected_index: expected,
        expected_score: scores[expected].to_f64(),
        actual_index,
        actual_score: scores[actual_index].to_f64(),
    })
}

/// Everything needed to reproduce a failed comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchReport {
    pub scenario: Scenario,
    pub dtype: DataType,
    pub seed: u64,
    pub disagreement: Disagreement,
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}, seed={}]",
            self.disagreement, self.dtype, self.scenario, self.seed
        )
    }
}
