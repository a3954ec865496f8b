//! Per-scenario and per-suite results

use serde::Serialize;
use std::fmt;

use super::equivalence::Agreement;
use super::Scenario;
use crate::error::{ErrorCategory, ForgeError};
use crate::operator::Device;
use crate::profiling::{speedup, ProfileSample};
use crate::tensor::DataType;

/// Timing of both paths for one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    pub reference: ProfileSample,
    pub operator: ProfileSample,
}

impl ProfileReport {
    /// Reference time over operator time
    pub fn speedup(&self) -> Option<f64> {
        speedup(&self.reference, &self.operator)
    }
}

/// A scenario that passed the equivalence check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub dtype: DataType,
    pub seed: u64,
    pub expected_index: usize,
    pub actual_index: usize,
    pub agreement: Agreement,
    pub profile: Option<ProfileReport>,
}

/// Outcome of one suite entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ScenarioOutcome {
    Passed(ScenarioReport),
    Failed {
        scenario: Scenario,
        category: ErrorCategory,
        message: String,
    },
}

impl ScenarioOutcome {
    pub fn failed(scenario: Scenario, error: &ForgeError) -> Self {
        ScenarioOutcome::Failed {
            scenario,
            category: error.category(),
            message: error.to_string(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioOutcome::Passed(_))
    }

    pub fn scenario(&self) -> &Scenario {
        match self {
            ScenarioOutcome::Passed(report) => &report.scenario,
            ScenarioOutcome::Failed { scenario, .. } => scenario,
        }
    }
}

/// Every outcome of a suite run, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub operator: String,
    pub device: Device,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn new(operator: impl Into<String>, device: Device) -> Self {
        SuiteReport {
            operator: operator.into(),
            device,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.is_passed())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} on {}: {} passed, {} failed, {} total",
            self.operator,
            self.device,
            self.passed(),
            self.failed(),
            self.outcomes.len()
        )
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match outcome {
                ScenarioOutcome::Passed(report) => {
                    write!(f, "PASS  {}", report.scenario)?;
                    if let Some(profile) = &report.profile {
                        write!(
                            f,
                            "  reference {:.6} ms, operator {:.6} ms",
                            profile.reference.avg_ms, profile.operator.avg_ms
                        )?;
                        if let Some(x) = profile.speedup() {
                            write!(f, " ({:.2}x)", x)?;
                        }
                    }
                    writeln!(f)?;
                }
                ScenarioOutcome::Failed {
                    scenario,
                    category,
                    message,
                } => writeln!(f, "FAIL  {}  [{}] {}", scenario, category, message)?,
            }
        }
        write!(f, "{}", self.summary())
    }
}
