//! Unified error handling for SampleForge
//!
//! Every failure the driver can hit while running a scenario folds into
//! [`ForgeError`]. Categories separate bad inputs from failing operator calls
//! and from genuine disagreements with the reference.

use std::fmt;

use crate::backend::WorkspaceError;
use crate::harness::MismatchReport;
use crate::operator::{LifecycleCall, OpStatus};
use crate::sampler::SamplerError;

/// Unified error type for SampleForge
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// Sampling knobs or scores rejected by the reference
    #[error("Invalid sampling configuration: {0}")]
    Configuration(#[from] SamplerError),

    /// An operator lifecycle call returned a non-success status
    #[error("Operator {call} failed: {status} (code {code})", code = .status.code())]
    ExternalCall {
        call: LifecycleCall,
        status: OpStatus,
    },

    /// Operator and reference disagree under the tie-aware rule
    #[error("Equivalence mismatch: {0}")]
    EquivalenceMismatch(Box<MismatchReport>),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Scenario parameters that cannot even be handed to the reference
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    /// Driver or logging configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ForgeError {
    pub fn external(call: LifecycleCall, status: OpStatus) -> Self {
        ForgeError::ExternalCall { call, status }
    }

    /// Categorize the error for reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForgeError::Configuration(_)
            | ForgeError::InvalidScenario(_)
            | ForgeError::InvalidConfiguration(_) => ErrorCategory::Configuration,
            ForgeError::ExternalCall { .. } => ErrorCategory::External,
            ForgeError::EquivalenceMismatch(_) => ErrorCategory::Mismatch,
            ForgeError::Workspace(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self.category(), ErrorCategory::Mismatch)
    }
}

/// Error category for reporting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorCategory {
    /// Invalid input or configuration
    Configuration,
    /// Operator returned a failure status
    External,
    /// Operator answer disagrees with the reference
    Mismatch,
    /// Host-side resource failure
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::External => write!(f, "External"),
            ErrorCategory::Mismatch => write!(f, "Mismatch"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

pub type ForgeResult<T> = std::result::Result<T, ForgeError>;
