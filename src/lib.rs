//! SampleForge - random-sample operator verification
//!
//! A reference implementation of temperature-scaled, top-k restricted,
//! top-p filtered sampling over a single score vector, and a driver that
//! checks an accelerated operator against it under a tie-aware equality
//! rule.

#![allow(clippy::too_many_arguments)] // Operator execute calls carry many scalars
#![allow(clippy::missing_safety_doc)] // FFI bindings documented at module level

pub mod backend;
pub mod error;
pub mod harness;
pub mod logging;
pub mod operator;
pub mod profiling;
pub mod sampler;
pub mod tensor;

pub use backend::{ResourceLedger, Workspace, WorkspaceAllocator};
pub use error::{ErrorCategory, ForgeError, ForgeResult};
pub use harness::{default_scenarios, DriverConfig, EquivalenceDriver, Scenario, SuiteReport};
pub use logging::{init_logging_default, init_with_config, LoggingConfig};
pub use operator::{HostRandomSample, OpStatus, RandomSampleOperator, SampleArgs};
pub use profiling::{KernelTimer, ScopedTimer};
pub use sampler::{sample, SamplerError, SamplingConfig, Selection};
pub use tensor::{DataType, ScoreVector, TensorDescriptor};
