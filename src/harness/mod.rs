//! Equivalence testing of a random-sample operator against the reference
//!
//! - [`config`]: process-wide driver settings
//! - [`scenario`]: scenario rows and the default table
//! - [`equivalence`]: the tie-aware comparison
//! - [`driver`]: per-scenario lifecycle and suite runner
//! - [`report`]: outcomes and summaries

pub mod config;
pub mod driver;
pub mod equivalence;
pub mod report;
pub mod scenario;

pub use config::DriverConfig;
pub use driver::EquivalenceDriver;
pub use equivalence::{check_equivalence, Agreement, Disagreement, MismatchReport};
pub use report::{ProfileReport, ScenarioOutcome, ScenarioReport, SuiteReport};
pub use scenario::{default_scenarios, Scenario, SCORE_STEP};
