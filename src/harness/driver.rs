//! Equivalence test driver
//!
//! For each scenario: synthesize a shuffled score ramp, compute the reference
//! pick, run the operator through its full lifecycle, and apply the
//! tie-aware check. The descriptor and workspace are scoped to the scenario
//! and released on every exit path.

use half::{bf16, f16};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use super::equivalence::{check_equivalence, MismatchReport};
use super::report::{ProfileReport, ScenarioOutcome, ScenarioReport, SuiteReport};
use super::{DriverConfig, Scenario, SCORE_STEP};
use crate::backend::{ResourceLedger, WorkspaceAllocator};
use crate::error::{ForgeError, ForgeResult};
use crate::operator::{read_index, DescriptorGuard, RandomSampleOperator, SampleArgs};
use crate::profiling::{try_profile_operation, ProfileSample, ScopedTimer};
use crate::sampler::{self, SamplingConfig, Selection};
use crate::tensor::{DataType, ScoreElement, ScoreVector, TensorDescriptor};

/// Runs scenarios against one operator
pub struct EquivalenceDriver<O: RandomSampleOperator> {
    operator: O,
    config: DriverConfig,
    allocator: WorkspaceAllocator,
}

impl<O: RandomSampleOperator> EquivalenceDriver<O> {
    pub fn new(operator: O, config: DriverConfig) -> Self {
        EquivalenceDriver {
            operator,
            config,
            allocator: WorkspaceAllocator::new(ResourceLedger::new()),
        }
    }

    /// Cap on a single workspace request
    pub fn with_workspace_limit(mut self, max_bytes: usize) -> Self {
        self.allocator = self.allocator.with_max_bytes(max_bytes);
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Ledger shared by workspaces and descriptors of this driver
    pub fn ledger(&self) -> &ResourceLedger {
        self.allocator.ledger()
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn operator_mut(&mut self) -> &mut O {
        &mut self.operator
    }

    pub fn into_operator(self) -> O {
        self.operator
    }

    /// Run one scenario; `ordinal` selects the permutation seed
    pub fn run_scenario(&mut self, ordinal: usize, scenario: &Scenario) -> ForgeResult<ScenarioReport> {
        scenario.validate()?;
        info!(
            "[{}@{}] scenario {}: {} dtype={}",
            self.operator.name(),
            self.operator.device(),
            ordinal,
            scenario,
            self.config.dtype
        );
        let _timer = ScopedTimer::new(format!("[{}] scenario {}", self.operator.name(), ordinal));

        let result = match self.config.dtype {
            DataType::F16 => self.run_typed::<f16>(ordinal, scenario),
            DataType::BF16 => self.run_typed::<bf16>(ordinal, scenario),
            DataType::F32 => self.run_typed::<f32>(ordinal, scenario),
            DataType::F64 => self.run_typed::<f64>(ordinal, scenario),
            other => Err(ForgeError::InvalidConfiguration(format!(
                "dtype {} cannot hold scores",
                other
            ))),
        };

        match &result {
            Ok(report) => info!(
                "[{}] scenario {} passed: index {} ({:?})",
                self.operator.name(),
                ordinal,
                report.actual_index,
                report.agreement
            ),
            Err(e) if e.is_mismatch() => error!("[{}] scenario {}: {}", self.operator.name(), ordinal, e),
            Err(e) => warn!("[{}] scenario {} failed: {}", self.operator.name(), ordinal, e),
        }
        result
    }

    /// Run every scenario, recording each outcome
    pub fn run_suite(&mut self, scenarios: &[Scenario]) -> SuiteReport {
        let mut report = SuiteReport::new(self.operator.name(), self.operator.device());
        for (ordinal, scenario) in scenarios.iter().enumerate() {
            let outcome = match self.run_scenario(ordinal, scenario) {
                Ok(passed) => ScenarioOutcome::Passed(passed),
                Err(e) => ScenarioOutcome::failed(*scenario, &e),
            };
            report.push(outcome);

            if !self.ledger().is_balanced() {
                error!(
                    "resources leaked after scenario {}: {:?}",
                    ordinal,
                    self.ledger().snapshot()
                );
            }
        }
        info!("{}", report.summary());
        report
    }

    fn run_typed<T: ScoreElement>(
        &mut self,
        ordinal: usize,
        scenario: &Scenario,
    ) -> ForgeResult<ScenarioReport> {
        let seed = self.config.scenario_seed(ordinal);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scores = ScoreVector::<T>::permuted_ramp(scenario.voc, SCORE_STEP, &mut rng);
        let sampling = scenario.sampling_config();
        let args = scenario.sample_args();

        let expected = sampler::sample(scores.as_slice(), &sampling)?;

        let input = scores.to_bytes();
        let mut output = vec![0u8; DataType::U64.size_in_bytes()];
        let mut input_desc = scores.descriptor();
        let mut output_desc = TensorDescriptor::contiguous(DataType::U64, &[1]);

        let ledger = self.allocator.ledger().clone();
        let mut guard = DescriptorGuard::create(&mut self.operator, &output_desc, &input_desc, ledger)?;
        input_desc.invalidate();
        output_desc.invalidate();

        let workspace_size = guard.workspace_size()?;
        let mut workspace = self.allocator.acquire(workspace_size)?;

        guard.execute(&mut workspace, &mut output, &input, args, None)?;
        guard.synchronize()?;

        let actual = read_index(&output).ok_or_else(|| {
            ForgeError::InvalidScenario("output buffer shorter than one index".to_string())
        })?;

        let agreement = check_equivalence(scores.as_slice(), expected.index, actual).map_err(
            |disagreement| {
                ForgeError::EquivalenceMismatch(Box::new(MismatchReport {
                    scenario: *scenario,
                    dtype: T::DTYPE,
                    seed,
                    disagreement,
                }))
            },
        )?;
        // In range once the check passed
        let actual_index = actual as usize;

        if self.config.debug {
            log_comparison(&scores, &sampling, &expected, actual_index);
        }

        let profile = if self.config.profile {
            let timed = profile_paths(
                &self.config,
                &scores,
                &sampling,
                &mut guard,
                &mut workspace,
                &mut output,
                &input,
                args,
            );
            match timed {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!("profiling skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };

        drop(workspace);
        guard.destroy()?;

        Ok(ScenarioReport {
            scenario: *scenario,
            dtype: T::DTYPE,
            seed,
            expected_index: expected.index,
            actual_index,
            agreement,
            profile,
        })
    }
}

fn log_comparison<T: ScoreElement>(
    scores: &ScoreVector<T>,
    sampling: &SamplingConfig,
    expected: &Selection,
    actual: usize,
) {
    let actual_score = scores.get(actual).map(|s| s.to_f64()).unwrap_or(f64::NAN);
    info!(
        "reference index {} (score {}), operator index {} (score {})",
        expected.index, expected.score, actual, actual_score
    );

    if sampling.is_greedy() {
        return;
    }
    match sampler::sample_ranked(scores.as_slice(), sampling) {
        Ok(trace) => debug!(
            "nucleus: end={} of {}, threshold={}, selected rank {}",
            trace.end,
            trace.candidates.len(),
            trace.threshold,
            trace.selected_rank
        ),
        Err(e) => debug!("nucleus trace unavailable: {}", e),
    }
}

#[allow(clippy::too_many_arguments)]
fn profile_paths<T: ScoreElement, O: RandomSampleOperator>(
    config: &DriverConfig,
    scores: &ScoreVector<T>,
    sampling: &SamplingConfig,
    guard: &mut DescriptorGuard<'_, O>,
    workspace: &mut [u8],
    output: &mut [u8],
    input: &[u8],
    args: SampleArgs,
) -> ForgeResult<ProfileReport> {
    let reference: ProfileSample =
        try_profile_operation("reference", config.num_prerun, config.num_iterations, || {
            sampler::sample(scores.as_slice(), sampling)
                .map(|_| ())
                .map_err(ForgeError::from)
        })?;

    // Host-visible devices finish inside execute; fence once after the loop
    let barrier = guard.device().needs_host_barrier();
    let label = guard.operator_name().to_string();
    let operator = try_profile_operation(&label, config.num_prerun, config.num_iterations, || {
        guard.execute(workspace, output, input, args, None)?;
        if barrier {
            guard.synchronize()?;
        }
        Ok::<(), ForgeError>(())
    })?;
    if !barrier {
        guard.synchronize()?;
    }

    let profile = ProfileReport {
        reference,
        operator,
    };
    info!(
        "reference {:.6} ms, {} {:.6} ms, speedup {}",
        profile.reference.avg_ms,
        profile.operator.label,
        profile.operator.avg_ms,
        profile
            .speedup()
            .map(|x| format!("{:.2}x", x))
            .unwrap_or_else(|| "n/a".to_string())
    );
    Ok(profile)
}
