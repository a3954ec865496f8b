//! End-to-end driver runs against the host operator and injected faults

mod common;

use proptest::prelude::*;
use sampleforge::error::{ErrorCategory, ForgeError};
use sampleforge::harness::{
    check_equivalence, default_scenarios, Disagreement, DriverConfig, EquivalenceDriver,
    Scenario, ScenarioOutcome,
};
use sampleforge::operator::{
    read_index, Device, HostRandomSample, LifecycleCall, OpStatus, RandomSampleOperator,
    SampleArgs,
};
use sampleforge::sampler::{sample, SamplingConfig};
use sampleforge::tensor::{DataType, ScoreElement, ScoreVector, TensorDescriptor};

use common::{assert_balanced, Corruption, Fault, FaultInjectingOperator};

fn host_driver(config: DriverConfig) -> EquivalenceDriver<HostRandomSample> {
    EquivalenceDriver::new(HostRandomSample::new(), config)
}

#[test]
fn test_default_table_passes_on_host() {
    let mut driver = host_driver(DriverConfig::new());
    let report = driver.run_suite(&default_scenarios());

    assert!(report.all_passed(), "{}", report);
    assert_eq!(report.passed(), 9);
    assert_balanced(driver.ledger());
    assert_eq!(driver.operator().created(), 9);
    assert_eq!(driver.operator().live_descriptors(), 0);
}

#[test]
fn test_named_scenarios_pass_for_every_score_type() {
    let scenarios = [
        Scenario::new(512, 0.8, 0.8, 3, 0.5),
        Scenario::new(4096, 0.05, 0.9, 5, 1.0),
        Scenario::new(32000, 0.08, 1.0, 25, 1.0),
    ];
    for dtype in [DataType::F16, DataType::BF16, DataType::F32, DataType::F64] {
        let mut driver = host_driver(DriverConfig::new().with_dtype(dtype).with_seed(5));
        let report = driver.run_suite(&scenarios);
        assert!(report.all_passed(), "{}: {}", dtype, report);
        assert_balanced(driver.ledger());
    }
}

#[test]
fn test_greedy_ties_pass_through_tie_rule() {
    // bf16 merges neighbouring ramp values, so arg-max is ambiguous; the host
    // operator picks the last maximum and the reference the first
    let mut driver = host_driver(DriverConfig::new().with_dtype(DataType::BF16));
    let report = driver
        .run_scenario(0, &Scenario::new(16384, 0.15, 0.0, 1, 2.0))
        .unwrap();
    assert!(report.actual_index < 16384);
    assert_balanced(driver.ledger());
}

#[test]
fn test_debug_and_profile_do_not_change_outcome() {
    let config = DriverConfig::new()
        .with_debug(true)
        .with_profile(true)
        .with_num_prerun(2)
        .with_num_iterations(5);
    let mut driver = host_driver(config);
    let report = driver.run_suite(&default_scenarios()[..3]);
    assert!(report.all_passed());
    for outcome in &report.outcomes {
        match outcome {
            ScenarioOutcome::Passed(r) => {
                let profile = r.profile.as_ref().unwrap();
                assert_eq!(profile.operator.iterations, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

fn profiled_config() -> DriverConfig {
    DriverConfig::new()
        .with_profile(true)
        .with_num_prerun(1)
        .with_num_iterations(3)
}

#[test]
fn test_offload_device_fences_every_timed_call() {
    let operator = FaultInjectingOperator::healthy().with_device(Device::Nvidia);
    let mut driver = EquivalenceDriver::new(operator, profiled_config());
    let report = driver.run_suite(&[Scenario::new(256, 0.3, 0.9, 4, 1.0)]);

    assert!(report.all_passed(), "{}", report);
    assert_eq!(report.device, Device::Nvidia);
    // checked run, then 1 warm-up and 3 timed calls
    assert_eq!(driver.operator().synchronize_calls(), 5);
    assert_eq!(driver.operator().inner().executions(), 5);
}

#[test]
fn test_host_device_fences_once_after_timing() {
    let mut driver = EquivalenceDriver::new(FaultInjectingOperator::healthy(), profiled_config());
    let report = driver.run_suite(&[Scenario::new(256, 0.3, 0.9, 4, 1.0)]);

    assert!(report.all_passed(), "{}", report);
    assert_eq!(report.device, Device::Cpu);
    assert_eq!(driver.operator().synchronize_calls(), 2);
    assert_eq!(driver.operator().inner().executions(), 5);
}

#[test]
fn test_same_seed_reproduces_reports() {
    let config = DriverConfig::new().with_seed(99);
    let first = host_driver(config.clone()).run_suite(&default_scenarios());
    let second = host_driver(config).run_suite(&default_scenarios());
    assert_eq!(first, second);
}

#[test]
fn test_out_of_range_index_is_mismatch() {
    let operator = FaultInjectingOperator::new(Fault::Corrupt(Corruption::OutOfRange));
    let mut driver = EquivalenceDriver::new(operator, DriverConfig::new());

    let err = driver
        .run_scenario(0, &Scenario::new(512, 0.8, 0.8, 3, 0.5))
        .unwrap_err();
    match &err {
        ForgeError::EquivalenceMismatch(report) => {
            assert_eq!(
                report.disagreement,
                Disagreement::OutOfRange {
                    actual: u64::MAX,
                    voc: 512
                }
            );
            assert_eq!(report.scenario.topk, 3);
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
    assert_eq!(err.category(), ErrorCategory::Mismatch);
    assert_balanced(driver.ledger());
    assert_eq!(driver.operator().inner().live_descriptors(), 0);
}

#[test]
fn test_wrong_index_is_mismatch_with_scores() {
    // f32 keeps every ramp value distinct, so a neighbour never ties
    let operator = FaultInjectingOperator::new(Fault::Corrupt(Corruption::NextIndex));
    let mut driver = EquivalenceDriver::new(operator, DriverConfig::new().with_dtype(DataType::F32));

    let err = driver
        .run_scenario(0, &Scenario::new(4096, 0.05, 0.9, 5, 1.0))
        .unwrap_err();
    match err {
        ForgeError::EquivalenceMismatch(report) => match report.disagreement {
            Disagreement::DifferentScore {
                expected_index,
                actual_index,
                expected_score,
                actual_score,
            } => {
                assert_ne!(expected_index, actual_index);
                assert_ne!(expected_score, actual_score);
            }
            other => panic!("expected score mismatch, got {:?}", other),
        },
        other => panic!("expected mismatch, got {:?}", other),
    }
    assert_balanced(driver.ledger());
}

#[test]
fn test_every_failing_call_aborts_scenario_and_releases() {
    let calls = [
        LifecycleCall::CreateDescriptor,
        LifecycleCall::WorkspaceSize,
        LifecycleCall::Execute,
        LifecycleCall::Synchronize,
        LifecycleCall::DestroyDescriptor,
    ];
    for call in calls {
        let operator = FaultInjectingOperator::new(Fault::FailAt(call, OpStatus::InternalError));
        let mut driver = EquivalenceDriver::new(operator, DriverConfig::new());

        let err = driver
            .run_scenario(0, &Scenario::new(512, 0.8, 0.8, 3, 0.5))
            .unwrap_err();
        match err {
            ForgeError::ExternalCall { call: failed, status } => {
                assert_eq!(failed, call);
                assert_eq!(status, OpStatus::InternalError);
            }
            other => panic!("{}: expected external failure, got {:?}", call, other),
        }
        assert_balanced(driver.ledger());
        assert_eq!(driver.operator().inner().live_descriptors(), 0, "{}", call);

        // Nothing past the failed call runs except the destroy
        let ran_execute = driver.operator().inner().executions() > 0;
        let ran_synchronize = driver.operator().synchronize_calls() > 0;
        match call {
            LifecycleCall::CreateDescriptor | LifecycleCall::WorkspaceSize => {
                assert!(!ran_execute && !ran_synchronize, "{}", call)
            }
            LifecycleCall::Execute => assert!(!ran_synchronize, "{}", call),
            _ => {}
        }
    }
}

#[test]
fn test_suite_continues_after_failure() {
    let operator = FaultInjectingOperator::new(Fault::FailAt(
        LifecycleCall::Execute,
        OpStatus::Unknown(77),
    ));
    let mut driver = EquivalenceDriver::new(operator, DriverConfig::new());
    let report = driver.run_suite(&default_scenarios());

    assert_eq!(report.outcomes.len(), 9);
    assert_eq!(report.failed(), 9);
    assert!(report.failures().all(|o| matches!(
        o,
        ScenarioOutcome::Failed {
            category: ErrorCategory::External,
            ..
        }
    )));
    assert_balanced(driver.ledger());
}

#[test]
fn test_invalid_scenarios_are_reported_not_run() {
    let mut driver = host_driver(DriverConfig::new());
    let report = driver.run_suite(&[
        Scenario::new(0, 0.5, 0.9, 1, 1.0),
        Scenario::new(64, 0.5, 0.9, 3, -1.0),
        Scenario::new(64, 0.5, 0.9, 3, 1.0),
    ]);
    assert_eq!(report.failed(), 2);
    assert!(report.outcomes[2].is_passed());
    assert_eq!(driver.operator().created(), 1);
}

#[test]
fn test_report_serializes_to_json() {
    let mut driver = host_driver(DriverConfig::new());
    let report = driver.run_suite(&default_scenarios()[..2]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["operator"], "host");
    assert_eq!(json["device"], "cpu");
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
    assert_eq!(json["outcomes"][0]["dtype"], "f16");
}

fn run_host<T: ScoreElement>(scores: &ScoreVector<T>, config: &SamplingConfig) -> u64 {
    let mut op = HostRandomSample::new();
    let input = scores.descriptor();
    let output = TensorDescriptor::contiguous(DataType::U64, &[1]);
    let desc = op.create(&output, &input).unwrap();
    let mut workspace = vec![0u8; op.workspace_size(&desc).unwrap()];
    let mut out = [0u8; 8];
    op.execute(
        &desc,
        &mut workspace,
        &mut out,
        &scores.to_bytes(),
        SampleArgs::from(config),
        None,
    )
    .unwrap();
    op.destroy(desc).unwrap();
    read_index(&out).unwrap()
}

proptest! {
    #[test]
    fn test_host_agrees_with_reference_on_arbitrary_vectors(
        values in prop::collection::vec(-8.0f32..8.0, 2..200),
        random_val in 0.0f32..1.0,
        topp in 0.0f32..=1.0,
        topk_fraction in 0.0f64..1.0,
        temperature in 0.2f32..3.0,
    ) {
        let voc = values.len();
        let topk = 1 + (topk_fraction * voc as f64) as i32;
        let topk = topk.min(voc as i32);
        let config = SamplingConfig::new(random_val, topp, topk, temperature);

        let scores = ScoreVector::new(values);
        let expected = sample(scores.as_slice(), &config).unwrap();
        let actual = run_host(&scores, &config);
        prop_assert!(check_equivalence(scores.as_slice(), expected.index, actual).is_ok());
    }

    #[test]
    fn test_host_agrees_on_wide_f64_vectors(
        values in prop::collection::vec(-1.0e300f64..1.0e300, 2..64),
        random_val in 0.0f32..1.0,
        topp in 0.05f32..=1.0,
    ) {
        let topk = values.len() as i32;
        let config = SamplingConfig::new(random_val, topp, topk, 1.0);

        let scores = ScoreVector::new(values);
        let expected = sample(scores.as_slice(), &config).unwrap();
        // Gaps this wide leave all the mass on the maximum
        let best = scores.as_slice().iter().cloned().fold(f64::MIN, f64::max);
        prop_assert_eq!(expected.score, best);
        let actual = run_host(&scores, &config);
        prop_assert!(check_equivalence(scores.as_slice(), expected.index, actual).is_ok());
    }

    #[test]
    fn test_host_agrees_on_quantized_ties(
        levels in prop::collection::vec(0u8..6, 4..120),
        random_val in 0.0f32..1.0,
        topp in 0.05f32..=1.0,
    ) {
        // Few distinct values: many ties inside and across the top-k boundary
        let values: Vec<f32> = levels.iter().map(|&l| l as f32 * 0.5).collect();
        let topk = (values.len() / 3).max(2) as i32;
        let config = SamplingConfig::new(random_val, topp, topk, 1.0);

        let scores = ScoreVector::new(values);
        let expected = sample(scores.as_slice(), &config).unwrap();
        let actual = run_host(&scores, &config);
        prop_assert!(check_equivalence(scores.as_slice(), expected.index, actual).is_ok());
    }
}
