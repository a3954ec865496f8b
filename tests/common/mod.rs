//! Shared test utilities
//!
//! - [`FaultInjectingOperator`]: the host operator with one scripted failure
//! - [`ramp_scores`]: shuffled score ramps like the driver generates
//! - [`assert_balanced`]: resource-leak check on a driver's ledger

#![allow(dead_code)]

use anyhow::Context;
use std::cell::Cell;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sampleforge::backend::ResourceLedger;
use sampleforge::harness::SCORE_STEP;
use sampleforge::operator::{
    read_index, write_index, Device, HostRandomSample, HostSampleDescriptor, LifecycleCall,
    OpResult, OpStatus, RandomSampleOperator, SampleArgs, StreamToken,
};
use sampleforge::tensor::{ScoreElement, ScoreVector, TensorDescriptor};
pub use serial_test::serial;

/// How a corrupted answer is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Write `u64::MAX`
    OutOfRange,
    /// Write the neighbour of the correct index
    NextIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Return `status` from the given call
    FailAt(LifecycleCall, OpStatus),
    /// Succeed but write a wrong index
    Corrupt(Corruption),
}

/// Host operator wrapped with at most one injected fault
///
/// It can also pose as another device and counts synchronize calls.
#[derive(Debug)]
pub struct FaultInjectingOperator {
    inner: HostRandomSample,
    fault: Option<Fault>,
    device: Device,
    synchronized: Cell<usize>,
}

impl FaultInjectingOperator {
    pub fn new(fault: Fault) -> Self {
        FaultInjectingOperator {
            fault: Some(fault),
            ..Self::healthy()
        }
    }

    /// No fault; behaves like the host operator
    pub fn healthy() -> Self {
        FaultInjectingOperator {
            inner: HostRandomSample::new(),
            fault: None,
            device: Device::Cpu,
            synchronized: Cell::new(0),
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn inner(&self) -> &HostRandomSample {
        &self.inner
    }

    pub fn synchronize_calls(&self) -> usize {
        self.synchronized.get()
    }

    fn failure_at(&self, call: LifecycleCall) -> OpResult<()> {
        match self.fault {
            Some(Fault::FailAt(at, status)) if at == call => Err(status),
            _ => Ok(()),
        }
    }
}

impl RandomSampleOperator for FaultInjectingOperator {
    type Descriptor = HostSampleDescriptor;

    fn name(&self) -> &str {
        "faulty-host"
    }

    fn device(&self) -> Device {
        self.device
    }

    fn create(
        &mut self,
        output: &TensorDescriptor,
        input: &TensorDescriptor,
    ) -> OpResult<HostSampleDescriptor> {
        self.failure_at(LifecycleCall::CreateDescriptor)?;
        self.inner.create(output, input)
    }

    fn workspace_size(&self, descriptor: &HostSampleDescriptor) -> OpResult<usize> {
        self.failure_at(LifecycleCall::WorkspaceSize)?;
        self.inner.workspace_size(descriptor)
    }

    fn execute(
        &mut self,
        descriptor: &HostSampleDescriptor,
        workspace: &mut [u8],
        output: &mut [u8],
        input: &[u8],
        args: SampleArgs,
        stream: Option<StreamToken>,
    ) -> OpResult<()> {
        self.failure_at(LifecycleCall::Execute)?;
        self.inner
            .execute(descriptor, workspace, output, input, args, stream)?;

        match self.fault {
            Some(Fault::Corrupt(Corruption::OutOfRange)) => write_index(output, u64::MAX),
            Some(Fault::Corrupt(Corruption::NextIndex)) => {
                let actual = read_index(output).ok_or(OpStatus::BadTensorShape)?;
                write_index(output, (actual + 1) % descriptor.voc() as u64)
            }
            _ => Ok(()),
        }
    }

    fn synchronize(&self) -> OpResult<()> {
        self.synchronized.set(self.synchronized.get() + 1);
        self.failure_at(LifecycleCall::Synchronize)
    }

    fn destroy(&mut self, descriptor: HostSampleDescriptor) -> OpResult<()> {
        self.inner.destroy(descriptor)?;
        self.failure_at(LifecycleCall::DestroyDescriptor)
    }
}

/// Shuffled `i * SCORE_STEP` ramp, seeded
pub fn ramp_scores<T: ScoreElement>(voc: usize, seed: u64) -> ScoreVector<T> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    ScoreVector::permuted_ramp(voc, SCORE_STEP, &mut rng)
}

/// Panic with the ledger contents if anything is still held
pub fn assert_balanced(ledger: &ResourceLedger) {
    assert!(
        ledger.is_balanced(),
        "resources still held: {:?}",
        ledger.snapshot()
    );
}

pub fn create_temp_dir() -> anyhow::Result<tempfile::TempDir> {
    tempfile::tempdir().context("Failed to create temporary directory for test")
}
