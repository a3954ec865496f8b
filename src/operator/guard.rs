//! Scoped ownership of an operator descriptor

use super::{Device, LifecycleCall, RandomSampleOperator, SampleArgs, StreamToken};
use crate::backend::ResourceLedger;
use crate::error::{ForgeError, ForgeResult};
use crate::tensor::TensorDescriptor;

/// Holds a live descriptor and destroys it exactly once
///
/// `destroy` reports the destroy status to the caller. If the guard is
/// dropped first (early return on mismatch or a failed call), the destroy
/// still runs and a failure is only logged.
pub struct DescriptorGuard<'op, O: RandomSampleOperator> {
    operator: &'op mut O,
    descriptor: Option<O::Descriptor>,
    ledger: ResourceLedger,
}

impl<'op, O: RandomSampleOperator> DescriptorGuard<'op, O> {
    pub fn create(
        operator: &'op mut O,
        output: &TensorDescriptor,
        input: &TensorDescriptor,
        ledger: ResourceLedger,
    ) -> ForgeResult<Self> {
        tracing::debug!("{}: {}", operator.name(), LifecycleCall::CreateDescriptor);
        let descriptor = operator
            .create(output, input)
            .map_err(|status| ForgeError::external(LifecycleCall::CreateDescriptor, status))?;
        ledger.record_descriptor_created();
        Ok(DescriptorGuard {
            operator,
            descriptor: Some(descriptor),
            ledger,
        })
    }

    fn live(&self, call: LifecycleCall) -> ForgeResult<&O::Descriptor> {
        self.descriptor.as_ref().ok_or_else(|| {
            ForgeError::InvalidScenario(format!("{} on a destroyed descriptor", call))
        })
    }

    pub fn workspace_size(&self) -> ForgeResult<usize> {
        let descriptor = self.live(LifecycleCall::WorkspaceSize)?;
        let size = self
            .operator
            .workspace_size(descriptor)
            .map_err(|status| ForgeError::external(LifecycleCall::WorkspaceSize, status))?;
        tracing::debug!("{}: workspace size {} bytes", self.operator.name(), size);
        Ok(size)
    }

    pub fn execute(
        &mut self,
        workspace: &mut [u8],
        output: &mut [u8],
        input: &[u8],
        args: SampleArgs,
        stream: Option<StreamToken>,
    ) -> ForgeResult<()> {
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or_else(|| ForgeError::InvalidScenario("execute on a destroyed descriptor".into()))?;
        self.operator
            .execute(descriptor, workspace, output, input, args, stream)
            .map_err(|status| ForgeError::external(LifecycleCall::Execute, status))
    }

    pub fn synchronize(&self) -> ForgeResult<()> {
        self.operator
            .synchronize()
            .map_err(|status| ForgeError::external(LifecycleCall::Synchronize, status))
    }

    pub fn operator_name(&self) -> &str {
        self.operator.name()
    }

    pub fn device(&self) -> Device {
        self.operator.device()
    }

    /// Destroy now and report the status
    pub fn destroy(mut self) -> ForgeResult<()> {
        match self.descriptor.take() {
            Some(descriptor) => {
                let result = self.operator.destroy(descriptor);
                self.ledger.record_descriptor_released();
                tracing::debug!("{}: {}", self.operator.name(), LifecycleCall::DestroyDescriptor);
                result.map_err(|status| {
                    ForgeError::external(LifecycleCall::DestroyDescriptor, status)
                })
            }
            None => Ok(()),
        }
    }
}

impl<O: RandomSampleOperator> Drop for DescriptorGuard<'_, O> {
    fn drop(&mut self) {
        if let Some(descriptor) = self.descriptor.take() {
            let result = self.operator.destroy(descriptor);
            self.ledger.record_descriptor_released();
            if let Err(status) = result {
                tracing::error!(
                    "{}: destroy on drop failed: {} (code {})",
                    self.operator.name(),
                    status,
                    status.code()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::HostRandomSample;
    use crate::tensor::DataType;

    fn descriptors() -> (TensorDescriptor, TensorDescriptor) {
        (
            TensorDescriptor::contiguous(DataType::U64, &[1]),
            TensorDescriptor::contiguous(DataType::F16, &[16]),
        )
    }

    #[test]
    fn test_drop_destroys_descriptor() {
        let mut op = HostRandomSample::new();
        let ledger = ResourceLedger::new();
        let (out, input) = descriptors();
        {
            let guard = DescriptorGuard::create(&mut op, &out, &input, ledger.clone()).unwrap();
            assert_eq!(guard.workspace_size().unwrap(), 16 * 8);
            assert!(!ledger.is_balanced());
        }
        assert!(ledger.is_balanced());
        assert_eq!(op.destroyed(), 1);
    }

    #[test]
    fn test_explicit_destroy_runs_once() {
        let mut op = HostRandomSample::new();
        let ledger = ResourceLedger::new();
        let (out, input) = descriptors();
        let guard = DescriptorGuard::create(&mut op, &out, &input, ledger.clone()).unwrap();
        guard.destroy().unwrap();
        assert!(ledger.is_balanced());
        assert_eq!(op.destroyed(), 1);
        assert_eq!(ledger.snapshot().descriptors_released, 1);
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let mut op = HostRandomSample::new();
        let ledger = ResourceLedger::new();
        let out = TensorDescriptor::contiguous(DataType::U64, &[1]);
        let input = TensorDescriptor::contiguous(DataType::I32, &[16]);
        let err = DescriptorGuard::create(&mut op, &out, &input, ledger.clone())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ForgeError::ExternalCall {
                call: LifecycleCall::CreateDescriptor,
                ..
            }
        ));
        assert_eq!(ledger.snapshot().descriptors_created, 0);
    }
}
