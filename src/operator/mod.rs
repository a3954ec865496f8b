//! The random-sample operator boundary
//!
//! An accelerated implementation is reached through a small capability set:
//! create a descriptor, ask for its workspace size, execute, synchronize and
//! destroy. Every call reports a status; anything but success is a hard
//! failure for the caller. The driver is written once against
//! [`RandomSampleOperator`] and retargeted by swapping the implementation.

pub mod guard;
pub mod host;
pub mod status;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use guard::DescriptorGuard;
pub use host::{HostRandomSample, HostSampleDescriptor};
pub use status::{LifecycleCall, OpResult, OpStatus, STATUS_SUCCESS};

use crate::sampler::SamplingConfig;
use serde::Serialize;
use std::ffi::c_void;
use std::fmt;
use std::str::FromStr;

use crate::tensor::TensorDescriptor;

/// Device families an operator library can target
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu = 0,
    Nvidia = 1,
    Cambricon = 2,
    Ascend = 3,
    Metax = 4,
    Moore = 5,
    Iluvatar = 6,
    Kunlun = 7,
    Sugon = 8,
}

impl Device {
    /// Whether results must be fenced with an explicit synchronize before
    /// the host reads them back
    pub fn needs_host_barrier(self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Cpu => "cpu",
            Device::Nvidia => "nvidia",
            Device::Cambricon => "cambricon",
            Device::Ascend => "ascend",
            Device::Metax => "metax",
            Device::Moore => "moore",
            Device::Iluvatar => "iluvatar",
            Device::Kunlun => "kunlun",
            Device::Sugon => "sugon",
        };
        f.write_str(name)
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "nvidia" | "cuda" => Ok(Device::Nvidia),
            "cambricon" => Ok(Device::Cambricon),
            "ascend" => Ok(Device::Ascend),
            "metax" => Ok(Device::Metax),
            "moore" => Ok(Device::Moore),
            "iluvatar" => Ok(Device::Iluvatar),
            "kunlun" => Ok(Device::Kunlun),
            "sugon" => Ok(Device::Sugon),
            other => Err(format!("unknown device: {}", other)),
        }
    }
}

/// Scalar arguments of one execute call, in the library's widths
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleArgs {
    pub random_val: f32,
    pub topp: f32,
    pub topk: i32,
    pub temperature: f32,
}

impl From<&SamplingConfig> for SampleArgs {
    fn from(config: &SamplingConfig) -> Self {
        SampleArgs {
            random_val: config.random_val,
            topp: config.topp,
            topk: config.topk,
            temperature: config.temperature,
        }
    }
}

/// Opaque execution-stream handle forwarded to the operator untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamToken(pub *mut c_void);

impl StreamToken {
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// An implementation of the random-sample operator
///
/// Buffers are host-addressable byte slices. `execute` writes exactly one
/// little-endian `u64` index into `output`.
pub trait RandomSampleOperator {
    type Descriptor;

    /// Short name for logs and reports
    fn name(&self) -> &str;

    fn device(&self) -> Device;

    /// Build a descriptor for a score tensor `input` and an index tensor `output`
    ///
    /// The layouts of both descriptors may be invalidated by the caller as
    /// soon as this returns.
    fn create(
        &mut self,
        output: &TensorDescriptor,
        input: &TensorDescriptor,
    ) -> OpResult<Self::Descriptor>;

    /// Scratch bytes `execute` needs for this descriptor
    fn workspace_size(&self, descriptor: &Self::Descriptor) -> OpResult<usize>;

    fn execute(
        &mut self,
        descriptor: &Self::Descriptor,
        workspace: &mut [u8],
        output: &mut [u8],
        input: &[u8],
        args: SampleArgs,
        stream: Option<StreamToken>,
    ) -> OpResult<()>;

    /// Completion barrier for offloaded work
    fn synchronize(&self) -> OpResult<()> {
        Ok(())
    }

    fn destroy(&mut self, descriptor: Self::Descriptor) -> OpResult<()>;
}

/// Decode the index written by `execute`
///
/// Returns `None` when fewer than eight bytes are available.
pub fn read_index(output: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = output.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Encode an index the way `execute` must write it
pub fn write_index(output: &mut [u8], index: u64) -> OpResult<()> {
    let slot = output.get_mut(..8).ok_or(OpStatus::BadTensorShape)?;
    slot.copy_from_slice(&index.to_le_bytes());
    Ok(())
}
