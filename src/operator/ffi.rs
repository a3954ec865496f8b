//! Bindings to a C operator library exposing the random-sample operator
//!
//! Linking is handled by `build.rs` when the `ffi` feature is on. Buffers are
//! passed as host pointers, so this targets CPU or unified-memory builds of
//! the library.

use std::ffi::c_void;
use std::ptr;

use super::{Device, OpResult, OpStatus, RandomSampleOperator, SampleArgs, StreamToken};
use crate::tensor::TensorDescriptor;

pub type RawHandle = *mut c_void;
pub type RawTensorDescriptor = *mut c_void;
pub type RawSampleDescriptor = *mut c_void;

#[allow(dead_code)]
extern "C" {
    pub fn infiniopCreateHandle(handle: *mut RawHandle, device: i32, device_id: i32) -> i32;
    pub fn infiniopDestroyHandle(handle: RawHandle) -> i32;
    pub fn infiniopCreateTensorDescriptor(
        desc: *mut RawTensorDescriptor,
        ndim: u64,
        shape: *const u64,
        strides: *const i64,
        dtype: i32,
    ) -> i32;
    pub fn infiniopDestroyTensorDescriptor(desc: RawTensorDescriptor) -> i32;
    pub fn infiniopCreateRandomSampleDescriptor(
        handle: RawHandle,
        desc: *mut RawSampleDescriptor,
        result: RawTensorDescriptor,
        probs: RawTensorDescriptor,
    ) -> i32;
    pub fn infiniopGetRandomSampleWorkspaceSize(desc: RawSampleDescriptor, size: *mut u64) -> i32;
    pub fn infiniopRandomSample(
        desc: RawSampleDescriptor,
        workspace: *mut c_void,
        workspace_size: u64,
        result: *mut c_void,
        probs: *const c_void,
        random_val: f32,
        topp: f32,
        topk: i32,
        temperature: f32,
        stream: *mut c_void,
    ) -> i32;
    pub fn infiniopDestroyRandomSampleDescriptor(desc: RawSampleDescriptor) -> i32;
}

/// Library tensor descriptor, destroyed on drop
struct LibraryTensor(RawTensorDescriptor);

impl LibraryTensor {
    fn create(desc: &TensorDescriptor) -> OpResult<Self> {
        let shape = desc.shape().ok_or(OpStatus::BadTensorShape)?;
        let strides = desc.strides().ok_or(OpStatus::BadTensorStrides)?;
        let shape: Vec<u64> = shape.iter().map(|&d| d as u64).collect();
        let strides: Vec<i64> = strides.iter().map(|&s| s as i64).collect();

        let mut raw: RawTensorDescriptor = ptr::null_mut();
        let code = unsafe {
            infiniopCreateTensorDescriptor(
                &mut raw,
                shape.len() as u64,
                shape.as_ptr(),
                strides.as_ptr(),
                desc.dtype().as_raw(),
            )
        };
        OpStatus::check(code)?;
        Ok(LibraryTensor(raw))
    }
}

impl Drop for LibraryTensor {
    fn drop(&mut self) {
        if !self.0.is_null() {
            let code = unsafe { infiniopDestroyTensorDescriptor(self.0) };
            if let Err(status) = OpStatus::check(code) {
                tracing::warn!("Failed to destroy library tensor descriptor: {}", status);
            }
        }
    }
}

/// Descriptor handed out by [`FfiRandomSample::create`]
#[derive(Debug)]
pub struct FfiSampleDescriptor {
    raw: RawSampleDescriptor,
}

/// Random-sample operator backed by the C library
#[derive(Debug)]
pub struct FfiRandomSample {
    handle: RawHandle,
    device: Device,
}

impl FfiRandomSample {
    /// Open a library handle on `device`
    pub fn new(device: Device, device_id: i32) -> OpResult<Self> {
        let mut handle: RawHandle = ptr::null_mut();
        let code = unsafe { infiniopCreateHandle(&mut handle, device as i32, device_id) };
        OpStatus::check(code)?;
        if handle.is_null() {
            return Err(OpStatus::NullPointer);
        }
        tracing::debug!("Opened operator library handle on {}:{}", device, device_id);
        Ok(FfiRandomSample { handle, device })
    }
}

impl Drop for FfiRandomSample {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let code = unsafe { infiniopDestroyHandle(self.handle) };
            if let Err(status) = OpStatus::check(code) {
                tracing::warn!("Failed to destroy operator library handle: {}", status);
            }
        }
    }
}

impl RandomSampleOperator for FfiRandomSample {
    type Descriptor = FfiSampleDescriptor;

    fn name(&self) -> &str {
        "ffi"
    }

    fn device(&self) -> Device {
        self.device
    }

    fn create(
        &mut self,
        output: &TensorDescriptor,
        input: &TensorDescriptor,
    ) -> OpResult<FfiSampleDescriptor> {
        let result = LibraryTensor::create(output)?;
        let probs = LibraryTensor::create(input)?;

        let mut raw: RawSampleDescriptor = ptr::null_mut();
        let code = unsafe {
            infiniopCreateRandomSampleDescriptor(self.handle, &mut raw, result.0, probs.0)
        };
        OpStatus::check(code)?;
        if raw.is_null() {
            return Err(OpStatus::NullPointer);
        }
        Ok(FfiSampleDescriptor { raw })
    }

    fn workspace_size(&self, descriptor: &FfiSampleDescriptor) -> OpResult<usize> {
        let mut size = 0u64;
        let code = unsafe { infiniopGetRandomSampleWorkspaceSize(descriptor.raw, &mut size) };
        OpStatus::check(code)?;
        usize::try_from(size).map_err(|_| OpStatus::InsufficientWorkspace)
    }

    fn execute(
        &mut self,
        descriptor: &FfiSampleDescriptor,
        workspace: &mut [u8],
        output: &mut [u8],
        input: &[u8],
        args: SampleArgs,
        stream: Option<StreamToken>,
    ) -> OpResult<()> {
        let stream = stream.map_or(ptr::null_mut(), StreamToken::as_ptr);
        let workspace_ptr = if workspace.is_empty() {
            ptr::null_mut()
        } else {
            workspace.as_mut_ptr() as *mut c_void
        };
        let code = unsafe {
            infiniopRandomSample(
                descriptor.raw,
                workspace_ptr,
                workspace.len() as u64,
                output.as_mut_ptr() as *mut c_void,
                input.as_ptr() as *const c_void,
                args.random_val,
                args.topp,
                args.topk,
                args.temperature,
                stream,
            )
        };
        OpStatus::check(code)
    }

    fn destroy(&mut self, descriptor: FfiSampleDescriptor) -> OpResult<()> {
        let code = unsafe { infiniopDestroyRandomSampleDescriptor(descriptor.raw) };
        OpStatus::check(code)
    }
}
