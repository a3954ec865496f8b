//! In-process CPU implementation of the random-sample operator
//!
//! Scores are decoded into the workspace as `f64`, the top-k candidates are
//! kept in a bounded min-heap, and the probability pass runs in `f32` in rank
//! order after an `f64` shift by the best score. Equal scores prefer the
//! higher index here, the opposite of the reference ranking, so equivalence
//! checks exercise the tie-aware rule.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::{write_index, Device, OpResult, OpStatus, RandomSampleOperator, SampleArgs, StreamToken};
use crate::tensor::{decode_score, DataType, TensorDescriptor};

const DECODED_WIDTH: usize = std::mem::size_of::<f64>();

/// What the host operator keeps from descriptor creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSampleDescriptor {
    dtype: DataType,
    index_dtype: DataType,
    voc: usize,
}

impl HostSampleDescriptor {
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn index_dtype(&self) -> DataType {
        self.index_dtype
    }

    pub fn voc(&self) -> usize {
        self.voc
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    score: f64,
    index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Greater is better: higher score, then higher index
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.index.cmp(&other.index))
    }
}

/// CPU random-sample operator
#[derive(Debug, Default)]
pub struct HostRandomSample {
    created: usize,
    destroyed: usize,
    executions: usize,
}

impl HostRandomSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors created so far
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    pub fn live_descriptors(&self) -> usize {
        self.created - self.destroyed
    }

    pub fn executions(&self) -> usize {
        self.executions
    }
}

fn check_args(args: &SampleArgs, voc: usize) -> OpResult<()> {
    let temperature_ok = args.temperature.is_finite() && args.temperature > 0.0;
    let topk_ok = args.topk > 0 && args.topk as usize <= voc;
    let topp_ok = (0.0..=1.0).contains(&args.topp);
    let random_ok = (0.0..1.0).contains(&args.random_val);
    if temperature_ok && topk_ok && topp_ok && random_ok {
        Ok(())
    } else {
        Err(OpStatus::BadParam)
    }
}

fn decode_into(
    workspace: &mut [u8],
    input: &[u8],
    dtype: DataType,
    voc: usize,
) -> OpResult<Vec<f64>> {
    let width = dtype.size_in_bytes();
    let mut scores = Vec::with_capacity(voc);
    for (raw, slot) in input
        .chunks_exact(width)
        .zip(workspace.chunks_exact_mut(DECODED_WIDTH))
    {
        let score = decode_score(dtype, raw).ok_or(OpStatus::BadTensorDtype)?;
        if !score.is_finite() {
            return Err(OpStatus::BadParam);
        }
        slot.copy_from_slice(&score.to_le_bytes());
        scores.push(score);
    }
    Ok(scores)
}

/// Index of the last maximum
fn last_argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score >= scores[best] {
            best = i;
        }
    }
    best
}

/// Top `k` entries, best first
fn heap_top_k(scores: &[f64], k: usize) -> Vec<HeapEntry> {
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(k + 1);
    for (index, &score) in scores.iter().enumerate() {
        let entry = HeapEntry { score, index };
        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if entry > *worst {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }
    // Ascending order of Reverse is descending order of entries
    heap.into_sorted_vec().into_iter().map(|Reverse(e)| e).collect()
}

fn sample_nucleus(candidates: &[HeapEntry], args: &SampleArgs) -> usize {
    let max = candidates[0].score;
    let exps: Vec<f32> = candidates
        .iter()
        .map(|c| (((c.score - max) as f32) / args.temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    let probs: Vec<f32> = exps.into_iter().map(|e| e / sum).collect();

    let topk = probs.len();
    let mut running = 0.0f32;
    let mut crossing = topk - 1;
    for (rank, &p) in probs.iter().enumerate() {
        running += p;
        if running >= args.topp {
            crossing = rank;
            break;
        }
    }
    let end = if crossing < topk - 1 { crossing + 1 } else { topk };

    let mass: f32 = probs[..end].iter().sum();
    let threshold = args.random_val * mass;

    let mut running = 0.0f32;
    for (rank, &p) in probs[..end].iter().enumerate() {
        running += p;
        if threshold < running {
            return candidates[rank].index;
        }
    }
    candidates[end - 1].index
}

impl RandomSampleOperator for HostRandomSample {
    type Descriptor = HostSampleDescriptor;

    fn name(&self) -> &str {
        "host"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn create(
        &mut self,
        output: &TensorDescriptor,
        input: &TensorDescriptor,
    ) -> OpResult<HostSampleDescriptor> {
        if !input.dtype().is_score_type() || !output.dtype().is_index_type() {
            return Err(OpStatus::BadTensorDtype);
        }

        let shape = input.shape().ok_or(OpStatus::BadTensorShape)?;
        if shape.len() != 1 || shape[0] == 0 {
            return Err(OpStatus::BadTensorShape);
        }
        if input.is_contiguous() != Some(true) {
            return Err(OpStatus::BadTensorStrides);
        }
        if output.element_count() != Some(1) {
            return Err(OpStatus::BadTensorShape);
        }

        self.created += 1;
        tracing::debug!(
            "host random sample descriptor: voc={}, dtype={}",
            shape[0],
            input.dtype()
        );
        Ok(HostSampleDescriptor {
            dtype: input.dtype(),
            index_dtype: output.dtype(),
            voc: shape[0],
        })
    }

    fn workspace_size(&self, descriptor: &HostSampleDescriptor) -> OpResult<usize> {
        descriptor
            .voc
            .checked_mul(DECODED_WIDTH)
            .ok_or(OpStatus::BadTensorShape)
    }

    fn execute(
        &mut self,
        descriptor: &HostSampleDescriptor,
        workspace: &mut [u8],
        output: &mut [u8],
        input: &[u8],
        args: SampleArgs,
        _stream: Option<StreamToken>,
    ) -> OpResult<()> {
        let voc = descriptor.voc;
        if workspace.len() < self.workspace_size(descriptor)? {
            return Err(OpStatus::InsufficientWorkspace);
        }
        if input.len() != voc * descriptor.dtype.size_in_bytes()
            || output.len() < descriptor.index_dtype.size_in_bytes()
        {
            return Err(OpStatus::BadTensorShape);
        }
        check_args(&args, voc)?;

        let scores = decode_into(workspace, input, descriptor.dtype, voc)?;

        let index = if args.topp <= 0.0 || args.topk <= 1 {
            last_argmax(&scores)
        } else {
            let candidates = heap_top_k(&scores, args.topk as usize);
            sample_nucleus(&candidates, &args)
        };

        self.executions += 1;
        write_index(output, index as u64)
    }

    fn destroy(&mut self, _descriptor: HostSampleDescriptor) -> OpResult<()> {
        self.destroyed += 1;
        Ok(())
    }
}
