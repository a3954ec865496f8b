//! Score vectors and the element types they can be stored in

use super::{DataType, TensorDescriptor};
use half::{bf16, f16};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// A floating point element a score vector can hold
///
/// Conversions to `f32`/`f64` are exact for every implementor except
/// `f64 -> f32`, which rounds.
pub trait ScoreElement:
    Copy + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const DTYPE: DataType;

    fn from_f32(value: f32) -> Self;
    fn to_f32(self) -> f32;
    fn to_f64(self) -> f64;

    /// Write little-endian bytes into `out[..DTYPE.size_in_bytes()]`
    fn write_le(self, out: &mut [u8]);

    /// Read from little-endian bytes `bytes[..DTYPE.size_in_bytes()]`
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_half_score {
    ($ty:ty, $dtype:expr) => {
        impl ScoreElement for $ty {
            const DTYPE: DataType = $dtype;

            fn from_f32(value: f32) -> Self {
                <$ty>::from_f32(value)
            }

            fn to_f32(self) -> f32 {
                <$ty>::to_f32(self)
            }

            fn to_f64(self) -> f64 {
                <$ty>::to_f64(self)
            }

            fn write_le(self, out: &mut [u8]) {
                out[..2].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                <$ty>::from_le_bytes([bytes[0], bytes[1]])
            }
        }
    };
}

impl_half_score!(f16, DataType::F16);
impl_half_score!(bf16, DataType::BF16);

impl ScoreElement for f32 {
    const DTYPE: DataType = DataType::F32;

    fn from_f32(value: f32) -> Self {
        value
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn write_le(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(raw)
    }
}

impl ScoreElement for f64 {
    const DTYPE: DataType = DataType::F64;

    fn from_f32(value: f32) -> Self {
        value as f64
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn write_le(self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(raw)
    }
}

/// Decode one element of `dtype` from little-endian bytes into `f64`
///
/// Returns `None` for non-score dtypes.
pub fn decode_score(dtype: DataType, bytes: &[u8]) -> Option<f64> {
    let value = match dtype {
        DataType::F16 => f16::read_le(bytes).to_f64(),
        DataType::BF16 => bf16::read_le(bytes).to_f64(),
        DataType::F32 => f32::read_le(bytes).to_f64(),
        DataType::F64 => f64::read_le(bytes),
        _ => return None,
    };
    Some(value)
}

/// One score per vocabulary entry; the position is the token id
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector<T: ScoreElement> {
    values: Vec<T>,
}

impl<T: ScoreElement> ScoreVector<T> {
    pub fn new(values: Vec<T>) -> Self {
        ScoreVector { values }
    }

    pub fn from_f32(values: &[f32]) -> Self {
        ScoreVector {
            values: values.iter().map(|&v| T::from_f32(v)).collect(),
        }
    }

    /// Strictly increasing ramp `i * step`, then shuffled across indices
    ///
    /// The ramp is distinct in `f32`; narrow element types may round
    /// neighbouring values onto the same representable score.
    pub fn permuted_ramp<R: Rng + ?Sized>(voc: usize, step: f32, rng: &mut R) -> Self {
        let mut values: Vec<T> = (0..voc).map(|i| T::from_f32(i as f32 * step)).collect();
        values.shuffle(rng);
        ScoreVector { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn dtype(&self) -> DataType {
        T::DTYPE
    }

    /// 1-D contiguous descriptor over this vector
    pub fn descriptor(&self) -> TensorDescriptor {
        TensorDescriptor::contiguous(T::DTYPE, &[self.values.len()])
    }

    /// Little-endian byte image, as handed to an operator
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = T::DTYPE.size_in_bytes();
        let mut bytes = vec![0u8; self.values.len() * width];
        for (chunk, value) in bytes.chunks_exact_mut(width).zip(self.values.iter()) {
            value.write_le(chunk);
        }
        bytes
    }
}
