//! Tensor descriptors passed across the operator boundary
//!
//! A descriptor carries dtype, shape and strides at creation time. The
//! operator is allowed to consume the layout during descriptor creation;
//! afterwards the caller invalidates it so nothing downstream can read a
//! stale shape.

use super::DataType;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    shape: Vec<usize>,
    strides: Vec<isize>,
}

/// Element type plus (until invalidated) shape and strides in elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    dtype: DataType,
    layout: Option<Layout>,
}

impl TensorDescriptor {
    /// Create a descriptor with explicit strides
    ///
    /// Returns `None` when shape and strides disagree in rank.
    pub fn new(dtype: DataType, shape: &[usize], strides: &[isize]) -> Option<Self> {
        if shape.len() != strides.len() {
            return None;
        }
        Some(TensorDescriptor {
            dtype,
            layout: Some(Layout {
                shape: shape.to_vec(),
                strides: strides.to_vec(),
            }),
        })
    }

    /// Create a row-major contiguous descriptor
    pub fn contiguous(dtype: DataType, shape: &[usize]) -> Self {
        let mut strides = vec![0isize; shape.len()];
        let mut step = 1isize;
        for (stride, &dim) in strides.iter_mut().zip(shape.iter()).rev() {
            *stride = step;
            step *= dim.max(1) as isize;
        }
        TensorDescriptor {
            dtype,
            layout: Some(Layout {
                shape: shape.to_vec(),
                strides,
            }),
        }
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Shape, or `None` once invalidated
    pub fn shape(&self) -> Option<&[usize]> {
        self.layout.as_ref().map(|l| l.shape.as_slice())
    }

    /// Strides in elements, or `None` once invalidated
    pub fn strides(&self) -> Option<&[isize]> {
        self.layout.as_ref().map(|l| l.strides.as_slice())
    }

    pub fn ndim(&self) -> Option<usize> {
        self.shape().map(|s| s.len())
    }

    pub fn element_count(&self) -> Option<usize> {
        self.shape().map(|s| s.iter().product())
    }

    /// Byte length of a densely packed buffer for this descriptor
    pub fn byte_len(&self) -> Option<usize> {
        self.element_count()
            .map(|n| n * self.dtype.size_in_bytes())
    }

    /// Whether the strides describe a dense row-major layout
    pub fn is_contiguous(&self) -> Option<bool> {
        let layout = self.layout.as_ref()?;
        let mut expected = 1isize;
        for (&dim, &stride) in layout.shape.iter().zip(layout.strides.iter()).rev() {
            if dim > 1 && stride != expected {
                return Some(false);
            }
            expected *= dim.max(1) as isize;
        }
        Some(true)
    }

    /// Discard shape and strides; only the dtype survives
    pub fn invalidate(&mut self) {
        self.layout = None;
    }

    pub fn is_invalidated(&self) -> bool {
        self.layout.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_strides() {
        let desc = TensorDescriptor::contiguous(DataType::F16, &[2, 3, 4]);
        assert_eq!(desc.strides(), Some(&[12isize, 4, 1][..]));
        assert_eq!(desc.element_count(), Some(24));
        assert_eq!(desc.byte_len(), Some(48));
        assert_eq!(desc.is_contiguous(), Some(true));
    }

    #[test]
    fn test_strided_layout_is_not_contiguous() {
        let desc = TensorDescriptor::new(DataType::F32, &[8], &[2]).unwrap();
        assert_eq!(desc.is_contiguous(), Some(false));
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        assert!(TensorDescriptor::new(DataType::F32, &[8, 2], &[1]).is_none());
    }

    #[test]
    fn test_invalidate_discards_layout() {
        let mut desc = TensorDescriptor::contiguous(DataType::U64, &[1]);
        assert!(!desc.is_invalidated());

        desc.invalidate();

        assert!(desc.is_invalidated());
        assert_eq!(desc.dtype(), DataType::U64);
        assert!(desc.shape().is_none());
        assert!(desc.strides().is_none());
        assert!(desc.byte_len().is_none());
        assert!(desc.is_contiguous().is_none());
    }
}
