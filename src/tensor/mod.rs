//! Host-side tensor plumbing: dtypes, descriptors and score vectors

mod descriptor;
mod dtype;
mod score;

pub use descriptor::TensorDescriptor;
pub use dtype::DataType;
pub use score::{decode_score, ScoreElement, ScoreVector};
