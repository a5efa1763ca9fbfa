//! Low-level building blocks for custom matching pipelines.
//!
//! These expose the individual stages of the matching stack and the distance
//! kernels beneath them. Most users should prefer `Matcher`, `identify` and
//! `Curator`.

pub use crate::candidate::topk::{Neighbor, TopK};
pub use crate::kernel::scalar::{EuclideanF32Scalar, EuclideanU8Scalar, HammingScalar};
pub use crate::kernel::Kernel;
pub use crate::search::{
    knn_match, vote_for_size_and_orientation, vote_for_uniqueness, VoteCell, VoteOutcome,
    VoteParams,
};
