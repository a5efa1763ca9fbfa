//! Error types for idmatch.

use crate::feature::{DescriptorKind, Metric};
use thiserror::Error;

/// Result alias for idmatch operations.
pub type IdMatchResult<T> = std::result::Result<T, IdMatchError>;

/// Errors that can occur when matching, identifying or curating.
///
/// Structurally empty inputs (no subjects, a subject without models, an empty
/// descriptor set) are not errors; they degrade to a zero score or to
/// exclusion from the decision.
#[derive(Debug, Error, PartialEq)]
pub enum IdMatchError {
    /// A configuration value is out of range or non-finite.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Two descriptor sets disagree on family or width.
    #[error("descriptor mismatch: expected {expected_kind:?}x{expected_width}, got {got_kind:?}x{got_width}")]
    DescriptorMismatch {
        expected_kind: DescriptorKind,
        expected_width: usize,
        got_kind: DescriptorKind,
        got_width: usize,
    },
    /// The metric cannot be applied to the descriptor family, or two sets
    /// were produced for different metrics.
    #[error("metric {metric:?} is not compatible with {kind:?} descriptors")]
    IncompatibleMetric { metric: Metric, kind: DescriptorKind },
    /// Keypoints, descriptors and cross-hit counters are not index-aligned.
    #[error("ragged model: {keypoints} keypoints, {descriptors} descriptors, {cross_hits:?} cross-hit counters")]
    RaggedModel {
        keypoints: usize,
        descriptors: usize,
        cross_hits: Option<usize>,
    },
    /// A flat descriptor buffer is not a whole number of rows.
    #[error("ragged descriptors: buffer of {len} elements is not a multiple of width {width}")]
    RaggedDescriptors { len: usize, width: usize },
    /// A keypoint carries a non-finite coordinate or a non-positive size.
    #[error("invalid keypoint {index}: {reason}")]
    InvalidKeypoint { index: usize, reason: &'static str },
    /// The provided width or height is zero or causes an overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The provided buffer is too small for the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The operation was cancelled before it could complete.
    #[error("operation cancelled")]
    Cancelled,
    /// A newer gallery generation was published while this one was built.
    #[error("stale gallery generation: built from {expected}, current is {current}")]
    StaleGeneration { expected: u64, current: u64 },
    /// A gallery store failed to read or write.
    #[error("gallery store error: {reason}")]
    Store { reason: String },
    /// Image loading failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
}
