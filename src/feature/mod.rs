//! Local image features: keypoints and their descriptor vectors.
//!
//! Keypoints and descriptors are produced by an external extractor and are
//! index-aligned: `keypoints[i]` is described by `descriptors.row(i)`.

mod descriptor;

pub use descriptor::{DescriptorKind, DescriptorRow, DescriptorSet, DescriptorSpec, Metric};

use crate::util::{IdMatchError, IdMatchResult};

/// Salient image location with characteristic scale and orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypoint {
    /// X coordinate (column) in pixels.
    pub x: f32,
    /// Y coordinate (row) in pixels.
    pub y: f32,
    /// Diameter of the meaningful neighborhood.
    pub size: f32,
    /// Orientation in degrees. Detectors without orientation report a
    /// constant (often -1), which is fine as long as both sides agree.
    pub angle: f32,
}

impl Keypoint {
    /// Creates a keypoint.
    pub fn new(x: f32, y: f32, size: f32, angle: f32) -> Self {
        Self { x, y, size, angle }
    }

    pub(crate) fn validate(&self, index: usize) -> IdMatchResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(IdMatchError::InvalidKeypoint {
                index,
                reason: "non-finite position",
            });
        }
        if !self.angle.is_finite() {
            return Err(IdMatchError::InvalidKeypoint {
                index,
                reason: "non-finite angle",
            });
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(IdMatchError::InvalidKeypoint {
                index,
                reason: "size must be finite and > 0",
            });
        }
        Ok(())
    }
}
