//! idmatch is a CPU-first identity matching engine over local image features.
//!
//! A query model (keypoints plus fixed-width descriptors) is scored against
//! every reference model of a gallery through a three-stage stack: brute-force
//! kNN proposal, the ratio test and scale/rotation consensus voting. Scores
//! are averaged per subject and the best subject is accepted only above an
//! absolute confidence floor. An offline curator prunes keypoints that also
//! match other subjects and publishes the result as a new gallery generation.
//!
//! Parallel fan-out is available through the `rayon` feature, a SIMD float
//! kernel through `simd`, JSON persistence through `serde` and photo loading
//! through `image-io`.

mod candidate;
pub mod curate;
pub mod eval;
pub mod extract;
pub mod feature;
pub mod gallery;
pub mod identify;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod search;
mod trace;
pub mod util;

pub use curate::{CurateConfig, CurationReport, Curator, ModelCuration};
pub use eval::{evaluate_leave_one_out, EvaluationSummary};
pub use extract::{analyze_subject, ExtractorFamily, FeatureExtractor};
pub use feature::{DescriptorKind, DescriptorSet, DescriptorSpec, Keypoint, Metric};
pub use gallery::{Gallery, GalleryHandle, GalleryStore, MemoryStore, Model, SubjectId};
pub use identify::{
    decide, identify, identify_with_budget, Decision, DecisionConfig, IdentifyReport,
    IdentityAccumulator, TieBreak,
};
pub use image::{ImageView, OwnedImage};
pub use search::{MatchConfig, MatchResult, Matcher, PairScore};
pub use util::{Budget, CancelToken, IdMatchError, IdMatchResult};

#[cfg(feature = "serde")]
pub use gallery::json::JsonDirStore;
