//! Running per-subject score statistics.

use crate::gallery::SubjectId;

/// Sum and count of pair scores for one subject.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdentityAccumulator {
    subject: SubjectId,
    sum: f64,
    count: usize,
}

impl IdentityAccumulator {
    /// Starts an empty accumulator for `subject`.
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            sum: 0.0,
            count: 0,
        }
    }

    /// Records the score of one (query, model) comparison.
    pub fn add_comparison(&mut self, score: usize) {
        self.sum += score as f64;
        self.count += 1;
    }

    /// Folds another partial accumulator for the same subject into this one.
    pub fn merge(&mut self, other: &IdentityAccumulator) {
        debug_assert_eq!(self.subject, other.subject);
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Subject this accumulator belongs to.
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Sum of recorded scores.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of recorded comparisons.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean score, `None` before the first comparison.
    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }
}
