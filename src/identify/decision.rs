//! Best-subject selection with an absolute confidence floor.

use crate::gallery::SubjectId;
use crate::identify::IdentityAccumulator;
use crate::util::{IdMatchError, IdMatchResult};
use std::cmp::Ordering;

/// Outcome of an identification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Decision {
    /// The query was attributed to this subject.
    Match(SubjectId),
    /// No subject was confident enough, or none had any comparison.
    NoMatch,
}

/// Which subject wins among equal means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreak {
    /// The smallest subject id wins.
    #[default]
    LowestId,
    /// The largest subject id wins.
    HighestId,
}

/// Decision parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecisionConfig {
    /// Winning means below this are rejected. `None` always answers.
    pub min_confidence: Option<f32>,
    /// Policy for subjects with equal means.
    pub tie_break: TieBreak,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_confidence: Some(35.0),
            tie_break: TieBreak::LowestId,
        }
    }
}

impl DecisionConfig {
    /// Rejects non-finite thresholds.
    pub fn validate(&self) -> IdMatchResult<()> {
        if self.min_confidence.is_some_and(|t| !t.is_finite()) {
            return Err(IdMatchError::InvalidConfig {
                reason: "min_confidence must be finite",
            });
        }
        Ok(())
    }
}

/// Orders accumulators from strongest to weakest candidate.
///
/// Accumulators without comparisons sort last.
pub(crate) fn standing_cmp(
    a: &IdentityAccumulator,
    b: &IdentityAccumulator,
    tie_break: TieBreak,
) -> Ordering {
    let by_mean = match (a.mean(), b.mean()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_mean.then_with(|| match tie_break {
        TieBreak::LowestId => a.subject().cmp(&b.subject()),
        TieBreak::HighestId => b.subject().cmp(&a.subject()),
    })
}

/// Picks the subject with the highest mean score.
///
/// Subjects without comparisons are ignored. A winning mean strictly below
/// `min_confidence` yields `NoMatch`.
pub fn decide(accumulators: &[IdentityAccumulator], cfg: &DecisionConfig) -> Decision {
    let best = accumulators
        .iter()
        .filter(|acc| acc.count() > 0)
        .min_by(|a, b| standing_cmp(a, b, cfg.tie_break));
    let Some(best) = best else {
        return Decision::NoMatch;
    };
    match (best.mean(), cfg.min_confidence) {
        (Some(mean), Some(threshold)) if mean < threshold => Decision::NoMatch,
        (Some(_), _) => Decision::Match(best.subject()),
        (None, _) => Decision::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::{decide, Decision, DecisionConfig, TieBreak};
    use crate::identify::IdentityAccumulator;

    fn acc(subject: u32, scores: &[usize]) -> IdentityAccumulator {
        let mut acc = IdentityAccumulator::new(subject);
        for &s in scores {
            acc.add_comparison(s);
        }
        acc
    }

    #[test]
    fn equal_means_follow_tie_break() {
        let accs = [acc(7, &[10]), acc(3, &[10])];
        let permissive = DecisionConfig {
            min_confidence: None,
            ..DecisionConfig::default()
        };
        assert_eq!(decide(&accs, &permissive), Decision::Match(3));
        let highest = DecisionConfig {
            tie_break: TieBreak::HighestId,
            ..permissive
        };
        assert_eq!(decide(&accs, &highest), Decision::Match(7));
    }

    #[test]
    fn threshold_is_inclusive() {
        let accs = [acc(1, &[35])];
        assert_eq!(decide(&accs, &DecisionConfig::default()), Decision::Match(1));
        let accs = [acc(1, &[34])];
        assert_eq!(decide(&accs, &DecisionConfig::default()), Decision::NoMatch);
    }

    #[test]
    fn empty_subjects_are_ignored() {
        let accs = [acc(1, &[]), acc(2, &[])];
        let cfg = DecisionConfig {
            min_confidence: None,
            ..DecisionConfig::default()
        };
        assert_eq!(decide(&accs, &cfg), Decision::NoMatch);
        assert_eq!(decide(&[], &cfg), Decision::NoMatch);
    }
}
