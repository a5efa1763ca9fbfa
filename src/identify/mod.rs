//! Query identification against a gallery snapshot.
//!
//! Every (subject, model) pair of the gallery is scored against the query,
//! with the model's rows searched in the query's descriptors;
//! per-subject accumulators average the scores and the decision stage picks
//! the winner. With the `rayon` feature and `MatchConfig::parallel` the pairs
//! are fanned out across worker threads, each folding into its own partial
//! accumulators which are merged at the end.

mod accumulator;
mod decision;

pub use accumulator::IdentityAccumulator;
pub use decision::{decide, Decision, DecisionConfig, TieBreak};

use crate::gallery::{Gallery, Model, SubjectId};
use crate::search::Matcher;
use crate::trace::{trace_event, trace_span};
use crate::util::{Budget, IdMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Result of one identification call.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifyReport {
    /// Final decision, made on whatever was accumulated.
    pub decision: Decision,
    /// One entry per subject, strongest first (subjects without comparisons last).
    pub standings: Vec<IdentityAccumulator>,
    /// Number of (query, model) comparisons performed.
    pub comparisons: usize,
    /// True if the budget ran out before every model was scored.
    pub interrupted: bool,
    /// Generation of the gallery that was searched.
    pub generation: u64,
}

impl IdentifyReport {
    /// Standing of one subject.
    pub fn standing(&self, subject: SubjectId) -> Option<&IdentityAccumulator> {
        self.standings.iter().find(|acc| acc.subject() == subject)
    }
}

#[derive(Debug, Default)]
struct Partial {
    accumulators: BTreeMap<SubjectId, IdentityAccumulator>,
    comparisons: usize,
    interrupted: bool,
}

impl Partial {
    fn record(&mut self, subject: SubjectId, score: usize) {
        self.accumulators
            .entry(subject)
            .or_insert_with(|| IdentityAccumulator::new(subject))
            .add_comparison(score);
        self.comparisons += 1;
    }

    fn merge(mut self, other: Partial) -> Partial {
        for (subject, acc) in other.accumulators {
            self.accumulators
                .entry(subject)
                .or_insert_with(|| IdentityAccumulator::new(subject))
                .merge(&acc);
        }
        self.comparisons += other.comparisons;
        self.interrupted |= other.interrupted;
        self
    }
}

/// The gallery model supplies the search rows and the unknown sample is the
/// searched set, so a score never exceeds the model's keypoint count.
fn score_pair(
    query: &Model,
    gallery: &Gallery,
    matcher: &Matcher,
    subject: SubjectId,
    idx: usize,
) -> IdMatchResult<usize> {
    match gallery.model(subject, idx) {
        Some(model) => Ok(matcher.score(model, query)?.score),
        None => Ok(0),
    }
}

fn sweep_sequential(
    query: &Model,
    gallery: &Gallery,
    matcher: &Matcher,
    pairs: &[(SubjectId, usize)],
    budget: &Budget,
) -> IdMatchResult<Partial> {
    let mut partial = Partial::default();
    for &(subject, idx) in pairs {
        if budget.is_exhausted() {
            partial.interrupted = true;
            break;
        }
        let score = score_pair(query, gallery, matcher, subject, idx)?;
        partial.record(subject, score);
    }
    Ok(partial)
}

#[cfg(feature = "rayon")]
fn sweep_parallel(
    query: &Model,
    gallery: &Gallery,
    matcher: &Matcher,
    pairs: &[(SubjectId, usize)],
    budget: &Budget,
) -> IdMatchResult<Partial> {
    pairs
        .par_iter()
        .try_fold(
            Partial::default,
            |mut partial, &(subject, idx)| -> IdMatchResult<Partial> {
                if budget.is_exhausted() {
                    partial.interrupted = true;
                    return Ok(partial);
                }
                let score = score_pair(query, gallery, matcher, subject, idx)?;
                partial.record(subject, score);
                Ok(partial)
            },
        )
        .try_reduce(Partial::default, |a, b| Ok(a.merge(b)))
}

/// Identifies `query` against every model of `gallery`.
pub fn identify(
    query: &Model,
    gallery: &Gallery,
    matcher: &Matcher,
    cfg: &DecisionConfig,
) -> IdMatchResult<IdentifyReport> {
    identify_with_budget(query, gallery, matcher, cfg, &Budget::unlimited())
}

/// Identifies `query`, stopping early once `budget` is exhausted.
///
/// The budget is checked before each (subject, model) comparison. When it
/// runs out, the report carries the partial standings and `interrupted` is set.
pub fn identify_with_budget(
    query: &Model,
    gallery: &Gallery,
    matcher: &Matcher,
    cfg: &DecisionConfig,
    budget: &Budget,
) -> IdMatchResult<IdentifyReport> {
    cfg.validate()?;
    let _span = trace_span!(
        "identify",
        subjects = gallery.len(),
        models = gallery.model_count(),
        generation = gallery.generation()
    )
    .entered();

    let pairs = gallery.model_refs();

    #[cfg(feature = "rayon")]
    let partial = if matcher.config().parallel {
        sweep_parallel(query, gallery, matcher, &pairs, budget)?
    } else {
        sweep_sequential(query, gallery, matcher, &pairs, budget)?
    };
    #[cfg(not(feature = "rayon"))]
    let partial = sweep_sequential(query, gallery, matcher, &pairs, budget)?;

    // Subjects with no scored model still appear in the standings.
    let mut standings: Vec<IdentityAccumulator> = gallery
        .subject_ids()
        .into_iter()
        .map(|subject| {
            partial
                .accumulators
                .get(&subject)
                .copied()
                .unwrap_or_else(|| IdentityAccumulator::new(subject))
        })
        .collect();
    standings.sort_by(|a, b| decision::standing_cmp(a, b, cfg.tie_break));
    let decision = decide(&standings, cfg);

    trace_event!(
        "identified",
        comparisons = partial.comparisons,
        interrupted = partial.interrupted,
        matched = matches!(decision, Decision::Match(_))
    );
    Ok(IdentifyReport {
        decision,
        standings,
        comparisons: partial.comparisons,
        interrupted: partial.interrupted,
        generation: gallery.generation(),
    })
}

#[cfg(test)]
mod tests {
    use super::{identify, identify_with_budget, Decision, DecisionConfig};
    use crate::feature::{DescriptorSet, Keypoint};
    use crate::gallery::{Gallery, Model};
    use crate::search::Matcher;
    use crate::util::{Budget, CancelToken};

    fn model(codes: &[u8]) -> Model {
        let keypoints = (0..codes.len())
            .map(|i| Keypoint::new(i as f32, 0.0, 4.0, 10.0))
            .collect();
        Model::new(keypoints, DescriptorSet::binary(codes.to_vec(), 1).unwrap()).unwrap()
    }

    fn gallery() -> Gallery {
        let mut gallery = Gallery::new();
        gallery
            .insert_model(1, model(&[0x00, 0x0F, 0xF0, 0xFF, 0x3C]))
            .unwrap();
        gallery.insert_model(2, model(&[0x01, 0x02])).unwrap();
        gallery.insert_subject(3, Vec::new()).unwrap();
        gallery
    }

    #[test]
    fn best_mean_wins_when_permissive() {
        let cfg = DecisionConfig {
            min_confidence: None,
            ..DecisionConfig::default()
        };
        let query = model(&[0x00, 0x0F, 0xF0, 0xFF, 0x3C]);
        let report = identify(&query, &gallery(), &Matcher::default(), &cfg).unwrap();
        assert_eq!(report.decision, Decision::Match(1));
        assert_eq!(report.comparisons, 2);
        assert_eq!(report.standings[0].subject(), 1);
        assert_eq!(report.standings[0].mean(), Some(5.0));
        assert_eq!(report.standing(3).and_then(|acc| acc.mean()), None);
        assert!(!report.interrupted);
    }

    #[test]
    fn default_threshold_rejects_small_scores() {
        let query = model(&[0x00, 0x0F, 0xF0, 0xFF, 0x3C]);
        let report =
            identify(&query, &gallery(), &Matcher::default(), &DecisionConfig::default()).unwrap();
        assert_eq!(report.decision, Decision::NoMatch);
    }

    #[test]
    fn repeated_sample_rows_do_not_inflate_the_score() {
        let codes: Vec<u8> = (0..20u8).map(|i| i.wrapping_mul(37)).collect();
        let mut gallery = Gallery::new();
        gallery.insert_model(1, model(&codes)).unwrap();
        let doubled: Vec<u8> = codes.iter().chain(codes.iter()).copied().collect();
        let sample = model(&doubled);

        let cfg = DecisionConfig {
            min_confidence: None,
            ..DecisionConfig::default()
        };
        let report = identify(&sample, &gallery, &Matcher::default(), &cfg).unwrap();
        let mean = report.standing(1).and_then(|acc| acc.mean()).unwrap();
        assert!(mean <= codes.len() as f32);
        assert_eq!(mean, 0.0);

        let strict = identify(&sample, &gallery, &Matcher::default(), &DecisionConfig::default())
            .unwrap();
        assert_eq!(strict.decision, Decision::NoMatch);
    }

    #[test]
    fn cancelled_budget_interrupts() {
        let token = CancelToken::new();
        token.cancel();
        let budget = Budget::unlimited().with_cancel(token);
        let query = model(&[0x00]);
        let report = identify_with_budget(
            &query,
            &gallery(),
            &Matcher::default(),
            &DecisionConfig::default(),
            &budget,
        )
        .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.comparisons, 0);
        assert_eq!(report.decision, Decision::NoMatch);
    }
}
