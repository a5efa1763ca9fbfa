//! Leave-one-out recognition benchmark over an enrolled gallery.
//!
//! Each model is used as a query against the gallery with that model removed,
//! and the decision is compared with the subject it was enrolled under.

use crate::gallery::{Gallery, SubjectId};
use crate::identify::{identify, Decision, DecisionConfig};
use crate::search::{MatchConfig, Matcher};
use crate::trace::{trace_event, trace_span};
use crate::util::IdMatchResult;
use std::time::{Duration, Instant};

/// Outcome of one held-out query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeldOut {
    /// Subject the held-out model belongs to.
    pub subject: SubjectId,
    /// Position of the held-out model in the subject's list.
    pub model_index: usize,
    /// Decision made for the held-out model.
    pub decision: Decision,
}

/// Aggregate recognition figures.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationSummary {
    /// Queries run.
    pub total: usize,
    /// Queries attributed to their own subject.
    pub correct: usize,
    /// Queries attributed to another subject.
    pub wrong: usize,
    /// Queries answered with `NoMatch`.
    pub rejected: usize,
    /// Per-query outcomes in gallery order.
    pub outcomes: Vec<HeldOut>,
    /// Wall-clock time spent identifying.
    pub elapsed: Duration,
}

impl EvaluationSummary {
    /// Fraction of queries identified correctly, `None` when nothing ran.
    pub fn accuracy(&self) -> Option<f32> {
        (self.total > 0).then(|| self.correct as f32 / self.total as f32)
    }

    /// Mean identification time per query.
    pub fn mean_query_time(&self) -> Option<Duration> {
        let total = u32::try_from(self.total).ok().filter(|&n| n > 0)?;
        Some(self.elapsed / total)
    }
}

/// Runs a leave-one-out pass over every model of `gallery`.
pub fn evaluate_leave_one_out(
    gallery: &Gallery,
    match_cfg: &MatchConfig,
    decision_cfg: &DecisionConfig,
) -> IdMatchResult<EvaluationSummary> {
    let matcher = Matcher::new(match_cfg.clone())?;
    decision_cfg.validate()?;
    let _span = trace_span!("evaluate", models = gallery.model_count()).entered();

    let mut summary = EvaluationSummary::default();
    for (subject, idx) in gallery.model_refs() {
        let Some(query) = gallery.model(subject, idx) else {
            continue;
        };
        let rest = gallery.without_model(subject, idx);

        let start = Instant::now();
        let report = identify(query, &rest, &matcher, decision_cfg)?;
        summary.elapsed += start.elapsed();

        summary.total += 1;
        match report.decision {
            Decision::Match(found) if found == subject => summary.correct += 1,
            Decision::Match(_) => summary.wrong += 1,
            Decision::NoMatch => summary.rejected += 1,
        }
        summary.outcomes.push(HeldOut {
            subject,
            model_index: idx,
            decision: report.decision,
        });
    }

    trace_event!(
        "evaluated",
        total = summary.total,
        correct = summary.correct,
        wrong = summary.wrong,
        rejected = summary.rejected
    );
    Ok(summary)
}
