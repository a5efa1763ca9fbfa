//! Offline cross-subject pruning of non-discriminative keypoints.
//!
//! Each reference model of a subject is cross-tested against every photo of
//! every other subject, with the other photo as the query and the model as
//! the reference. For every query row that survives the full matching stack,
//! all of its `k` neighbor rows in the model get a cross hit: any of them is a
//! plausible false match. Keypoints that end the sweep with zero hits are the
//! discriminative ones and are the only ones kept.
//!
//! The sweep never touches the input gallery. It builds new models and a new
//! gallery one generation ahead, which callers publish through a
//! `GalleryHandle` once the whole sweep has completed.

use crate::gallery::{Gallery, GalleryHandle, Model, SubjectId};
use crate::search::{MatchConfig, Matcher};
use crate::trace::{trace_event, trace_span};
use crate::util::{Budget, IdMatchError, IdMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Parameters of a curation sweep.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CurateConfig {
    /// Matching stack used for cross-testing. Defaults to `k = 5`.
    pub matching: MatchConfig,
    /// Fan out over (subject, model) targets (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig {
                knn: 5,
                ..MatchConfig::default()
            },
            parallel: false,
        }
    }
}

impl CurateConfig {
    /// Validates the embedded matching configuration.
    pub fn validate(&self) -> IdMatchResult<()> {
        self.matching.validate()
    }
}

/// Pruning outcome of one reference model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelCuration {
    /// Subject the model is enrolled under.
    pub subject: SubjectId,
    /// Position of the model in the subject's list.
    pub model_index: usize,
    /// Keypoints with zero cross hits.
    pub kept: usize,
    /// Keypoints hit at least once.
    pub dropped: usize,
    /// Number of keypoints per cross-hit count.
    pub hit_histogram: BTreeMap<u32, usize>,
}

/// Summary of a full sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurationReport {
    /// One entry per model, in gallery sweep order.
    pub models: Vec<ModelCuration>,
    /// Generation number of the curated gallery.
    pub generation: u64,
}

impl CurationReport {
    /// Keypoints kept across the gallery.
    pub fn total_kept(&self) -> usize {
        self.models.iter().map(|m| m.kept).sum()
    }

    /// Keypoints dropped across the gallery.
    pub fn total_dropped(&self) -> usize {
        self.models.iter().map(|m| m.dropped).sum()
    }
}

/// Runs cross-test pruning with a fixed configuration.
#[derive(Clone, Debug)]
pub struct Curator {
    cfg: CurateConfig,
    matcher: Matcher,
}

impl Default for Curator {
    fn default() -> Self {
        let cfg = CurateConfig::default();
        Self {
            matcher: Matcher::from_validated(cfg.matching.clone()),
            cfg,
        }
    }
}

impl Curator {
    /// Creates a curator after validating the configuration.
    pub fn new(cfg: CurateConfig) -> IdMatchResult<Self> {
        let matcher = Matcher::new(cfg.matching.clone())?;
        Ok(Self { cfg, matcher })
    }

    /// Returns the curator configuration.
    pub fn config(&self) -> &CurateConfig {
        &self.cfg
    }

    /// Counts cross hits of `model` (enrolled under `subject`) against every
    /// other subject of `gallery`, returning a copy annotated with counters.
    pub fn cross_test_model(
        &self,
        gallery: &Gallery,
        subject: SubjectId,
        model: &Model,
        budget: &Budget,
    ) -> IdMatchResult<Model> {
        let mut hits = vec![0u32; model.len()];
        for (other, photos) in gallery.subjects() {
            if other == subject {
                continue;
            }
            for photo in photos {
                if budget.is_exhausted() {
                    return Err(IdMatchError::Cancelled);
                }
                let pair = self.matcher.score(photo, model)?;
                for row in pair.result.alive_rows() {
                    for &neighbor in pair.result.neighbors(row) {
                        if let Some(count) = hits.get_mut(neighbor) {
                            *count += 1;
                        }
                    }
                }
            }
        }
        model.clone().with_cross_hits(hits)
    }

    /// Cross-tests one model and keeps only its zero-hit keypoints.
    ///
    /// The returned summary has `model_index` 0; gallery sweeps fill it in.
    pub fn curate_model(
        &self,
        gallery: &Gallery,
        subject: SubjectId,
        model: &Model,
        budget: &Budget,
    ) -> IdMatchResult<(Model, ModelCuration)> {
        let _span =
            trace_span!("curate_model", subject = subject, keypoints = model.len()).entered();
        let annotated = self.cross_test_model(gallery, subject, model, budget)?;
        let mut hit_histogram = BTreeMap::new();
        for &count in annotated.cross_hits().unwrap_or(&[]) {
            *hit_histogram.entry(count).or_insert(0) += 1;
        }
        let pruned = annotated.retain_discriminative();
        let summary = ModelCuration {
            subject,
            model_index: 0,
            kept: pruned.len(),
            dropped: model.len() - pruned.len(),
            hit_histogram,
        };
        trace_event!("model_curated", kept = summary.kept, dropped = summary.dropped);
        Ok((pruned, summary))
    }

    fn curate_target(
        &self,
        gallery: &Gallery,
        subject: SubjectId,
        idx: usize,
        budget: &Budget,
    ) -> IdMatchResult<(Model, ModelCuration)> {
        if budget.is_exhausted() {
            return Err(IdMatchError::Cancelled);
        }
        let model = gallery.model(subject, idx).ok_or(IdMatchError::InvalidConfig {
            reason: "gallery changed during curation",
        })?;
        let (pruned, mut summary) = self.curate_model(gallery, subject, model, budget)?;
        summary.model_index = idx;
        Ok((pruned, summary))
    }

    /// Curates every model of `gallery` and returns the next generation.
    ///
    /// Cancellation or deadline expiry aborts the sweep with `Cancelled`;
    /// nothing partial is returned.
    pub fn curate_gallery(
        &self,
        gallery: &Gallery,
        budget: &Budget,
    ) -> IdMatchResult<(Gallery, CurationReport)> {
        let _span = trace_span!(
            "curate_gallery",
            subjects = gallery.len(),
            models = gallery.model_count()
        )
        .entered();

        let targets = gallery.model_refs();

        #[cfg(feature = "rayon")]
        let curated: Vec<(Model, ModelCuration)> = if self.cfg.parallel {
            targets
                .par_iter()
                .map(|&(subject, idx)| self.curate_target(gallery, subject, idx, budget))
                .collect::<IdMatchResult<_>>()?
        } else {
            targets
                .iter()
                .map(|&(subject, idx)| self.curate_target(gallery, subject, idx, budget))
                .collect::<IdMatchResult<_>>()?
        };
        #[cfg(not(feature = "rayon"))]
        let curated: Vec<(Model, ModelCuration)> = targets
            .iter()
            .map(|&(subject, idx)| self.curate_target(gallery, subject, idx, budget))
            .collect::<IdMatchResult<_>>()?;

        let mut subjects: BTreeMap<SubjectId, Vec<Model>> = gallery
            .subject_ids()
            .into_iter()
            .map(|subject| (subject, Vec::new()))
            .collect();
        let mut report = CurationReport {
            models: Vec::with_capacity(curated.len()),
            generation: gallery.generation() + 1,
        };
        for (model, summary) in curated {
            subjects.entry(summary.subject).or_default().push(model);
            report.models.push(summary);
        }

        trace_event!(
            "gallery_curated",
            kept = report.total_kept(),
            dropped = report.total_dropped(),
            generation = report.generation
        );
        Ok((Gallery::from_subjects(subjects, report.generation), report))
    }

    /// Curates the current generation of `handle` and publishes the result.
    ///
    /// On error nothing is published and readers keep the old generation.
    /// If another generation was published during the sweep the result is
    /// discarded with `StaleGeneration`.
    pub fn curate_and_publish(
        &self,
        handle: &GalleryHandle,
        budget: &Budget,
    ) -> IdMatchResult<CurationReport> {
        let snapshot = handle.snapshot();
        let (curated, mut report) = self.curate_gallery(&snapshot, budget)?;
        report.generation = handle.compare_and_publish(snapshot.generation(), curated)?;
        Ok(report)
    }
}
