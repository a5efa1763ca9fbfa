//! Per-subject reference models and gallery generations.
//!
//! A `Gallery` is an immutable snapshot once published: queries read it
//! through an `Arc`, and curation builds a whole new gallery which a
//! `GalleryHandle` swaps in atomically. Subjects are kept in a `BTreeMap`, so
//! every sweep visits them in ascending id order.

mod model;
pub mod store;

#[cfg(feature = "serde")]
pub mod json;

pub use model::Model;
pub use store::{GalleryStore, MemoryStore};

use crate::feature::DescriptorSpec;
use crate::trace::trace_event;
use crate::util::{IdMatchError, IdMatchResult};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Identifier of an enrolled subject.
pub type SubjectId = u32;

/// Mapping of subject id to that subject's reference models.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGallery"))]
pub struct Gallery {
    subjects: BTreeMap<SubjectId, Vec<Model>>,
    generation: u64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawGallery {
    subjects: BTreeMap<SubjectId, Vec<Model>>,
    generation: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGallery> for Gallery {
    type Error = IdMatchError;

    /// Re-enrolls every subject so the single-spec rule holds.
    fn try_from(raw: RawGallery) -> IdMatchResult<Self> {
        let mut gallery = Gallery::new();
        for (subject, models) in raw.subjects {
            gallery.insert_subject(subject, models)?;
        }
        gallery.generation = raw.generation;
        Ok(gallery)
    }
}

impl Gallery {
    /// Creates an empty gallery at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model to a subject, creating the subject if needed.
    ///
    /// All models of a gallery must share one descriptor spec.
    pub fn insert_model(&mut self, subject: SubjectId, model: Model) -> IdMatchResult<()> {
        model.validate()?;
        if let Some(spec) = self.spec() {
            spec.ensure_compatible(&model.spec())?;
        }
        self.subjects.entry(subject).or_default().push(model);
        Ok(())
    }

    /// Enrolls a subject with the given models, replacing any previous ones.
    ///
    /// A subject with no models is kept but never takes part in decisions.
    pub fn insert_subject(
        &mut self,
        subject: SubjectId,
        models: Vec<Model>,
    ) -> IdMatchResult<()> {
        let previous = self.subjects.insert(subject, Vec::new());
        for model in models {
            if let Err(err) = self.insert_model(subject, model) {
                match previous {
                    Some(models) => self.subjects.insert(subject, models),
                    None => self.subjects.remove(&subject),
                };
                return Err(err);
            }
        }
        Ok(())
    }

    /// Removes a subject and returns its models.
    pub fn remove_subject(&mut self, subject: SubjectId) -> Option<Vec<Model>> {
        self.subjects.remove(&subject)
    }

    /// Models of one subject.
    pub fn models(&self, subject: SubjectId) -> Option<&[Model]> {
        self.subjects.get(&subject).map(Vec::as_slice)
    }

    /// Iterates subjects in ascending id order.
    pub fn subjects(&self) -> impl Iterator<Item = (SubjectId, &[Model])> + '_ {
        self.subjects
            .iter()
            .map(|(&id, models)| (id, models.as_slice()))
    }

    /// Subject ids in ascending order.
    pub fn subject_ids(&self) -> Vec<SubjectId> {
        self.subjects.keys().copied().collect()
    }

    /// Number of subjects.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Returns true if no subject is enrolled.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Total number of models across subjects.
    pub fn model_count(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    /// Generation number of this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Descriptor spec shared by all models, if any model exists.
    pub fn spec(&self) -> Option<DescriptorSpec> {
        self.subjects.values().flatten().next().map(Model::spec)
    }

    /// Every (subject, model index) pair in sweep order.
    pub(crate) fn model_refs(&self) -> Vec<(SubjectId, usize)> {
        self.subjects
            .iter()
            .flat_map(|(&id, models)| (0..models.len()).map(move |idx| (id, idx)))
            .collect()
    }

    pub(crate) fn model(&self, subject: SubjectId, idx: usize) -> Option<&Model> {
        self.subjects.get(&subject)?.get(idx)
    }

    /// Copy of this gallery without one model (leave-one-out).
    pub(crate) fn without_model(&self, subject: SubjectId, idx: usize) -> Gallery {
        let mut out = self.clone();
        if let Some(models) = out.subjects.get_mut(&subject) {
            if idx < models.len() {
                models.remove(idx);
            }
        }
        out
    }

    pub(crate) fn from_subjects(
        subjects: BTreeMap<SubjectId, Vec<Model>>,
        generation: u64,
    ) -> Self {
        Self {
            subjects,
            generation,
        }
    }
}

/// Shared, swappable reference to the current gallery generation.
///
/// Readers take an `Arc` snapshot and keep using it even if a new generation
/// is published meanwhile.
#[derive(Debug, Default)]
pub struct GalleryHandle {
    current: RwLock<Arc<Gallery>>,
}

impl GalleryHandle {
    /// Wraps an initial gallery.
    pub fn new(gallery: Gallery) -> Self {
        Self {
            current: RwLock::new(Arc::new(gallery)),
        }
    }

    /// Returns the current generation.
    pub fn snapshot(&self) -> Arc<Gallery> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Generation number currently visible to readers.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    /// Replaces the current gallery and returns the new generation number,
    /// one past the replaced one.
    pub fn publish(&self, mut gallery: Gallery) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        gallery.generation = guard.generation + 1;
        let generation = gallery.generation;
        *guard = Arc::new(gallery);
        trace_event!("gallery_published", generation = generation);
        generation
    }

    /// Publishes `gallery` only if the current generation is still `base`.
    ///
    /// Fails with `StaleGeneration`, leaving the current gallery in place,
    /// when another generation was published after `base` was read.
    pub fn compare_and_publish(&self, base: u64, mut gallery: Gallery) -> IdMatchResult<u64> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if guard.generation != base {
            return Err(IdMatchError::StaleGeneration {
                expected: base,
                current: guard.generation,
            });
        }
        gallery.generation = base + 1;
        let generation = gallery.generation;
        *guard = Arc::new(gallery);
        trace_event!("gallery_published", generation = generation);
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::{Gallery, GalleryHandle, Model};
    use crate::feature::{DescriptorSet, Keypoint};
    use crate::util::IdMatchError;

    fn model(width: usize) -> Model {
        Model::new(
            vec![Keypoint::new(0.0, 0.0, 7.0, 0.0)],
            DescriptorSet::binary(vec![0; width], width).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn subjects_iterate_in_id_order() {
        let mut gallery = Gallery::new();
        for id in [7, 3, 5] {
            gallery.insert_model(id, model(4)).unwrap();
        }
        assert_eq!(gallery.subject_ids(), vec![3, 5, 7]);
        assert_eq!(gallery.model_refs(), vec![(3, 0), (5, 0), (7, 0)]);
    }

    #[test]
    fn mixed_specs_are_rejected() {
        let mut gallery = Gallery::new();
        gallery.insert_model(1, model(4)).unwrap();
        let err = gallery.insert_model(2, model(8)).unwrap_err();
        assert!(matches!(err, IdMatchError::DescriptorMismatch { .. }));
        assert!(gallery.models(2).is_none());
        assert!(gallery.insert_subject(2, vec![model(4), model(8)]).is_err());
        assert!(gallery.models(2).is_none());
    }

    #[test]
    fn stale_base_is_not_published() {
        let handle = GalleryHandle::new(Gallery::new());
        let base = handle.snapshot().generation();

        let mut concurrent = Gallery::new();
        concurrent.insert_model(9, model(4)).unwrap();
        assert_eq!(handle.publish(concurrent), 1);

        let err = handle.compare_and_publish(base, Gallery::new()).unwrap_err();
        assert_eq!(
            err,
            IdMatchError::StaleGeneration {
                expected: 0,
                current: 1
            }
        );
        assert_eq!(handle.generation(), 1);
        assert!(handle.snapshot().models(9).is_some());

        assert_eq!(handle.compare_and_publish(1, Gallery::new()), Ok(2));
    }

    #[test]
    fn snapshots_survive_publish() {
        let mut first = Gallery::new();
        first.insert_model(1, model(4)).unwrap();
        let handle = GalleryHandle::new(first);
        let before = handle.snapshot();

        let generation = handle.publish(Gallery::new());
        assert_eq!(generation, 1);
        assert_eq!(before.len(), 1);
        assert_eq!(before.generation(), 0);
        assert!(handle.snapshot().is_empty());
        assert_eq!(handle.generation(), 1);
    }
}
