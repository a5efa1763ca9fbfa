//! Persistence seam for galleries.
//!
//! Stores map subject ids to their model lists. Reading never partially
//! succeeds: a store either yields a complete, validated gallery or an error.

use crate::gallery::{Gallery, Model, SubjectId};
use crate::util::{IdMatchError, IdMatchResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Storage backend for per-subject models.
pub trait GalleryStore {
    /// Lists stored subject ids in ascending order.
    fn subjects(&self) -> IdMatchResult<Vec<SubjectId>>;

    /// Reads the models of one subject.
    fn read_subject(&self, subject: SubjectId) -> IdMatchResult<Vec<Model>>;

    /// Writes (replaces) the models of one subject.
    fn write_subject(&self, subject: SubjectId, models: &[Model]) -> IdMatchResult<()>;

    /// Deletes one subject. Deleting an absent subject is not an error.
    fn remove_subject(&self, subject: SubjectId) -> IdMatchResult<()>;

    /// Replaces the stored gallery with `gallery`.
    ///
    /// Subjects stored earlier but absent from `gallery` are removed, so a
    /// following `read_gallery` yields the same subjects and models.
    fn write_gallery(&self, gallery: &Gallery) -> IdMatchResult<()> {
        for stale in self.subjects()? {
            if gallery.models(stale).is_none() {
                self.remove_subject(stale)?;
            }
        }
        for (subject, models) in gallery.subjects() {
            self.write_subject(subject, models)?;
        }
        Ok(())
    }

    /// Reads every stored subject into a fresh generation-0 gallery.
    fn read_gallery(&self) -> IdMatchResult<Gallery> {
        let mut gallery = Gallery::new();
        for subject in self.subjects()? {
            let models = self.read_subject(subject)?;
            gallery.insert_subject(subject, models)?;
        }
        Ok(gallery)
    }
}

/// In-memory store, mostly useful for tests and staging.
#[derive(Debug, Default)]
pub struct MemoryStore {
    subjects: Mutex<BTreeMap<SubjectId, Vec<Model>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GalleryStore for MemoryStore {
    fn subjects(&self) -> IdMatchResult<Vec<SubjectId>> {
        let guard = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.keys().copied().collect())
    }

    fn read_subject(&self, subject: SubjectId) -> IdMatchResult<Vec<Model>> {
        let guard = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(&subject).cloned().ok_or_else(|| IdMatchError::Store {
            reason: format!("subject {subject} not found"),
        })
    }

    fn write_subject(&self, subject: SubjectId, models: &[Model]) -> IdMatchResult<()> {
        let mut guard = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(subject, models.to_vec());
        Ok(())
    }

    fn remove_subject(&self, subject: SubjectId) -> IdMatchResult<()> {
        let mut guard = self.subjects.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GalleryStore, MemoryStore};
    use crate::feature::{DescriptorSet, Keypoint};
    use crate::gallery::{Gallery, Model};
    use crate::util::IdMatchError;

    #[test]
    fn memory_store_round_trips_a_gallery() {
        let model = Model::new(
            vec![Keypoint::new(1.0, 2.0, 5.0, 30.0)],
            DescriptorSet::binary(vec![0xAA, 0x55], 2).unwrap(),
        )
        .unwrap();
        let mut gallery = Gallery::new();
        gallery.insert_model(4, model.clone()).unwrap();
        gallery.insert_model(2, model).unwrap();

        let store = MemoryStore::new();
        store.write_gallery(&gallery).unwrap();
        assert_eq!(store.subjects().unwrap(), vec![2, 4]);
        assert_eq!(store.read_gallery().unwrap(), gallery);
    }

    #[test]
    fn smaller_gallery_replaces_the_stored_one() {
        let model = Model::new(
            vec![Keypoint::new(1.0, 2.0, 5.0, 30.0)],
            DescriptorSet::binary(vec![0xAA], 1).unwrap(),
        )
        .unwrap();
        let mut first = Gallery::new();
        first.insert_model(1, model.clone()).unwrap();
        first.insert_model(2, model.clone()).unwrap();
        let mut second = Gallery::new();
        second.insert_model(1, model).unwrap();

        let store = MemoryStore::new();
        store.write_gallery(&first).unwrap();
        store.write_gallery(&second).unwrap();
        assert_eq!(store.subjects().unwrap(), vec![1]);
        assert_eq!(store.read_gallery().unwrap(), second);
    }

    #[test]
    fn missing_subject_is_a_store_error() {
        let err = MemoryStore::new().read_subject(9).unwrap_err();
        assert!(matches!(err, IdMatchError::Store { .. }));
    }
}
