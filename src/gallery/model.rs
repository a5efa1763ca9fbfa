//! One reference sample: index-aligned keypoints and descriptors.

use crate::feature::{DescriptorSet, DescriptorSpec, Keypoint};
use crate::util::{IdMatchError, IdMatchResult};

/// Reference feature set of one photo of a subject.
///
/// Models are immutable once built. Curation never edits a model in place;
/// it produces a new one with the selected rows copied over.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawModel"))]
pub struct Model {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorSet,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    cross_hits: Option<Vec<u32>>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawModel {
    keypoints: Vec<Keypoint>,
    descriptors: DescriptorSet,
    #[serde(default)]
    cross_hits: Option<Vec<u32>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawModel> for Model {
    type Error = IdMatchError;

    fn try_from(raw: RawModel) -> IdMatchResult<Self> {
        let model = Self {
            keypoints: raw.keypoints,
            descriptors: raw.descriptors,
            cross_hits: raw.cross_hits,
        };
        model.validate()?;
        Ok(model)
    }
}

impl Model {
    /// Builds a model, checking alignment and keypoint validity.
    pub fn new(keypoints: Vec<Keypoint>, descriptors: DescriptorSet) -> IdMatchResult<Self> {
        let model = Self {
            keypoints,
            descriptors,
            cross_hits: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Returns an empty model for the given descriptor spec.
    pub fn empty(spec: DescriptorSpec) -> IdMatchResult<Self> {
        Self::new(Vec::new(), DescriptorSet::empty(spec)?)
    }

    /// Attaches per-keypoint cross-hit counters.
    pub fn with_cross_hits(mut self, cross_hits: Vec<u32>) -> IdMatchResult<Self> {
        self.cross_hits = Some(cross_hits);
        self.validate()?;
        Ok(self)
    }

    /// Checks the alignment invariant and every keypoint.
    pub fn validate(&self) -> IdMatchResult<()> {
        self.descriptors.validate()?;
        let ragged = self.keypoints.len() != self.descriptors.len()
            || self
                .cross_hits
                .as_ref()
                .is_some_and(|hits| hits.len() != self.keypoints.len());
        if ragged {
            return Err(IdMatchError::RaggedModel {
                keypoints: self.keypoints.len(),
                descriptors: self.descriptors.len(),
                cross_hits: self.cross_hits.as_ref().map(Vec::len),
            });
        }
        for (index, keypoint) in self.keypoints.iter().enumerate() {
            keypoint.validate(index)?;
        }
        Ok(())
    }

    /// Keypoints, aligned with descriptor rows.
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Descriptor rows, aligned with keypoints.
    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    /// Cross-hit counters, present only on models annotated by curation.
    pub fn cross_hits(&self) -> Option<&[u32]> {
        self.cross_hits.as_deref()
    }

    /// Descriptor family, width and metric.
    pub fn spec(&self) -> DescriptorSpec {
        self.descriptors.spec()
    }

    /// Number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns true if the model has no keypoints.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Builds a new model from the listed rows, without cross-hit counters.
    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        Self {
            keypoints: rows.iter().map(|&r| self.keypoints[r]).collect(),
            descriptors: self.descriptors.select(rows),
            cross_hits: None,
        }
    }

    /// Keeps only keypoints that never matched another subject.
    ///
    /// Without counters the model is returned unchanged (minus counters).
    pub fn retain_discriminative(&self) -> Self {
        match &self.cross_hits {
            Some(hits) => {
                let rows: Vec<usize> = hits
                    .iter()
                    .enumerate()
                    .filter_map(|(row, &count)| (count == 0).then_some(row))
                    .collect();
                self.select(&rows)
            }
            None => Self {
                cross_hits: None,
                ..self.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Model;
    use crate::feature::{DescriptorSet, Keypoint};
    use crate::util::IdMatchError;

    fn model(n: usize) -> Model {
        let keypoints = (0..n)
            .map(|i| Keypoint::new(i as f32, 0.0, 7.0, 0.0))
            .collect();
        let descriptors = DescriptorSet::binary((0..n as u8).collect(), 1).unwrap();
        Model::new(keypoints, descriptors).unwrap()
    }

    #[test]
    fn misaligned_model_is_rejected() {
        let keypoints = vec![Keypoint::new(0.0, 0.0, 7.0, 0.0)];
        let descriptors = DescriptorSet::binary(vec![1, 2], 1).unwrap();
        let err = Model::new(keypoints, descriptors).unwrap_err();
        assert_eq!(
            err,
            IdMatchError::RaggedModel {
                keypoints: 1,
                descriptors: 2,
                cross_hits: None,
            }
        );
        assert!(model(3).with_cross_hits(vec![0, 0]).is_err());
    }

    #[test]
    fn retain_discriminative_drops_hit_rows() {
        let annotated = model(4).with_cross_hits(vec![0, 2, 0, 1]).unwrap();
        let pruned = annotated.retain_discriminative();
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned.keypoints()[1].x, 2.0);
        assert!(pruned.cross_hits().is_none());
        assert_eq!(pruned.descriptors().as_binary(), Some(&[0u8, 2][..]));
    }
}
