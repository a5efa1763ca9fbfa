//! Boundary to external keypoint/descriptor extractors.
//!
//! Extraction itself is not implemented here. Extractors are plugged in
//! through `FeatureExtractor`; every model they return is checked against the
//! descriptor spec they declare before it can enter a gallery.

use crate::feature::{DescriptorKind, DescriptorSpec, Metric};
use crate::gallery::{Gallery, Model, SubjectId};
use crate::image::ImageView;
use crate::util::{IdMatchError, IdMatchResult};
use std::fmt;
use std::str::FromStr;

/// Produces a model (keypoints plus aligned descriptors) from a photo.
pub trait FeatureExtractor {
    /// Family, width and metric of every descriptor this extractor emits.
    fn spec(&self) -> DescriptorSpec;

    /// Extracts features from a grayscale image, optionally restricted to the
    /// non-zero pixels of `mask`.
    fn extract(
        &self,
        image: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
    ) -> IdMatchResult<Model>;
}

/// Known extractor families, selected by name at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExtractorFamily {
    /// FAST corners with 32-byte BRIEF codes.
    FastBrief,
    /// SURF blobs with 64-float descriptors.
    Surf,
}

impl ExtractorFamily {
    /// Descriptor spec emitted by this family.
    pub fn descriptor_spec(self) -> DescriptorSpec {
        match self {
            ExtractorFamily::FastBrief => DescriptorSpec {
                kind: DescriptorKind::Binary,
                width: 32,
                metric: Metric::Hamming,
            },
            ExtractorFamily::Surf => DescriptorSpec {
                kind: DescriptorKind::Float,
                width: 64,
                metric: Metric::Euclidean,
            },
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            ExtractorFamily::FastBrief => "fast-brief",
            ExtractorFamily::Surf => "surf",
        }
    }
}

impl fmt::Display for ExtractorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtractorFamily {
    type Err = IdMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast-brief" | "fast_brief" | "fastbrief" | "fast2" | "brief" => {
                Ok(ExtractorFamily::FastBrief)
            }
            "surf" | "surf500" => Ok(ExtractorFamily::Surf),
            _ => Err(IdMatchError::InvalidConfig {
                reason: "unknown extractor family",
            }),
        }
    }
}

/// Runs `extractor` on one photo and checks the result against its spec.
pub fn extract_checked<E: FeatureExtractor + ?Sized>(
    extractor: &E,
    image: ImageView<'_, u8>,
    mask: Option<ImageView<'_, u8>>,
) -> IdMatchResult<Model> {
    if let Some(mask) = &mask {
        if !mask.same_size(&image) {
            return Err(IdMatchError::InvalidDimensions {
                width: mask.width(),
                height: mask.height(),
            });
        }
    }
    let model = extractor.extract(image, mask)?;
    model.validate()?;
    extractor.spec().ensure_compatible(&model.spec())?;
    Ok(model)
}

/// Builds one model per photo of a subject, in photo order.
pub fn analyze_subject<E: FeatureExtractor + ?Sized>(
    extractor: &E,
    images: &[ImageView<'_, u8>],
) -> IdMatchResult<Vec<Model>> {
    images
        .iter()
        .map(|image| extract_checked(extractor, *image, None))
        .collect()
}

/// Analyzes a subject's photos and enrolls the models into `gallery`.
pub fn enroll_subject<E: FeatureExtractor + ?Sized>(
    gallery: &mut Gallery,
    subject: SubjectId,
    extractor: &E,
    images: &[ImageView<'_, u8>],
) -> IdMatchResult<()> {
    let models = analyze_subject(extractor, images)?;
    gallery.insert_subject(subject, models)
}

#[cfg(test)]
mod tests {
    use super::{analyze_subject, extract_checked, ExtractorFamily, FeatureExtractor};
    use crate::feature::{DescriptorSet, DescriptorSpec, Keypoint};
    use crate::gallery::Model;
    use crate::image::ImageView;
    use crate::util::{IdMatchError, IdMatchResult};

    /// One keypoint per image row, described by the row's first bytes.
    struct RowExtractor {
        width: usize,
    }

    impl FeatureExtractor for RowExtractor {
        fn spec(&self) -> DescriptorSpec {
            ExtractorFamily::FastBrief.descriptor_spec()
        }

        fn extract(
            &self,
            image: ImageView<'_, u8>,
            _mask: Option<ImageView<'_, u8>>,
        ) -> IdMatchResult<Model> {
            let mut keypoints = Vec::new();
            let mut data = Vec::new();
            for y in 0..image.height() {
                let row = image.row(y).unwrap_or(&[]);
                keypoints.push(Keypoint::new(0.0, y as f32, 3.0, 0.0));
                data.extend((0..self.width).map(|i| row.get(i).copied().unwrap_or(0)));
            }
            Model::new(keypoints, DescriptorSet::binary(data, self.width)?)
        }
    }

    #[test]
    fn family_names_parse() {
        assert_eq!("surf500".parse::<ExtractorFamily>(), Ok(ExtractorFamily::Surf));
        assert_eq!(" Fast-Brief ".parse::<ExtractorFamily>(), Ok(ExtractorFamily::FastBrief));
        assert!("eigenfaces".parse::<ExtractorFamily>().is_err());
        assert_eq!(ExtractorFamily::Surf.descriptor_spec().width, 64);
    }

    #[test]
    fn analyze_subject_builds_one_model_per_photo() {
        let pixels = vec![7u8; 40 * 3];
        let image = ImageView::from_slice(&pixels, 40, 3).unwrap();
        let models = analyze_subject(&RowExtractor { width: 32 }, &[image, image]).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].len(), 3);
    }

    #[test]
    fn output_off_spec_is_rejected() {
        let pixels = vec![7u8; 40 * 3];
        let image = ImageView::from_slice(&pixels, 40, 3).unwrap();
        let err = extract_checked(&RowExtractor { width: 16 }, image, None).unwrap_err();
        assert!(matches!(err, IdMatchError::DescriptorMismatch { .. }));

        let mask = ImageView::from_slice(&pixels, 20, 6).unwrap();
        let err = extract_checked(&RowExtractor { width: 32 }, image, Some(mask)).unwrap_err();
        assert!(matches!(err, IdMatchError::InvalidDimensions { .. }));
    }
}
