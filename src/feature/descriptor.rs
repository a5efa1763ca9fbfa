//! Contiguous descriptor storage with a declared family, width and metric.

use crate::util::{IdMatchError, IdMatchResult};

/// Element family of a descriptor vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DescriptorKind {
    /// Packed bit codes stored as bytes (BRIEF, ORB, FREAK...).
    Binary,
    /// Floating point vectors (SURF, SIFT...).
    Float,
}

/// Distance metric used to compare descriptor rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Metric {
    /// Number of differing bits. Binary descriptors only.
    Hamming,
    /// L2 distance over element values.
    Euclidean,
}

impl Metric {
    /// Returns the metric conventionally used for a descriptor family.
    pub fn default_for(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Binary => Metric::Hamming,
            DescriptorKind::Float => Metric::Euclidean,
        }
    }

    /// Returns true if the metric can compare rows of `kind`.
    pub fn supports(self, kind: DescriptorKind) -> bool {
        !matches!((self, kind), (Metric::Hamming, DescriptorKind::Float))
    }
}

/// Family, width and metric declared by a feature extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorSpec {
    /// Element family.
    pub kind: DescriptorKind,
    /// Elements per row (bytes for binary, floats for float).
    pub width: usize,
    /// Metric the rows are compared with.
    pub metric: Metric,
}

impl DescriptorSpec {
    /// Fails unless `other` can be compared against `self`.
    pub fn ensure_compatible(&self, other: &DescriptorSpec) -> IdMatchResult<()> {
        if self.kind != other.kind || self.width != other.width {
            return Err(IdMatchError::DescriptorMismatch {
                expected_kind: self.kind,
                expected_width: self.width,
                got_kind: other.kind,
                got_width: other.width,
            });
        }
        if self.metric != other.metric {
            return Err(IdMatchError::IncompatibleMetric {
                metric: other.metric,
                kind: other.kind,
            });
        }
        Ok(())
    }
}

/// Borrowed view of a single descriptor row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DescriptorRow<'a> {
    /// Packed bit code bytes.
    Binary(&'a [u8]),
    /// Float vector.
    Float(&'a [f32]),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub(crate) enum DescriptorData {
    Binary(Vec<u8>),
    Float(Vec<f32>),
}

impl DescriptorData {
    fn len(&self) -> usize {
        match self {
            DescriptorData::Binary(data) => data.len(),
            DescriptorData::Float(data) => data.len(),
        }
    }

    fn kind(&self) -> DescriptorKind {
        match self {
            DescriptorData::Binary(_) => DescriptorKind::Binary,
            DescriptorData::Float(_) => DescriptorKind::Float,
        }
    }
}

/// Row-major set of equally wide descriptor vectors.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawDescriptorSet"))]
pub struct DescriptorSet {
    data: DescriptorData,
    width: usize,
    metric: Metric,
}

/// Unchecked wire form; deserialized sets go through `from_data`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDescriptorSet {
    data: DescriptorData,
    width: usize,
    metric: Metric,
}

#[cfg(feature = "serde")]
impl TryFrom<RawDescriptorSet> for DescriptorSet {
    type Error = IdMatchError;

    fn try_from(raw: RawDescriptorSet) -> IdMatchResult<Self> {
        Self::from_data(raw.data, raw.width, raw.metric)
    }
}

impl DescriptorSet {
    /// Creates a binary set compared with the Hamming metric.
    pub fn binary(data: Vec<u8>, width: usize) -> IdMatchResult<Self> {
        Self::from_data(DescriptorData::Binary(data), width, Metric::Hamming)
    }

    /// Creates a float set compared with the Euclidean metric.
    pub fn float(data: Vec<f32>, width: usize) -> IdMatchResult<Self> {
        Self::from_data(DescriptorData::Float(data), width, Metric::Euclidean)
    }

    /// Builds a binary set from individual rows.
    pub fn from_binary_rows<R: AsRef<[u8]>>(rows: &[R], width: usize) -> IdMatchResult<Self> {
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(IdMatchError::RaggedDescriptors {
                    len: row.len(),
                    width,
                });
            }
            data.extend_from_slice(row);
        }
        Self::binary(data, width)
    }

    /// Builds a float set from individual rows.
    pub fn from_float_rows<R: AsRef<[f32]>>(rows: &[R], width: usize) -> IdMatchResult<Self> {
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(IdMatchError::RaggedDescriptors {
                    len: row.len(),
                    width,
                });
            }
            data.extend_from_slice(row);
        }
        Self::float(data, width)
    }

    /// Returns an empty set of the given spec.
    pub fn empty(spec: DescriptorSpec) -> IdMatchResult<Self> {
        let data = match spec.kind {
            DescriptorKind::Binary => DescriptorData::Binary(Vec::new()),
            DescriptorKind::Float => DescriptorData::Float(Vec::new()),
        };
        Self::from_data(data, spec.width, spec.metric)
    }

    /// Re-declares the metric the set is compared with.
    pub fn with_metric(mut self, metric: Metric) -> IdMatchResult<Self> {
        if !metric.supports(self.kind()) {
            return Err(IdMatchError::IncompatibleMetric {
                metric,
                kind: self.kind(),
            });
        }
        self.metric = metric;
        Ok(self)
    }

    fn from_data(data: DescriptorData, width: usize, metric: Metric) -> IdMatchResult<Self> {
        let set = Self {
            data,
            width,
            metric,
        };
        set.validate()?;
        Ok(set)
    }

    pub(crate) fn validate(&self) -> IdMatchResult<()> {
        if self.width == 0 {
            return Err(IdMatchError::InvalidDimensions {
                width: 0,
                height: self.data.len(),
            });
        }
        if self.data.len() % self.width != 0 {
            return Err(IdMatchError::RaggedDescriptors {
                len: self.data.len(),
                width: self.width,
            });
        }
        if !self.metric.supports(self.kind()) {
            return Err(IdMatchError::IncompatibleMetric {
                metric: self.metric,
                kind: self.kind(),
            });
        }
        Ok(())
    }

    /// Number of descriptor rows.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.width).unwrap_or(0)
    }

    /// Returns true if the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Number of elements per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Element family of the rows.
    pub fn kind(&self) -> DescriptorKind {
        self.data.kind()
    }

    /// Declared comparison metric.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Family, width and metric of this set.
    pub fn spec(&self) -> DescriptorSpec {
        DescriptorSpec {
            kind: self.kind(),
            width: self.width,
            metric: self.metric,
        }
    }

    /// Returns row `idx` if it exists.
    pub fn row(&self, idx: usize) -> Option<DescriptorRow<'_>> {
        let start = idx.checked_mul(self.width)?;
        let end = start.checked_add(self.width)?;
        match &self.data {
            DescriptorData::Binary(data) => data.get(start..end).map(DescriptorRow::Binary),
            DescriptorData::Float(data) => data.get(start..end).map(DescriptorRow::Float),
        }
    }

    /// Flat binary buffer, if the set is binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.data {
            DescriptorData::Binary(data) => Some(data),
            DescriptorData::Float(_) => None,
        }
    }

    /// Flat float buffer, if the set is float.
    pub fn as_float(&self) -> Option<&[f32]> {
        match &self.data {
            DescriptorData::Float(data) => Some(data),
            DescriptorData::Binary(_) => None,
        }
    }

    /// Copies the listed rows, in order, into a new set.
    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        let width = self.width;
        let data = match &self.data {
            DescriptorData::Binary(data) => DescriptorData::Binary(
                rows.iter()
                    .flat_map(|&r| data[r * width..(r + 1) * width].iter().copied())
                    .collect(),
            ),
            DescriptorData::Float(data) => DescriptorData::Float(
                rows.iter()
                    .flat_map(|&r| data[r * width..(r + 1) * width].iter().copied())
                    .collect(),
            ),
        };
        Self {
            data,
            width,
            metric: self.metric,
        }
    }
}
