//! Grayscale image buffers handed to feature extractors.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows.

use crate::util::{IdMatchError, IdMatchResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> IdMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> IdMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(IdMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns true if `other` has the same width and height.
    pub fn same_size<U>(&self, other: &ImageView<'_, U>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Contiguous owned grayscale image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a tightly packed buffer of exactly `width * height` pixels.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> IdMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(IdMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(IdMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a packed buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> IdMatchResult<Self> {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            let row = view.row(y).ok_or(IdMatchError::InvalidDimensions {
                width: view.width(),
                height: view.height(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, view.width(), view.height())
    }

    /// Borrows the image as a view.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the packed pixel buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> IdMatchResult<usize> {
    if width == 0 || height == 0 || stride < width {
        return Err(IdMatchError::InvalidDimensions { width, height });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(IdMatchError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::{ImageView, OwnedImage};
    use crate::util::IdMatchError;

    #[test]
    fn strided_view_rows_skip_padding() {
        let data = [1u8, 2, 0, 3, 4, 0];
        let view = ImageView::new(&data, 2, 2, 3).unwrap();
        assert_eq!(view.row(1), Some(&[3u8, 4][..]));
        assert_eq!(view.get(2, 0), None);
        let owned = OwnedImage::from_view(view).unwrap();
        assert_eq!(owned.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = ImageView::from_slice(&[0u8; 5], 3, 2).unwrap_err();
        assert_eq!(err, IdMatchError::BufferTooSmall { needed: 6, got: 5 });
    }
}
