//! Photo loading via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{IdMatchError, IdMatchResult};
use std::path::Path;

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &image::GrayImage) -> IdMatchResult<ImageView<'_, u8>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    ImageView::from_slice(img.as_raw(), width, height)
}

/// Loads a photo from disk as an owned grayscale image.
///
/// Color images are converted to luma, which is what extractors consume.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> IdMatchResult<OwnedImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| IdMatchError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    let gray = img.into_luma8();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Loads every photo of a subject, in the given order.
pub fn load_gray_images<P: AsRef<Path>>(paths: &[P]) -> IdMatchResult<Vec<OwnedImage>> {
    paths.iter().map(load_gray_image).collect()
}
