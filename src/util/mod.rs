//! Shared utility helpers.

pub mod budget;
pub mod error;
pub(crate) mod math;

pub use budget::{Budget, CancelToken};
pub use error::{IdMatchError, IdMatchResult};
