//! Preprocess stage contract and bundled normalizers. Preprocessors run
//! before business transforms and only normalize cell representation; they
//! never change the row set.

mod case_fold;
mod nan_to_empty_string;
mod pad_column;
mod trim;

pub use case_fold::{ToLowerPreprocessor, ToUpperPreprocessor};
pub use nan_to_empty_string::NanToEmptyString;
pub use pad_column::{PadColumnPreprocessor, PadDirection};
pub use trim::TrimWhitespace;

use polars::prelude::DataFrame;

use crate::error::Result;

/// A unit that normalizes a frame ahead of the transform chain. The
/// returned frame is authoritative.
pub trait Preprocessor {
    fn process(&self, df: DataFrame) -> Result<DataFrame>;
}
