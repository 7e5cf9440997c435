//! Source contract and bundled extractors.

mod csv;
mod frame;

pub use csv::CsvExtractor;
pub use frame::DataFrameExtractor;

use polars::prelude::DataFrame;

use crate::error::Result;

/// A source the pipeline can pull a frame from. Failures are reported as
/// [`crate::EtlError::Extraction`].
pub trait Extractor {
    fn extract(&self) -> Result<DataFrame>;
}
