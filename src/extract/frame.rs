use polars::prelude::DataFrame;

use crate::error::Result;
use crate::extract::Extractor;

/// Wraps an already-built frame so it can enter a pipeline through the
/// regular extract stage. Useful for tests and for embedding the pipeline
/// in systems that produce frames elsewhere.
pub struct DataFrameExtractor {
    df: DataFrame,
}

impl DataFrameExtractor {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }
}

impl Extractor for DataFrameExtractor {
    fn extract(&self) -> Result<DataFrame> {
        Ok(self.df.clone())
    }
}
