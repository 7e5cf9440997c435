//! Transform stage contract and bundled structural transformers.

mod add_constant_column;
mod coalesce;
mod concat_columns;
mod convert_date_format;
mod distinct;
mod drop_columns;
pub mod filter;
mod set_output_columns;
mod sql_filter;
mod text_replace;

pub use add_constant_column::AddConstantColumnTransformer;
pub use coalesce::{CoalesceInput, CoalesceTransformer};
pub use concat_columns::ConcatColumnsTransformer;
pub use convert_date_format::{ConvertDateFormatTransformer, DateErrorMode};
pub use distinct::DistinctTransformer;
pub use drop_columns::DropColumnsTransformer;
pub use filter::FilterTransformer;
pub use set_output_columns::SetOutputColumnsTransformer;
pub use sql_filter::CustomSqlFilterTransformer;
pub use text_replace::TextReplaceTransformer;

use polars::prelude::DataFrame;

use crate::error::Result;

/// A unit that turns one frame into another. The returned frame is
/// authoritative: the pipeline replaces its data with it wholesale.
pub trait Transformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame>;
}
