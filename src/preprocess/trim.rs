use polars::prelude::*;

use crate::error::Result;
use crate::preprocess::Preprocessor;

/// Strips leading and trailing whitespace on every String column.
pub struct TrimWhitespace;

impl Preprocessor for TrimWhitespace {
    fn process(&self, df: DataFrame) -> Result<DataFrame> {
        let targets: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|s| s.dtype() == &DataType::String)
            .map(|s| s.name().to_string())
            .collect();
        if targets.is_empty() {
            return Ok(df);
        }

        let exprs: Vec<Expr> = targets
            .iter()
            .map(|name| col(name).str().strip_chars(lit(NULL)))
            .collect();
        Ok(df.lazy().with_columns(exprs).collect()?)
    }
}
