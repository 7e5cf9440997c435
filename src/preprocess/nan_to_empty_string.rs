use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::preprocess::Preprocessor;

/// Replaces nulls with the empty string on every String column. Typed
/// columns are left alone.
pub struct NanToEmptyString;

impl Preprocessor for NanToEmptyString {
    fn process(&self, df: DataFrame) -> Result<DataFrame> {
        let string_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|s| s.dtype() == &DataType::String)
            .map(|s| s.name().to_string())
            .collect();
        if string_columns.is_empty() {
            return Ok(df);
        }

        let exprs: Vec<Expr> = string_columns
            .iter()
            .map(|name| col(name).fill_null(lit("")))
            .collect();
        let out = df.lazy().with_columns(exprs).collect()?;
        info!(
            "[NanToEmptyString] normalized {} string columns",
            string_columns.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_become_empty_strings() {
        let df = df![
            "s" => [Some("a"), None],
            "n" => [Some(1i64), None]
        ]
        .unwrap();
        let out = NanToEmptyString.process(df).unwrap();
        let s: Vec<Option<&str>> = out.column("s").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(s, vec![Some("a"), Some("")]);
        // typed column untouched
        assert_eq!(out.column("n").unwrap().null_count(), 1);
    }
}
