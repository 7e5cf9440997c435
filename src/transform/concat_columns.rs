use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// Concatenates string columns into one output column with a separator.
/// With `skip_empty`, null and empty parts contribute nothing (no dangling
/// separators).
pub struct ConcatColumnsTransformer {
    columns: Vec<String>,
    output_column: String,
    separator: String,
    drop_originals: bool,
    skip_empty: bool,
}

impl ConcatColumnsTransformer {
    pub fn new(columns: &[&str], output_column: impl Into<String>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            output_column: output_column.into(),
            separator: "_".to_string(),
            drop_originals: false,
            skip_empty: true,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn drop_originals(mut self, drop: bool) -> Self {
        self.drop_originals = drop;
        self
    }

    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }
}

impl Transformer for ConcatColumnsTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let names = df.get_column_names();
        let missing: Vec<&String> = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::Schema(format!(
                "columns to concatenate not found: {:?}",
                missing
            )));
        }

        let mut part_columns = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let ca = df.column(name)?.cast(&DataType::String)?;
            let parts: Vec<Option<String>> = ca
                .str()?
                .into_iter()
                .map(|v| v.map(|s| s.trim().to_string()))
                .collect();
            part_columns.push(parts);
        }

        let mut out_values = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut pieces = Vec::new();
            for parts in &part_columns {
                match &parts[i] {
                    Some(s) if self.skip_empty && s.is_empty() => {}
                    Some(s) => pieces.push(s.clone()),
                    None if self.skip_empty => {}
                    None => pieces.push(String::new()),
                }
            }
            out_values.push(pieces.join(&self.separator));
        }

        let mut out = df;
        out.with_column(Series::new(&self.output_column, out_values))?;
        if self.drop_originals {
            for name in &self.columns {
                if out.get_column_names().contains(&name.as_str()) {
                    out = out.drop(name)?;
                }
            }
        }

        info!(
            "[ConcatColumnsTransformer] created column '{}'",
            self.output_column
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_skipping_empty() {
        let df = df![
            "cognome" => [Some("Rossi"), Some("Bianchi"), None],
            "nome" => [Some("Mario"), Some(""), Some("Luca")]
        ]
        .unwrap();
        let out = ConcatColumnsTransformer::new(&["cognome", "nome"], "full")
            .with_separator(" ")
            .transform(df)
            .unwrap();
        let full: Vec<Option<&str>> = out.column("full").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(full, vec![Some("Rossi Mario"), Some("Bianchi"), Some("Luca")]);
    }

    #[test]
    fn drop_originals_removes_inputs() {
        let df = df!["a" => ["x"], "b" => ["y"]].unwrap();
        let out = ConcatColumnsTransformer::new(&["a", "b"], "ab")
            .drop_originals(true)
            .transform(df)
            .unwrap();
        assert_eq!(out.get_column_names(), &["ab"]);
    }
}
