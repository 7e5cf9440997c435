use polars::prelude::*;
use tracing::info;

use crate::dataset::ColumnMapping;
use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// Fixes the output column set: select-and-order, or rename-and-order.
/// Unlike the lenient sink mapping, a listed column that is missing from
/// the frame is a schema error here.
pub struct SetOutputColumnsTransformer {
    mode: Mode,
}

enum Mode {
    Select(Vec<String>),
    Rename(ColumnMapping),
}

impl SetOutputColumnsTransformer {
    /// Keep exactly these columns, in this order.
    pub fn select(columns: &[&str]) -> Self {
        Self {
            mode: Mode::Select(columns.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Rename per the mapping and keep only the renamed columns, in mapping
    /// order.
    pub fn rename(mapping: ColumnMapping) -> Self {
        Self {
            mode: Mode::Rename(mapping),
        }
    }
}

impl Transformer for SetOutputColumnsTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let names = df.get_column_names();
        let out = match &self.mode {
            Mode::Select(columns) => {
                let missing: Vec<&String> =
                    columns.iter().filter(|c| !names.contains(&c.as_str())).collect();
                if !missing.is_empty() {
                    return Err(EtlError::Schema(format!(
                        "columns to select not found: {:?}",
                        missing
                    )));
                }
                df.select(columns.clone())?
            }
            Mode::Rename(mapping) => {
                let missing: Vec<&String> = mapping
                    .iter()
                    .map(|(src, _)| src)
                    .filter(|c| !names.contains(&c.as_str()))
                    .collect();
                if !missing.is_empty() {
                    return Err(EtlError::Schema(format!(
                        "columns to rename not found: {:?}",
                        missing
                    )));
                }
                crate::dataset::map_columns(&df, mapping)?
            }
        };
        info!(
            "[SetOutputColumnsTransformer] output columns: {:?}",
            out.get_column_names()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::mapping;

    fn sample() -> DataFrame {
        df![
            "nome" => ["Mario", "Luca"],
            "cognome" => ["Rossi", "Bianchi"],
            "telefono" => ["123", "456"]
        ]
        .unwrap()
    }

    #[test]
    fn select_orders_columns() {
        let out = SetOutputColumnsTransformer::select(&["telefono", "nome"])
            .transform(sample())
            .unwrap();
        assert_eq!(out.get_column_names(), &["telefono", "nome"]);
    }

    #[test]
    fn rename_maps_and_orders() {
        let out =
            SetOutputColumnsTransformer::rename(mapping(&[("cognome", "surname"), ("nome", "name")]))
                .transform(sample())
                .unwrap();
        assert_eq!(out.get_column_names(), &["surname", "name"]);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let err = SetOutputColumnsTransformer::select(&["ghost"])
            .transform(sample())
            .unwrap_err();
        assert!(matches!(err, EtlError::Schema(_)));
    }
}
