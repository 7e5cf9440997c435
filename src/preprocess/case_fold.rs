use polars::prelude::*;

use crate::error::{EtlError, Result};
use crate::preprocess::Preprocessor;

/// Uppercases the listed columns (or every String column when none given).
pub struct ToUpperPreprocessor {
    columns: Option<Vec<String>>,
}

/// Lowercases the listed columns (or every String column when none given).
pub struct ToLowerPreprocessor {
    columns: Option<Vec<String>>,
}

impl ToUpperPreprocessor {
    pub fn all() -> Self {
        Self { columns: None }
    }

    pub fn on_columns(columns: &[&str]) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
        }
    }
}

impl ToLowerPreprocessor {
    pub fn all() -> Self {
        Self { columns: None }
    }

    pub fn on_columns(columns: &[&str]) -> Self {
        Self {
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
        }
    }
}

fn fold_case(df: DataFrame, columns: &Option<Vec<String>>, upper: bool) -> Result<DataFrame> {
    let targets: Vec<String> = match columns {
        Some(cols) => {
            let names = df.get_column_names();
            for c in cols {
                if !names.contains(&c.as_str()) {
                    return Err(EtlError::Schema(format!("column '{}' not found", c)));
                }
            }
            cols.clone()
        }
        None => df
            .get_columns()
            .iter()
            .filter(|s| s.dtype() == &DataType::String)
            .map(|s| s.name().to_string())
            .collect(),
    };
    if targets.is_empty() {
        return Ok(df);
    }

    let exprs: Vec<Expr> = targets
        .iter()
        .map(|name| {
            let e = col(name).str();
            if upper {
                e.to_uppercase()
            } else {
                e.to_lowercase()
            }
        })
        .collect();
    Ok(df.lazy().with_columns(exprs).collect()?)
}

impl Preprocessor for ToUpperPreprocessor {
    fn process(&self, df: DataFrame) -> Result<DataFrame> {
        fold_case(df, &self.columns, true)
    }
}

impl Preprocessor for ToLowerPreprocessor {
    fn process(&self, df: DataFrame) -> Result<DataFrame> {
        fold_case(df, &self.columns, false)
    }
}
