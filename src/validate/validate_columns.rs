use std::fs;
use std::path::PathBuf;

use polars::prelude::*;
use tracing::{info, warn};

use crate::dataset::Value;
use crate::error::{EtlError, Result};
use crate::transform::Transformer;
use crate::validate::Validator;

/// Validation stage: applies per-column validator lists, keeps the valid
/// rows and drops the rest. Rejected rows can be dumped to a CSV with an
/// `error` column listing every failed rule.
///
/// A rule on a column missing from the frame rejects every row for that
/// rule (the value is treated as null), matching the lenient contract of
/// the other stages rather than failing the whole frame.
pub struct ValidateColumnsTransformer {
    rules: Vec<(String, Vec<Box<dyn Validator>>)>,
    reject_output_path: Option<PathBuf>,
}

impl ValidateColumnsTransformer {
    pub fn new(rules: Vec<(String, Vec<Box<dyn Validator>>)>) -> Self {
        Self {
            rules,
            reject_output_path: None,
        }
    }

    pub fn with_reject_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.reject_output_path = Some(path.into());
        self
    }
}

impl Transformer for ValidateColumnsTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        info!("[ValidateColumnsTransformer] validating {} rows", df.height());

        let height = df.height();
        let mut valid = vec![true; height];
        let mut errors: Vec<Vec<String>> = vec![Vec::new(); height];

        for (column, validators) in &self.rules {
            let values: Vec<Value> = match df.column(column) {
                Ok(series) => series.iter().map(|av| Value::from_any(&av)).collect(),
                Err(_) => {
                    warn!(
                        "[ValidateColumnsTransformer] column '{}' missing, treating as null",
                        column
                    );
                    vec![Value::Null; height]
                }
            };
            for validator in validators {
                for (i, value) in values.iter().enumerate() {
                    if !validator.validate(value) {
                        valid[i] = false;
                        errors[i].push(format!("{}: {}", column, validator.error_message()));
                    }
                }
            }
        }

        let mask = BooleanChunked::from_slice("valid", &valid);
        let df_valid = df.filter(&mask)?;
        let inverted = !&mask;
        let df_rejected = df.filter(&inverted)?;

        if let (Some(path), true) = (&self.reject_output_path, df_rejected.height() > 0) {
            let reasons: Vec<String> = errors
                .iter()
                .zip(valid.iter())
                .filter(|(_, ok)| !**ok)
                .map(|(e, _)| e.join(" | "))
                .collect();
            let mut rejected = df_rejected.clone();
            rejected.with_column(Series::new("error", reasons))?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(path)?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut rejected)
                .map_err(|e| EtlError::SinkWrite(format!("failed to write rejects: {}", e)))?;
            warn!(
                "[ValidateColumnsTransformer] wrote {} rejected rows to {}",
                rejected.height(),
                path.display()
            );
        }

        info!(
            "[ValidateColumnsTransformer] valid: {} / rejected: {}",
            df_valid.height(),
            df_rejected.height()
        );
        Ok(df_valid)
    }
}
