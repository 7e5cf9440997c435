use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// What to do with values that do not parse under the input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateErrorMode {
    /// Fail the transform on the first bad value.
    Raise,
    /// Replace bad values with null.
    Coerce,
}

/// Rewrites date columns from one strftime format to another, e.g. Oracle
/// style `%d-%b-%y` into ISO `%Y-%m-%d`. Columns missing from the frame are
/// skipped with a warning.
pub struct ConvertDateFormatTransformer {
    columns: Vec<String>,
    input_format: String,
    output_format: String,
    errors: DateErrorMode,
}

impl ConvertDateFormatTransformer {
    pub fn new(
        columns: &[&str],
        input_format: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            input_format: input_format.into(),
            output_format: output_format.into(),
            errors: DateErrorMode::Raise,
        }
    }

    pub fn with_error_mode(mut self, errors: DateErrorMode) -> Self {
        self.errors = errors;
        self
    }

    fn convert_value(&self, value: &str) -> Result<Option<String>> {
        if value.is_empty() {
            return Ok(None);
        }
        match NaiveDate::parse_from_str(value, &self.input_format) {
            Ok(date) => Ok(Some(date.format(&self.output_format).to_string())),
            Err(e) => match self.errors {
                DateErrorMode::Coerce => Ok(None),
                DateErrorMode::Raise => Err(EtlError::Consistency(format!(
                    "value '{}' does not match date format '{}': {}",
                    value, self.input_format, e
                ))),
            },
        }
    }
}

impl Transformer for ConvertDateFormatTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let mut out = df;
        for name in &self.columns {
            if !out.get_column_names().contains(&name.as_str()) {
                warn!("[ConvertDateFormatTransformer] column '{}' not found", name);
                continue;
            }
            info!(
                "[ConvertDateFormatTransformer] '{}': '{}' -> '{}'",
                name, self.input_format, self.output_format
            );

            let ca = out.column(name)?.cast(&DataType::String)?;
            let mut converted: Vec<Option<String>> = Vec::with_capacity(ca.len());
            for value in ca.str()?.into_iter() {
                match value {
                    Some(v) => converted.push(self.convert_value(v)?),
                    None => converted.push(None),
                }
            }
            out.with_column(Series::new(name, converted))?;
        }
        Ok(out)
    }
}
