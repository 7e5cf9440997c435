use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::preprocess::Preprocessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadDirection {
    Left,
    Right,
}

/// Pads a column's values with a fill character up to a total length, e.g.
/// restoring leading zeros on numeric codes. Values already at or beyond the
/// target length pass through unchanged; nulls stay null. The column is cast
/// to String first.
pub struct PadColumnPreprocessor {
    column: String,
    total_length: usize,
    pad_char: char,
    direction: PadDirection,
}

impl PadColumnPreprocessor {
    pub fn new(column: impl Into<String>, total_length: usize) -> Self {
        Self {
            column: column.into(),
            total_length,
            pad_char: '0',
            direction: PadDirection::Left,
        }
    }

    pub fn with_pad_char(mut self, pad_char: char) -> Self {
        self.pad_char = pad_char;
        self
    }

    pub fn with_direction(mut self, direction: PadDirection) -> Self {
        self.direction = direction;
        self
    }

    fn pad(&self, value: &str) -> String {
        let len = value.chars().count();
        if len >= self.total_length {
            return value.to_string();
        }
        let fill: String = std::iter::repeat(self.pad_char)
            .take(self.total_length - len)
            .collect();
        match self.direction {
            PadDirection::Left => format!("{}{}", fill, value),
            PadDirection::Right => format!("{}{}", value, fill),
        }
    }
}

impl Preprocessor for PadColumnPreprocessor {
    fn process(&self, df: DataFrame) -> Result<DataFrame> {
        let series = df.column(&self.column).map_err(|_| {
            EtlError::Schema(format!("column '{}' not found for padding", self.column))
        })?;
        info!(
            "[PadColumnPreprocessor] '{}': len={} char='{}' dir={:?}",
            self.column, self.total_length, self.pad_char, self.direction
        );

        let ca = series.cast(&DataType::String)?;
        let padded: Vec<Option<String>> = ca
            .str()?
            .into_iter()
            .map(|v| v.map(|s| self.pad(s)))
            .collect();

        let mut out = df;
        out.with_column(Series::new(&self.column, padded))?;
        Ok(out)
    }
}
