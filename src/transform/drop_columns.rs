use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::transform::Transformer;

/// Drops the listed columns; names absent from the frame are ignored.
pub struct DropColumnsTransformer {
    columns: Vec<String>,
}

impl DropColumnsTransformer {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Transformer for DropColumnsTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let mut out = df;
        for name in &self.columns {
            if out.get_column_names().contains(&name.as_str()) {
                out = out.drop(name)?;
            }
        }
        info!(
            "[DropColumnsTransformer] remaining columns: {:?}",
            out.get_column_names()
        );
        Ok(out)
    }
}
