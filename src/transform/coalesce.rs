use polars::prelude::*;
use tracing::info;

use crate::dataset::Value;
use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// A coalesce candidate: an existing column or a fixed literal.
pub enum CoalesceInput {
    Column(String),
    Fixed(Value),
}

impl CoalesceInput {
    pub fn column(name: impl Into<String>) -> Self {
        CoalesceInput::Column(name.into())
    }

    pub fn fixed(value: Value) -> Self {
        CoalesceInput::Fixed(value)
    }
}

/// SQL-style COALESCE: the output column takes the first non-null candidate
/// per row. With `treat_empty_as_null` (default), empty strings in String
/// columns count as null.
pub struct CoalesceTransformer {
    output_column: String,
    inputs: Vec<CoalesceInput>,
    treat_empty_as_null: bool,
}

impl CoalesceTransformer {
    pub fn new(output_column: impl Into<String>, inputs: Vec<CoalesceInput>) -> Result<Self> {
        if inputs.is_empty() {
            return Err(EtlError::Config(
                "coalesce needs at least one input".to_string(),
            ));
        }
        Ok(Self {
            output_column: output_column.into(),
            inputs,
            treat_empty_as_null: true,
        })
    }

    pub fn treat_empty_as_null(mut self, enabled: bool) -> Self {
        self.treat_empty_as_null = enabled;
        self
    }

    fn candidate_expr(&self, input: &CoalesceInput, df: &DataFrame) -> Result<Expr> {
        match input {
            CoalesceInput::Column(name) => {
                let series = df.column(name).map_err(|_| {
                    EtlError::Schema(format!("coalesce column '{}' not found", name))
                })?;
                let base = col(name);
                if self.treat_empty_as_null && series.dtype() == &DataType::String {
                    Ok(when(base.clone().eq(lit("")))
                        .then(lit(NULL))
                        .otherwise(base))
                } else {
                    Ok(base)
                }
            }
            CoalesceInput::Fixed(value) => Ok(match value {
                Value::Null => lit(NULL),
                Value::Bool(b) => lit(*b),
                Value::Int(i) => lit(*i),
                Value::Float(f) => lit(*f),
                Value::Str(s) => lit(s.clone()),
            }),
        }
    }
}

impl Transformer for CoalesceTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let first = self
            .inputs
            .first()
            .ok_or_else(|| EtlError::Config("coalesce needs at least one input".to_string()))?;
        let mut expr = self.candidate_expr(first, &df)?;
        for input in &self.inputs[1..] {
            expr = expr.fill_null(self.candidate_expr(input, &df)?);
        }

        info!(
            "[CoalesceTransformer] building column '{}'",
            self.output_column
        );
        Ok(df
            .lazy()
            .with_column(expr.alias(&self.output_column))
            .collect()?)
    }
}
