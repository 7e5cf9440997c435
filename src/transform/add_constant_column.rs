use polars::prelude::*;

use crate::dataset::Value;
use crate::error::Result;
use crate::transform::Transformer;

/// Adds a column holding the same value on every row, replacing any
/// existing column with that name.
pub struct AddConstantColumnTransformer {
    name: String,
    value: Value,
}

impl AddConstantColumnTransformer {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Transformer for AddConstantColumnTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let height = df.height();
        let series = match &self.value {
            Value::Null => Series::full_null(&self.name, height, &DataType::String),
            Value::Bool(b) => Series::new(&self.name, vec![*b; height]),
            Value::Int(i) => Series::new(&self.name, vec![*i; height]),
            Value::Float(f) => Series::new(&self.name, vec![*f; height]),
            Value::Str(s) => Series::new(&self.name, vec![s.clone(); height]),
        };
        let mut out = df;
        out.with_column(series)?;
        Ok(out)
    }
}
