use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::transform::Transformer;

/// Removes duplicate rows, keeping the first occurrence and preserving row
/// order. With a subset, uniqueness is judged on those columns only.
pub struct DistinctTransformer {
    subset: Option<Vec<String>>,
}

impl DistinctTransformer {
    pub fn new() -> Self {
        Self { subset: None }
    }

    pub fn on_columns(columns: &[&str]) -> Self {
        Self {
            subset: Some(columns.iter().map(|c| c.to_string()).collect()),
        }
    }
}

impl Default for DistinctTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for DistinctTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let before = df.height();
        let out = df
            .lazy()
            .unique_stable(self.subset.clone(), UniqueKeepStrategy::First)
            .collect()?;
        info!(
            "[DistinctTransformer] removed {} duplicate rows",
            before - out.height()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let df = df![
            "code" => ["a", "b", "a", "c"],
            "v" => [1i64, 2, 3, 4]
        ]
        .unwrap();
        let out = DistinctTransformer::on_columns(&["code"]).transform(df).unwrap();
        assert_eq!(out.height(), 3);
        let vs: Vec<Option<i64>> = out.column("v").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(vs, vec![Some(1), Some(2), Some(4)]);
    }
}
