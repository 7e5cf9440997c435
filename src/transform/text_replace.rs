use polars::prelude::*;
use regex::Regex;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// Replaces text in the given columns, either literally or via a regular
/// expression. Non-string columns are cast to String first.
pub struct TextReplaceTransformer {
    columns: Vec<String>,
    pattern: String,
    replacement: String,
    use_regex: bool,
}

impl TextReplaceTransformer {
    pub fn literal(columns: &[&str], pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            pattern: pattern.into(),
            replacement: replacement.into(),
            use_regex: false,
        }
    }

    pub fn regex(columns: &[&str], pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            pattern: pattern.into(),
            replacement: replacement.into(),
            use_regex: true,
        }
    }
}

impl Transformer for TextReplaceTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let re = if self.use_regex {
            Some(Regex::new(&self.pattern).map_err(|e| {
                EtlError::Config(format!("invalid replace pattern '{}': {}", self.pattern, e))
            })?)
        } else {
            None
        };

        let mut out = df;
        for name in &self.columns {
            let series = out.column(name).map_err(|_| {
                EtlError::Schema(format!("column '{}' not found for text replace", name))
            })?;
            let ca = series.cast(&DataType::String)?;
            let replaced: Vec<Option<String>> = ca
                .str()?
                .into_iter()
                .map(|v| {
                    v.map(|s| match &re {
                        Some(re) => re.replace_all(s, self.replacement.as_str()).into_owned(),
                        None => s.replace(&self.pattern, &self.replacement),
                    })
                })
                .collect();
            out.with_column(Series::new(name, replaced))?;
        }

        info!(
            "[TextReplaceTransformer] replaced '{}' in {:?}",
            self.pattern, self.columns
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_replacement() {
        let df = df!["tel" => ["+39 333", "+39 444"]].unwrap();
        let out = TextReplaceTransformer::literal(&["tel"], "+39 ", "")
            .transform(df)
            .unwrap();
        let vals: Vec<Option<&str>> = out.column("tel").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(vals, vec![Some("333"), Some("444")]);
    }

    #[test]
    fn regex_replacement() {
        let df = df!["s" => ["a1b2", "c3"]].unwrap();
        let out = TextReplaceTransformer::regex(&["s"], r"\d", "#")
            .transform(df)
            .unwrap();
        let vals: Vec<Option<&str>> = out.column("s").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(vals, vec![Some("a#b#"), Some("c#")]);
    }

    #[test]
    fn invalid_regex_is_config_error() {
        let df = df!["s" => ["x"]].unwrap();
        let err = TextReplaceTransformer::regex(&["s"], "(", "")
            .transform(df)
            .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
