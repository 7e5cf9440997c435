use polars::prelude::*;
use polars::sql::SQLContext;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::transform::Transformer;

/// Filters a frame with an embedded SQL engine; the frame is registered as
/// a single relation (alias `df` by default).
///
/// Accepts either a bare WHERE clause or a full SELECT:
///
/// ```text
/// city = 'Napoli' AND cap = '80100'
/// SELECT cap, provincia FROM df WHERE regione = 'Campania'
/// ```
pub struct CustomSqlFilterTransformer {
    sql: String,
    alias: String,
}

impl CustomSqlFilterTransformer {
    pub fn new(sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into().trim().to_string();
        if sql.is_empty() {
            return Err(EtlError::Config(
                "missing SQL: pass a WHERE clause or a full SELECT query".to_string(),
            ));
        }
        Ok(Self {
            sql,
            alias: "df".to_string(),
        })
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    fn to_select(&self) -> String {
        if self.sql.to_lowercase().starts_with("select") {
            self.sql.clone()
        } else {
            format!("SELECT * FROM {} WHERE {}", self.alias, self.sql)
        }
    }
}

impl Transformer for CustomSqlFilterTransformer {
    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let rows_in = df.height();
        let query = self.to_select();
        debug!("[CustomSqlFilterTransformer] executing: {}", query);

        let mut ctx = SQLContext::new();
        ctx.register(&self.alias, df.lazy());
        let out = ctx
            .execute(&query)
            .map_err(|e| EtlError::Config(format!("SQL filter failed: {}", e)))?
            .collect()?;

        info!(
            "[CustomSqlFilterTransformer] rows in={}, out={}, columns out={}",
            rows_in,
            out.height(),
            out.width()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df![
            "amount" => [50i64, 150, 200],
            "city" => ["Napoli", "Roma", "Napoli"]
        ]
        .unwrap()
    }

    #[test]
    fn where_clause_is_wrapped_into_select() {
        let t = CustomSqlFilterTransformer::new("amount > 100").unwrap();
        assert_eq!(t.to_select(), "SELECT * FROM df WHERE amount > 100");
        let out = t.transform(sample()).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn full_select_passes_through() {
        let t =
            CustomSqlFilterTransformer::new("SELECT city FROM df WHERE amount >= 150").unwrap();
        let out = t.transform(sample()).unwrap();
        assert_eq!(out.get_column_names(), &["city"]);
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn empty_sql_is_config_error() {
        assert!(matches!(
            CustomSqlFilterTransformer::new("   "),
            Err(EtlError::Config(_))
        ));
    }
}
