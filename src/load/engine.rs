//! Generic write-mode engine: maps a frame into the sink namespace, chunks
//! it, and drives one [`SinkConnection`] under the configured mode.

use itertools::Itertools;
use polars::prelude::*;
use tracing::{info, warn};

use crate::dataset::{chunks, map_columns, rows_as_values, Value};
use crate::error::{EtlError, Result};
use crate::load::sink::{SinkConfig, UpsertStrategy, WriteMode};
use crate::load::Loader;

/// Capability contract a sink backend implements once; the engine expresses
/// all three write modes through it. Row values arrive in the same order as
/// the `columns` slice. Semantics are as-if-row-by-row: each input row acts
/// on the sink rows matching its unique-key tuple, but implementations are
/// free to batch.
pub trait SinkConnection {
    /// Append rows. Constraint violations and I/O failures surface as
    /// [`EtlError::SinkWrite`].
    fn insert_rows(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<()>;

    /// For each input row, set every non-key column on the sink rows whose
    /// key tuple matches. Returns how many input rows matched at least one
    /// sink row.
    fn update_rows(
        &mut self,
        table: &str,
        key_columns: &[String],
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<usize>;

    /// Delete every sink row whose key tuple is among `keys`.
    fn delete_by_keys(
        &mut self,
        table: &str,
        key_columns: &[String],
        keys: &[Vec<Value>],
    ) -> Result<()>;

    /// Force the sink's physical deduplication after a native-merge upsert.
    /// Expensive; only called when the strategy asks for it.
    fn finalize(&mut self, _table: &str) -> Result<()> {
        Ok(())
    }
}

/// One engine owns one connection for its lifetime; callers needing
/// concurrency instantiate independent engines with independent
/// connections. Chunks are processed strictly in input-row order, and an
/// I/O error aborts the remaining chunks of the call (already-written
/// chunks stay).
pub struct WriteEngine<C: SinkConnection> {
    connection: C,
    config: SinkConfig,
}

impl<C: SinkConnection> WriteEngine<C> {
    /// Validates the config eagerly; a bad mode/key setup never reaches the
    /// sink.
    pub fn new(connection: C, config: SinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connection, config })
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    fn load_frame(&mut self, df: &DataFrame) -> Result<()> {
        let mapped = map_columns(df, &self.config.columns)?;
        info!(
            "[WriteEngine] mode={:?} table={} rows={} chunk_size={}",
            self.config.mode,
            self.config.table,
            mapped.height(),
            self.config.chunk_size
        );

        if mapped.height() == 0 {
            info!("[WriteEngine] empty frame: nothing to load");
            return Ok(());
        }

        let columns: Vec<String> = mapped
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let key_indices = self.key_indices(&columns)?;

        let mut written = 0usize;
        let mut unmatched = 0usize;
        for chunk in chunks(&mapped, self.config.chunk_size) {
            let rows = rows_as_values(&chunk)?;
            match self.config.mode {
                WriteMode::Insert => {
                    self.connection.insert_rows(&self.config.table, &columns, &rows)?;
                }
                WriteMode::Update => {
                    let matched = self.connection.update_rows(
                        &self.config.table,
                        &self.config.unique_keys,
                        &columns,
                        &rows,
                    )?;
                    // saturate so a backend misreporting matched > rows.len()
                    // skews the log line instead of panicking
                    unmatched += rows.len().saturating_sub(matched);
                }
                WriteMode::Upsert => match self.config.upsert_strategy {
                    UpsertStrategy::NativeMerge { .. } => {
                        self.connection.insert_rows(&self.config.table, &columns, &rows)?;
                    }
                    UpsertStrategy::DeleteInsert => {
                        let keys: Vec<Vec<Value>> = rows
                            .iter()
                            .map(|row| key_indices.iter().map(|&i| row[i].clone()).collect())
                            .collect();
                        self.connection.delete_by_keys(
                            &self.config.table,
                            &self.config.unique_keys,
                            &keys,
                        )?;
                        self.connection.insert_rows(&self.config.table, &columns, &rows)?;
                    }
                },
            }
            written += rows.len();
        }

        if let (WriteMode::Upsert, UpsertStrategy::NativeMerge { finalize: true }) =
            (self.config.mode, self.config.upsert_strategy)
        {
            warn!("[WriteEngine] finalize requested on {} (expensive)", self.config.table);
            self.connection.finalize(&self.config.table)?;
        }

        if unmatched > 0 {
            warn!(
                "[WriteEngine] update: {} input rows matched no sink row on keys [{}]",
                unmatched,
                self.config.unique_keys.iter().join(", ")
            );
        }
        info!("[WriteEngine] wrote {} rows to {}", written, self.config.table);
        Ok(())
    }

    /// Positions of the unique-key columns inside the mapped frame. Only
    /// modes that match on keys need them; insert skips the check so a
    /// keyless append never fails on schema.
    fn key_indices(&self, columns: &[String]) -> Result<Vec<usize>> {
        if self.config.mode == WriteMode::Insert {
            return Ok(Vec::new());
        }
        self.config
            .unique_keys
            .iter()
            .map(|key| {
                columns.iter().position(|c| c == key).ok_or_else(|| {
                    EtlError::Schema(format!(
                        "unique key column '{}' missing from mapped frame",
                        key
                    ))
                })
            })
            .collect()
    }
}

impl<C: SinkConnection> Loader for WriteEngine<C> {
    fn load(&mut self, df: &DataFrame) -> Result<()> {
        self.load_frame(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::mapping;
    use crate::load::MemorySink;

    fn insert_config(chunk_size: usize) -> SinkConfig {
        SinkConfig::new("t", mapping(&[("a", "a"), ("b", "b")]), WriteMode::Insert)
            .with_chunk_size(chunk_size)
    }

    #[test]
    fn insert_appends_all_rows() {
        let df = df!["a" => [1i64, 2, 3], "b" => ["x", "y", "z"]].unwrap();
        let mut engine = WriteEngine::new(MemorySink::new(), insert_config(2)).unwrap();
        engine.load(&df).unwrap();
        assert_eq!(engine.connection().row_count("t"), 3);
        // additivity
        engine.load(&df).unwrap();
        assert_eq!(engine.connection().row_count("t"), 6);
    }

    #[test]
    fn chunking_splits_in_input_order() {
        let n = 12_345i64;
        let df = df!["a" => (0..n).collect::<Vec<_>>(), "b" => vec!["v"; n as usize]].unwrap();
        let sizes: Vec<usize> = chunks(&df, 5_000).map(|c| c.height()).collect();
        assert_eq!(sizes, vec![5_000, 5_000, 2_345]);

        let mut engine = WriteEngine::new(MemorySink::new(), insert_config(5_000)).unwrap();
        engine.load(&df).unwrap();
        assert_eq!(engine.connection().row_count("t"), 12_345);
        // first and last row preserved in order
        let rows = engine.connection().rows("t").unwrap();
        assert_eq!(rows[0].get("a"), Some(&Value::Int(0)));
        assert_eq!(rows[12_344].get("a"), Some(&Value::Int(12_344)));
    }

    #[test]
    fn empty_frame_is_a_noop() {
        let df = df!["a" => Vec::<i64>::new(), "b" => Vec::<String>::new()].unwrap();
        let mut engine = WriteEngine::new(MemorySink::new(), insert_config(100)).unwrap();
        engine.load(&df).unwrap();
        assert_eq!(engine.connection().row_count("t"), 0);
    }

    #[test]
    fn update_overwrites_matching_keys_only() {
        let mut sink = MemorySink::new();
        sink.insert_rows(
            "t",
            &["code".to_string(), "val".to_string()],
            &[
                vec![Value::Int(1), Value::Str("old".into())],
                vec![Value::Int(2), Value::Str("keep".into())],
            ],
        )
        .unwrap();

        let cfg = SinkConfig::new("t", mapping(&[("code", "code"), ("val", "val")]), WriteMode::Update)
            .with_unique_keys(&["code"]);
        let df = df!["code" => [1i64, 9], "val" => ["new", "ghost"]].unwrap();
        let mut engine = WriteEngine::new(sink, cfg).unwrap();
        engine.load(&df).unwrap();

        let rows = engine.connection().rows("t").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("val"), Some(&Value::Str("new".into())));
        assert_eq!(rows[1].get("val"), Some(&Value::Str("keep".into())));
    }

    #[test]
    fn delete_insert_upsert_is_idempotent_and_last_wins() {
        let cfg = SinkConfig::new("t", mapping(&[("code", "code"), ("val", "val")]), WriteMode::Upsert)
            .with_unique_keys(&["code"])
            .with_upsert_strategy(UpsertStrategy::DeleteInsert);
        let mut engine = WriteEngine::new(MemorySink::new(), cfg).unwrap();

        let df_a = df!["code" => [1i64], "val" => ["a"]].unwrap();
        engine.load(&df_a).unwrap();
        let df_b = df!["code" => [1i64], "val" => ["b"]].unwrap();
        engine.load(&df_b).unwrap();
        engine.load(&df_b).unwrap();

        let rows = engine.connection().rows("t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("val"), Some(&Value::Str("b".into())));
    }

    #[test]
    fn native_merge_with_finalize_deduplicates() {
        let cfg = SinkConfig::new("t", mapping(&[("code", "code"), ("val", "val")]), WriteMode::Upsert)
            .with_unique_keys(&["code"])
            .with_upsert_strategy(UpsertStrategy::NativeMerge { finalize: true });
        let mut sink = MemorySink::new();
        sink.set_merge_keys("t", &["code"]);
        let mut engine = WriteEngine::new(sink, cfg).unwrap();

        let df_a = df!["code" => [1i64], "val" => ["a"]].unwrap();
        engine.load(&df_a).unwrap();
        let df_b = df!["code" => [1i64], "val" => ["b"]].unwrap();
        engine.load(&df_b).unwrap();

        let rows = engine.connection().rows("t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("val"), Some(&Value::Str("b".into())));
    }

    struct OverreportingSink(MemorySink);

    impl SinkConnection for OverreportingSink {
        fn insert_rows(
            &mut self,
            table: &str,
            columns: &[String],
            rows: &[Vec<Value>],
        ) -> Result<()> {
            self.0.insert_rows(table, columns, rows)
        }
        fn update_rows(
            &mut self,
            table: &str,
            key_columns: &[String],
            columns: &[String],
            rows: &[Vec<Value>],
        ) -> Result<usize> {
            self.0.update_rows(table, key_columns, columns, rows)?;
            Ok(rows.len() + 1)
        }
        fn delete_by_keys(
            &mut self,
            table: &str,
            key_columns: &[String],
            keys: &[Vec<Value>],
        ) -> Result<()> {
            self.0.delete_by_keys(table, key_columns, keys)
        }
    }

    #[test]
    fn update_tolerates_backends_overreporting_matches() {
        let cfg = SinkConfig::new("t", mapping(&[("code", "code"), ("val", "val")]), WriteMode::Update)
            .with_unique_keys(&["code"]);
        let df = df!["code" => [1i64], "val" => ["x"]].unwrap();
        let mut engine = WriteEngine::new(OverreportingSink(MemorySink::new()), cfg).unwrap();
        engine.load(&df).unwrap();
    }

    #[test]
    fn missing_key_column_is_schema_error() {
        let cfg = SinkConfig::new("t", mapping(&[("val", "val")]), WriteMode::Update)
            .with_unique_keys(&["code"]);
        let df = df!["val" => ["x"]].unwrap();
        let mut engine = WriteEngine::new(MemorySink::new(), cfg).unwrap();
        assert!(matches!(engine.load(&df), Err(EtlError::Schema(_))));
    }
}
