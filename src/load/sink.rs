use serde::{Deserialize, Serialize};

use crate::dataset::ColumnMapping;
use crate::error::{EtlError, Result};

/// How incoming rows reconcile with existing sink state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Append every row; no look at existing state.
    Insert,
    /// Overwrite non-key columns of sink rows matching on the unique keys.
    /// Input rows matching nothing are counted and logged, not errors.
    Update,
    /// Insert-or-update keyed on the unique keys, per [`UpsertStrategy`].
    Upsert,
}

/// How upsert is realized against sinks with different native capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// Insert-only write; the sink's own merge/deduplication converges to
    /// last-insert-wins per key. `finalize` requests the sink's expensive
    /// physical deduplication right after the load.
    NativeMerge { finalize: bool },
    /// Delete matching key tuples, then insert, chunk by chunk. Guarantees
    /// one row per key immediately, at the cost of a crash window between
    /// the delete and the insert of a chunk.
    DeleteInsert,
}

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Target-table configuration for the write engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Target identifier, e.g. a table name.
    pub table: String,
    /// Destination columns identifying a logical sink row (update/upsert).
    #[serde(default)]
    pub unique_keys: Vec<String>,
    /// Dataset → sink column mapping; empty means pass-through.
    #[serde(default)]
    pub columns: ColumnMapping,
    pub mode: WriteMode,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_upsert_strategy")]
    pub upsert_strategy: UpsertStrategy,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_upsert_strategy() -> UpsertStrategy {
    UpsertStrategy::NativeMerge { finalize: false }
}

impl SinkConfig {
    pub fn new(table: impl Into<String>, columns: ColumnMapping, mode: WriteMode) -> Self {
        Self {
            table: table.into(),
            unique_keys: Vec::new(),
            columns,
            mode,
            chunk_size: DEFAULT_CHUNK_SIZE,
            upsert_strategy: UpsertStrategy::NativeMerge { finalize: false },
        }
    }

    pub fn with_unique_keys(mut self, keys: &[&str]) -> Self {
        self.unique_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_upsert_strategy(mut self, strategy: UpsertStrategy) -> Self {
        self.upsert_strategy = strategy;
        self
    }

    /// Parse a config from its JSON form, as carried in flow definition
    /// files. Validated before being returned.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: SinkConfig = serde_json::from_str(json)
            .map_err(|e| EtlError::Config(format!("invalid sink config: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fail-fast invariants, checked when an engine is built around this
    /// config, before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(EtlError::Config("sink table name is empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(EtlError::Config("chunk_size must be positive".to_string()));
        }
        if matches!(self.mode, WriteMode::Update | WriteMode::Upsert) && self.unique_keys.is_empty()
        {
            return Err(EtlError::Config(format!(
                "mode {:?} requires non-empty unique_keys",
                self.mode
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnMapping;

    #[test]
    fn update_without_keys_is_rejected() {
        let cfg = SinkConfig::new("t", ColumnMapping::new(), WriteMode::Update);
        assert!(matches!(cfg.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn insert_without_keys_is_fine() {
        let cfg = SinkConfig::new("t", ColumnMapping::new(), WriteMode::Insert);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let cfg =
            SinkConfig::new("t", ColumnMapping::new(), WriteMode::Insert).with_chunk_size(0);
        assert!(matches!(cfg.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn from_json_fills_defaults() {
        let cfg = SinkConfig::from_json(
            r#"{"table": "companies", "mode": "upsert", "unique_keys": ["code"],
                "upsert_strategy": "delete_insert"}"#,
        )
        .unwrap();
        assert_eq!(cfg.table, "companies");
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.upsert_strategy, UpsertStrategy::DeleteInsert);
    }

    #[test]
    fn from_json_rejects_invalid_combinations() {
        let err = SinkConfig::from_json(r#"{"table": "t", "mode": "update"}"#).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
