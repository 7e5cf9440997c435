//! In-memory reference sink. Documents the keyed semantics every real
//! backend must honor, backs the engine tests, and is good enough as a
//! staging target for small flows.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::dataset::Value;
use crate::error::{EtlError, Result};
use crate::load::engine::SinkConnection;
use crate::load::parent_child::KeyedSink;

/// One stored row: destination column name → value. A surrogate `id` is
/// assigned on insert unless the incoming row already carries one.
pub type MemRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default)]
struct MemTable {
    next_id: i64,
    rows: Vec<MemRow>,
    /// Engine-level dedup keys emulating a merge-capable backend; used by
    /// `finalize` only.
    merge_keys: Vec<String>,
}

impl MemTable {
    fn assign_id(&mut self, row: &mut MemRow) {
        if !row.contains_key("id") {
            self.next_id += 1;
            row.insert("id".to_string(), Value::Int(self.next_id));
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<String, MemTable>,
    snapshot: Option<HashMap<String, MemTable>>,
}

fn key_tuple(row: &MemRow, key_columns: &[String]) -> Vec<String> {
    key_columns
        .iter()
        .map(|k| row.get(k).map(Value::key).unwrap_or_default())
        .collect()
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the table's engine-level dedup keys (the analog of a
    /// merge-tree sort key). `finalize` keeps the last row per key.
    pub fn set_merge_keys(&mut self, table: &str, keys: &[&str]) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .merge_keys = keys.iter().map(|k| k.to_string()).collect();
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn rows(&self, table: &str) -> Option<&Vec<MemRow>> {
        self.tables.get(table).map(|t| &t.rows)
    }

    fn table_mut(&mut self, table: &str) -> &mut MemTable {
        self.tables.entry(table.to_string()).or_default()
    }
}

impl SinkConnection for MemorySink {
    fn insert_rows(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<()> {
        let t = self.table_mut(table);
        for values in rows {
            if values.len() != columns.len() {
                return Err(EtlError::SinkWrite(format!(
                    "row width {} does not match {} columns",
                    values.len(),
                    columns.len()
                )));
            }
            let mut row: MemRow = columns.iter().cloned().zip(values.iter().cloned()).collect();
            t.assign_id(&mut row);
            t.rows.push(row);
        }
        debug!("[MemorySink] {}: inserted {} rows", table, rows.len());
        Ok(())
    }

    fn update_rows(
        &mut self,
        table: &str,
        key_columns: &[String],
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<usize> {
        let t = self.table_mut(table);
        let mut matched = 0usize;
        for values in rows {
            let incoming: MemRow = columns.iter().cloned().zip(values.iter().cloned()).collect();
            let key = key_tuple(&incoming, key_columns);
            let mut hit = false;
            for stored in &mut t.rows {
                if key_tuple(stored, key_columns) == key {
                    for (name, value) in &incoming {
                        if !key_columns.contains(name) {
                            stored.insert(name.clone(), value.clone());
                        }
                    }
                    hit = true;
                }
            }
            if hit {
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn delete_by_keys(
        &mut self,
        table: &str,
        key_columns: &[String],
        keys: &[Vec<Value>],
    ) -> Result<()> {
        let t = self.table_mut(table);
        let doomed: HashSet<Vec<String>> = keys
            .iter()
            .map(|tuple| tuple.iter().map(Value::key).collect())
            .collect();
        t.rows
            .retain(|row| !doomed.contains(&key_tuple(row, key_columns)));
        Ok(())
    }

    fn finalize(&mut self, table: &str) -> Result<()> {
        let t = self.table_mut(table);
        if t.merge_keys.is_empty() {
            return Err(EtlError::Config(format!(
                "finalize on '{}' without merge keys configured",
                table
            )));
        }
        let merge_keys = t.merge_keys.clone();
        let mut last_per_key: HashMap<Vec<String>, usize> = HashMap::new();
        for (i, row) in t.rows.iter().enumerate() {
            last_per_key.insert(key_tuple(row, &merge_keys), i);
        }
        let keep: HashSet<usize> = last_per_key.into_values().collect();
        let mut i = 0usize;
        t.rows.retain(|_| {
            let kept = keep.contains(&i);
            i += 1;
            kept
        });
        Ok(())
    }
}

impl KeyedSink for MemorySink {
    fn begin(&mut self) -> Result<()> {
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        match self.snapshot.take() {
            Some(tables) => {
                self.tables = tables;
                Ok(())
            }
            None => Err(EtlError::SinkWrite(
                "rollback without an open transaction".to_string(),
            )),
        }
    }

    fn upsert_returning(
        &mut self,
        table: &str,
        unique_keys: &[String],
        row: &[(String, Value)],
    ) -> Result<Vec<(String, Value)>> {
        let incoming: MemRow = row.iter().cloned().collect();
        let key = key_tuple(&incoming, unique_keys);
        let t = self.table_mut(table);

        let position = t
            .rows
            .iter()
            .position(|stored| key_tuple(stored, unique_keys) == key);
        let idx = match position {
            Some(i) => {
                for (name, value) in &incoming {
                    if !unique_keys.contains(name) {
                        t.rows[i].insert(name.clone(), value.clone());
                    }
                }
                i
            }
            None => {
                let mut fresh = incoming;
                t.assign_id(&mut fresh);
                t.rows.push(fresh);
                t.rows.len() - 1
            }
        };
        let resolved = &t.rows[idx];

        let mut identity: Vec<(String, Value)> = unique_keys
            .iter()
            .map(|k| {
                (
                    k.clone(),
                    resolved.get(k).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        if !unique_keys.iter().any(|k| k == "id") {
            if let Some(id) = resolved.get("id") {
                identity.push(("id".to_string(), id.clone()));
            }
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_assigns_surrogate_ids() {
        let mut sink = MemorySink::new();
        sink.insert_rows(
            "t",
            &["code".to_string()],
            &[vec![Value::Str("a".into())], vec![Value::Str("b".into())]],
        )
        .unwrap();
        let rows = sink.rows("t").unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn update_matches_keys_across_types() {
        let mut sink = MemorySink::new();
        sink.insert_rows(
            "t",
            &["code".to_string(), "v".to_string()],
            &[vec![Value::Str("5".into()), Value::Str("old".into())]],
        )
        .unwrap();
        let matched = sink
            .update_rows(
                "t",
                &["code".to_string()],
                &["code".to_string(), "v".to_string()],
                &[vec![Value::Int(5), Value::Str("new".into())]],
            )
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(
            sink.rows("t").unwrap()[0].get("v"),
            Some(&Value::Str("new".into()))
        );
    }

    #[test]
    fn upsert_returning_inserts_then_updates() {
        let mut sink = MemorySink::new();
        let keys = vec!["code".to_string()];
        let id1 = sink
            .upsert_returning("t", &keys, &[("code".to_string(), Value::Int(7))])
            .unwrap();
        let id2 = sink
            .upsert_returning(
                "t",
                &keys,
                &[
                    ("code".to_string(), Value::Int(7)),
                    ("name".to_string(), Value::Str("acme".into())),
                ],
            )
            .unwrap();
        assert_eq!(sink.row_count("t"), 1);
        assert_eq!(id1, id2);
        assert_eq!(
            sink.rows("t").unwrap()[0].get("name"),
            Some(&Value::Str("acme".into()))
        );
    }

    #[test]
    fn rollback_restores_snapshot() {
        let mut sink = MemorySink::new();
        sink.insert_rows("t", &["a".to_string()], &[vec![Value::Int(1)]])
            .unwrap();
        sink.begin().unwrap();
        sink.insert_rows("t", &["a".to_string()], &[vec![Value::Int(2)]])
            .unwrap();
        sink.rollback().unwrap();
        assert_eq!(sink.row_count("t"), 1);
    }
}
