//! Dataset primitives shared by the pipeline core and the write engine:
//! column mapping, chunking, key coercion, the owned [`Value`] scalar and a
//! borrowed [`RowView`] for per-row callbacks.

use std::collections::HashSet;
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EtlError, Result};

/// Ordered source → destination column mapping. Only sources present in both
/// the mapping and the frame participate; everything else is dropped.
pub type ColumnMapping = Vec<(String, String)>;

/// Build a [`ColumnMapping`] from borrowed pairs.
pub fn mapping(pairs: &[(&str, &str)]) -> ColumnMapping {
    pairs
        .iter()
        .map(|(s, d)| (s.to_string(), d.to_string()))
        .collect()
}

/// Owned, lifetime-free scalar crossing the sink boundary.
///
/// Converted from polars `AnyValue`; anything without a direct counterpart
/// (dates, decimals, nested types) is carried as its display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical string form used for unique-key matching. Mirrors the
    /// string coercion applied to join keys, so `5` and `"5"` collide.
    pub fn key(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    pub fn from_any(av: &AnyValue) -> Value {
        match av {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(b) => Value::Bool(*b),
            AnyValue::String(s) => Value::Str((*s).to_string()),
            AnyValue::StringOwned(s) => Value::Str(s.to_string()),
            AnyValue::Int8(v) => Value::Int(*v as i64),
            AnyValue::Int16(v) => Value::Int(*v as i64),
            AnyValue::Int32(v) => Value::Int(*v as i64),
            AnyValue::Int64(v) => Value::Int(*v),
            AnyValue::UInt8(v) => Value::Int(*v as i64),
            AnyValue::UInt16(v) => Value::Int(*v as i64),
            AnyValue::UInt32(v) => Value::Int(*v as i64),
            AnyValue::UInt64(v) => Value::Int(*v as i64),
            AnyValue::Float32(v) => Value::Float(*v as f64),
            AnyValue::Float64(v) => Value::Float(*v),
            other => Value::Str(format!("{}", other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            other => write!(f, "{}", other.key()),
        }
    }
}

/// Borrowed view over one row, handed to split classifiers and row mappers.
pub struct RowView<'a> {
    df: &'a DataFrame,
    idx: usize,
}

impl<'a> RowView<'a> {
    pub fn new(df: &'a DataFrame, idx: usize) -> Self {
        Self { df, idx }
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.df.get_column_names().contains(&column)
    }

    pub fn get(&self, column: &str) -> Result<Value> {
        let series = self
            .df
            .column(column)
            .map_err(|_| EtlError::Schema(format!("column '{}' not found", column)))?;
        let av = series.get(self.idx)?;
        Ok(Value::from_any(&av))
    }

    /// Canonical string form of the cell; null becomes the empty string.
    pub fn get_str(&self, column: &str) -> Result<String> {
        Ok(self.get(column)?.key())
    }
}

/// Project and rename a frame into the mapping's destination namespace.
///
/// Pure: the input frame is untouched. Output column order follows mapping
/// order; row count is unchanged. An empty mapping passes the frame through
/// as-is. Duplicate destination names are a config error.
pub fn map_columns(df: &DataFrame, mapping: &ColumnMapping) -> Result<DataFrame> {
    if mapping.is_empty() {
        return Ok(df.clone());
    }

    let mut seen = HashSet::new();
    for (_, dst) in mapping {
        if !seen.insert(dst.as_str()) {
            return Err(EtlError::Config(format!(
                "duplicate destination column '{}' in mapping",
                dst
            )));
        }
    }

    let names = df.get_column_names();
    let mut columns = Vec::new();
    for (src, dst) in mapping {
        if !names.contains(&src.as_str()) {
            continue;
        }
        let mut series = df.column(src)?.clone();
        series.rename(dst);
        columns.push(series);
    }

    if columns.is_empty() {
        warn!("map_columns: no mapping source matches the frame, output is empty");
        return Ok(DataFrame::empty());
    }

    Ok(DataFrame::new(columns)?)
}

/// Ordered fixed-size slices of the frame; the last chunk may be short.
pub fn chunks(df: &DataFrame, chunk_size: usize) -> impl Iterator<Item = DataFrame> + '_ {
    let height = df.height();
    (0..height)
        .step_by(chunk_size.max(1))
        .map(move |start| df.slice(start as i64, chunk_size))
}

/// Cast the given columns to String in place. Applied to join keys on both
/// sides before matching, and to key tuples in the write engine, so that
/// typed and string representations of the same key compare equal.
pub fn coerce_keys_to_string(df: &mut DataFrame, columns: &[String]) -> Result<()> {
    for name in columns {
        let series = df
            .column(name)
            .map_err(|_| EtlError::Schema(format!("key column '{}' not found", name)))?;
        if series.dtype() != &DataType::String {
            let cast = series.cast(&DataType::String)?;
            df.with_column(cast)?;
        }
    }
    Ok(())
}

/// Materialize every row of the frame as owned values, column order preserved.
pub fn rows_as_values(df: &DataFrame) -> Result<Vec<Vec<Value>>> {
    let mut columns = Vec::with_capacity(df.width());
    for series in df.get_columns() {
        let values: Vec<Value> = series.iter().map(|av| Value::from_any(&av)).collect();
        columns.push(values);
    }

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(columns.iter().map(|c| c[i].clone()).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df![
            "id" => [1i64, 2, 3],
            "name" => ["anna", "bruno", "carla"],
            "amount" => [10.5f64, 20.0, 30.25]
        ]
        .unwrap()
    }

    #[test]
    fn map_columns_projects_and_renames() {
        let df = sample();
        let m = mapping(&[("id", "company_id"), ("name", "company_name"), ("ghost", "x")]);
        let out = map_columns(&df, &m).unwrap();
        assert_eq!(out.get_column_names(), &["company_id", "company_name"]);
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn map_columns_empty_mapping_is_identity() {
        let df = sample();
        let out = map_columns(&df, &ColumnMapping::new()).unwrap();
        assert_eq!(out.shape(), df.shape());
    }

    #[test]
    fn map_columns_rejects_duplicate_destinations() {
        let df = sample();
        let m = mapping(&[("id", "x"), ("name", "x")]);
        assert!(matches!(map_columns(&df, &m), Err(EtlError::Config(_))));
    }

    #[test]
    fn chunks_cover_frame_in_order() {
        let df = df!["n" => (0i64..7).collect::<Vec<_>>()].unwrap();
        let sizes: Vec<usize> = chunks(&df, 3).map(|c| c.height()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let first = chunks(&df, 3).next().unwrap();
        assert_eq!(
            first.column("n").unwrap().i64().unwrap().get(0),
            Some(0)
        );
    }

    #[test]
    fn value_key_collides_across_types() {
        assert_eq!(Value::Int(5).key(), Value::Str("5".into()).key());
    }

    #[test]
    fn rows_as_values_preserves_order() {
        let rows = rows_as_values(&sample()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], Value::Str("bruno".into()));
        assert_eq!(rows[2][0], Value::Int(3));
    }

    #[test]
    fn coerce_keys_casts_in_place() {
        let mut df = sample();
        coerce_keys_to_string(&mut df, &["id".to_string()]).unwrap();
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::String);
    }
}
