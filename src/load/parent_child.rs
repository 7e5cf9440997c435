//! Two-table reconciliation: upsert each row into a parent table, then
//! upsert a derived child row whose foreign-key column carries the parent's
//! resolved identity.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{chunks, ColumnMapping, RowView, Value};
use crate::error::{EtlError, Result};
use crate::load::Loader;

/// Target table addressed by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub table: String,
    /// Destination columns identifying a logical row; drives the upsert
    /// conflict target.
    pub unique_keys: Vec<String>,
    /// Dataset → destination column mapping.
    pub columns: ColumnMapping,
}

impl TableSpec {
    pub fn new(table: impl Into<String>, unique_keys: &[&str], columns: ColumnMapping) -> Self {
        Self {
            table: table.into(),
            unique_keys: unique_keys.iter().map(|k| k.to_string()).collect(),
            columns,
        }
    }
}

/// Child column ← parent column link, fixed for the reconciler's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyLink {
    /// Child destination column that stores the link value.
    pub child_column: String,
    /// Parent destination column whose resolved value becomes the link.
    pub parent_column: String,
}

impl ForeignKeyLink {
    pub fn new(child_column: impl Into<String>, parent_column: impl Into<String>) -> Self {
        Self {
            child_column: child_column.into(),
            parent_column: parent_column.into(),
        }
    }
}

/// Transactional keyed-upsert contract. An upsert resolves the row's
/// identity: every unique-key value plus the surrogate `id` when the table
/// has one distinct from the keys.
pub trait KeyedSink {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn upsert_returning(
        &mut self,
        table: &str,
        unique_keys: &[String],
        row: &[(String, Value)],
    ) -> Result<Vec<(String, Value)>>;
}

/// Row-by-row parent/child upserter. Rows are processed in batches of
/// `batch_size`; every parent+child upsert inside one batch shares one
/// transaction, so a failure rolls the whole batch back and surfaces the
/// sink error with no partial commit.
#[derive(Debug)]
pub struct ParentChildUpsertLoader<C: KeyedSink> {
    connection: C,
    parent: TableSpec,
    child: TableSpec,
    link: ForeignKeyLink,
    batch_size: usize,
}

pub const DEFAULT_BATCH_SIZE: usize = 1_000;

impl<C: KeyedSink> ParentChildUpsertLoader<C> {
    /// Fail-fast checks: both tables need unique keys, and the link's
    /// parent column must be something the parent upsert can resolve (one
    /// of its unique keys or the surrogate `id`) — rejected here, before
    /// any row is written.
    pub fn new(
        connection: C,
        parent: TableSpec,
        child: TableSpec,
        link: ForeignKeyLink,
    ) -> Result<Self> {
        if parent.unique_keys.is_empty() || child.unique_keys.is_empty() {
            return Err(EtlError::Config(
                "parent and child tables both need unique_keys".to_string(),
            ));
        }
        if link.parent_column != "id" && !parent.unique_keys.contains(&link.parent_column) {
            return Err(EtlError::Config(format!(
                "foreign key source '{}' is not resolvable: parent upsert returns {:?} plus 'id'",
                link.parent_column, parent.unique_keys
            )));
        }
        Ok(Self {
            connection,
            parent,
            child,
            link,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(EtlError::Config("batch_size must be positive".to_string()));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    fn map_row(row: &RowView, mapping: &ColumnMapping) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::with_capacity(mapping.len());
        for (src, dst) in mapping {
            if row.has_column(src) {
                out.push((dst.clone(), row.get(src)?));
            }
        }
        Ok(out)
    }

    fn process_batch(&mut self, batch: &DataFrame) -> Result<()> {
        for idx in 0..batch.height() {
            let row = RowView::new(batch, idx);

            let parent_row = Self::map_row(&row, &self.parent.columns)?;
            let identity = self.connection.upsert_returning(
                &self.parent.table,
                &self.parent.unique_keys,
                &parent_row,
            )?;

            let fk_value = identity
                .iter()
                .find(|(name, _)| name == &self.link.parent_column)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| {
                    EtlError::Config(format!(
                        "parent upsert on '{}' did not return column '{}'",
                        self.parent.table, self.link.parent_column
                    ))
                })?;

            let mut child_row = Self::map_row(&row, &self.child.columns)?;
            child_row.retain(|(name, _)| name != &self.link.child_column);
            child_row.push((self.link.child_column.clone(), fk_value));

            self.connection.upsert_returning(
                &self.child.table,
                &self.child.unique_keys,
                &child_row,
            )?;
        }
        Ok(())
    }
}

impl<C: KeyedSink> Loader for ParentChildUpsertLoader<C> {
    fn load(&mut self, df: &DataFrame) -> Result<()> {
        info!(
            "[ParentChildUpsertLoader] {} rows → {} / {}",
            df.height(),
            self.parent.table,
            self.child.table
        );
        for batch in chunks(df, self.batch_size) {
            self.connection.begin()?;
            match self.process_batch(&batch) {
                Ok(()) => self.connection.commit()?,
                Err(e) => {
                    self.connection.rollback()?;
                    return Err(e);
                }
            }
        }
        info!("[ParentChildUpsertLoader] done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::mapping;
    use crate::load::MemorySink;

    fn specs() -> (TableSpec, TableSpec, ForeignKeyLink) {
        let parent = TableSpec::new(
            "companies",
            &["company_code"],
            mapping(&[("codice", "company_code"), ("ragione_sociale", "name")]),
        );
        let child = TableSpec::new(
            "employees",
            &["employee_code"],
            mapping(&[("matricola", "employee_code"), ("nome", "first_name")]),
        );
        let link = ForeignKeyLink::new("company_id", "id");
        (parent, child, link)
    }

    #[test]
    fn propagates_parent_id_into_child_fk() {
        let (parent, child, link) = specs();
        let mut loader =
            ParentChildUpsertLoader::new(MemorySink::new(), parent, child, link).unwrap();
        let df = df![
            "codice" => ["C1", "C1", "C2"],
            "ragione_sociale" => ["Acme", "Acme", "Beta"],
            "matricola" => ["E1", "E2", "E3"],
            "nome" => ["anna", "bruno", "carla"]
        ]
        .unwrap();
        loader.load(&df).unwrap();

        let sink = loader.connection();
        assert_eq!(sink.row_count("companies"), 2);
        assert_eq!(sink.row_count("employees"), 3);

        let companies = sink.rows("companies").unwrap();
        let acme_id = companies[0].get("id").cloned().unwrap();
        let employees = sink.rows("employees").unwrap();
        assert_eq!(employees[0].get("company_id"), Some(&acme_id));
        assert_eq!(employees[1].get("company_id"), Some(&acme_id));
        assert_ne!(
            employees[2].get("company_id"),
            Some(&acme_id),
            "third employee belongs to the other company"
        );
    }

    #[test]
    fn unresolvable_fk_source_is_rejected_at_construction() {
        let (parent, child, _) = specs();
        let bad_link = ForeignKeyLink::new("company_id", "ghost_column");
        let err = ParentChildUpsertLoader::new(MemorySink::new(), parent, child, bad_link)
            .unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    struct FailOnTable {
        inner: MemorySink,
        poison: &'static str,
    }

    impl KeyedSink for FailOnTable {
        fn begin(&mut self) -> Result<()> {
            self.inner.begin()
        }
        fn commit(&mut self) -> Result<()> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<()> {
            self.inner.rollback()
        }
        fn upsert_returning(
            &mut self,
            table: &str,
            unique_keys: &[String],
            row: &[(String, Value)],
        ) -> Result<Vec<(String, Value)>> {
            if table == self.poison {
                return Err(EtlError::SinkWrite("connection lost".to_string()));
            }
            self.inner.upsert_returning(table, unique_keys, row)
        }
    }

    #[test]
    fn failed_batch_rolls_back_parent_writes() {
        let (parent, child, link) = specs();
        let sink = FailOnTable {
            inner: MemorySink::new(),
            poison: "employees",
        };
        let mut loader = ParentChildUpsertLoader::new(sink, parent, child, link).unwrap();
        let df = df![
            "codice" => ["C1"],
            "ragione_sociale" => ["Acme"],
            "matricola" => ["E1"],
            "nome" => ["anna"]
        ]
        .unwrap();

        let err = loader.load(&df).unwrap_err();
        assert!(matches!(err, EtlError::SinkWrite(_)));
        // the parent upsert of the batch was rolled back with it
        assert_eq!(loader.connection().inner.row_count("companies"), 0);
        assert_eq!(loader.connection().inner.row_count("employees"), 0);
    }

    #[test]
    fn upsert_is_idempotent_per_unique_key() {
        let (parent, child, link) = specs();
        let mut loader =
            ParentChildUpsertLoader::new(MemorySink::new(), parent, child, link).unwrap();
        let df = df![
            "codice" => ["C1"],
            "ragione_sociale" => ["Acme"],
            "matricola" => ["E1"],
            "nome" => ["anna"]
        ]
        .unwrap();
        loader.load(&df).unwrap();
        loader.load(&df).unwrap();

        assert_eq!(loader.connection().row_count("companies"), 1);
        assert_eq!(loader.connection().row_count("employees"), 1);
    }
}
