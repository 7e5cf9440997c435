//! Pipeline core: one frame threaded through extract → preprocess /
//! transform → load, with branching operations (filter, split, join,
//! anti-join) that return new independent pipelines.
//!
//! Every public operation is documented as either "mutates and returns
//! self" or "returns a new independent pipeline". Branching operations
//! never share mutable column storage with the source pipeline: each stage
//! replaces the frame wholesale, so a branch can never observe writes
//! through its origin.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::{info, warn};

use crate::dataset::{coerce_keys_to_string, RowView};
use crate::error::{EtlError, Result};
use crate::extract::Extractor;
use crate::load::Loader;
use crate::preprocess::Preprocessor;
use crate::transform::{CustomSqlFilterTransformer, FilterTransformer, Transformer};

/// Join kind for [`EtlPipeline::join_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinHow {
    Inner,
    Left,
    Right,
    Outer,
}

/// Join key columns: shared names, or distinct left/right names.
#[derive(Debug, Clone)]
pub enum JoinKeys {
    On(Vec<String>),
    LeftRight(Vec<String>, Vec<String>),
}

impl JoinKeys {
    pub fn on(columns: &[&str]) -> Self {
        JoinKeys::On(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn left_right(left: &[&str], right: &[&str]) -> Self {
        JoinKeys::LeftRight(
            left.iter().map(|c| c.to_string()).collect(),
            right.iter().map(|c| c.to_string()).collect(),
        )
    }

    fn sides(&self) -> Result<(Vec<String>, Vec<String>)> {
        match self {
            JoinKeys::On(cols) => {
                if cols.is_empty() {
                    return Err(EtlError::Config("join needs at least one key column".into()));
                }
                Ok((cols.clone(), cols.clone()))
            }
            JoinKeys::LeftRight(left, right) => {
                if left.is_empty() || left.len() != right.len() {
                    return Err(EtlError::Config(
                        "left and right join keys must be non-empty and of equal length".into(),
                    ));
                }
                Ok((left.clone(), right.clone()))
            }
        }
    }
}

/// Indicator column name absent from both frames, so the anti-join can
/// never shadow or drop a user column.
fn match_indicator_name(left: &DataFrame, right: &DataFrame) -> String {
    let mut name = String::from("_match");
    let mut n = 0u32;
    while left.get_column_names().contains(&name.as_str())
        || right.get_column_names().contains(&name.as_str())
    {
        n += 1;
        name = format!("_match{}", n);
    }
    name
}

/// A pipeline is either empty (no frame yet; only `extract` or
/// construction-from-data is legal) or populated. Operations on an empty
/// pipeline fail with [`EtlError::NoData`].
#[derive(Debug, Clone, Default)]
pub struct EtlPipeline {
    data: Option<DataFrame>,
}

impl EtlPipeline {
    /// New empty pipeline.
    pub fn new() -> Self {
        Self { data: None }
    }

    /// New pipeline already populated with a frame.
    pub fn from_dataframe(df: DataFrame) -> Self {
        Self { data: Some(df) }
    }

    pub fn data(&self) -> Option<&DataFrame> {
        self.data.as_ref()
    }

    /// Takes the frame out, leaving the pipeline empty.
    pub fn take_data(&mut self) -> Option<DataFrame> {
        self.data.take()
    }

    pub fn row_count(&self) -> usize {
        self.data.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    fn require_data(&self) -> Result<&DataFrame> {
        self.data.as_ref().ok_or(EtlError::NoData)
    }

    /// Mutates and returns self. Pulls a frame from the source; any source
    /// failure surfaces as [`EtlError::Extraction`].
    pub fn extract(&mut self, extractor: &dyn Extractor) -> Result<&mut Self> {
        let df = extractor.extract().map_err(|e| match e {
            err @ EtlError::Extraction(_) => err,
            other => EtlError::Extraction(other.to_string()),
        })?;
        info!("[EtlPipeline] extracted {} rows", df.height());
        self.data = Some(df);
        Ok(self)
    }

    /// Mutates and returns self.
    pub fn preprocess(&mut self, unit: &dyn Preprocessor) -> Result<&mut Self> {
        let df = self.require_data()?.clone();
        self.data = Some(unit.process(df)?);
        Ok(self)
    }

    /// Mutates and returns self.
    pub fn transform(&mut self, unit: &dyn Transformer) -> Result<&mut Self> {
        let df = self.require_data()?.clone();
        self.data = Some(unit.transform(df)?);
        Ok(self)
    }

    /// Applies the transformer and returns the result without touching the
    /// pipeline. Backs the filter family, which must not corrupt the chain
    /// it was called from.
    pub fn transform_and_get_df(&self, unit: &dyn Transformer) -> Result<DataFrame> {
        unit.transform(self.require_data()?.clone())
    }

    /// Returns a new independent pipeline holding only the rows matching
    /// the row-predicate expression (e.g. `amount > 100`). The calling
    /// pipeline is untouched.
    pub fn filter(&self, expression: &str) -> Result<EtlPipeline> {
        let df = self.transform_and_get_df(&FilterTransformer::new(expression))?;
        Ok(EtlPipeline::from_dataframe(df))
    }

    /// Returns a new independent pipeline filtered by an SQL WHERE clause
    /// or full SELECT, with the frame registered as relation `df`. Agrees
    /// with [`filter`](Self::filter) on equivalent predicates.
    pub fn sql_filter(&self, expression: &str) -> Result<EtlPipeline> {
        let df = self.transform_and_get_df(&CustomSqlFilterTransformer::new(expression)?)?;
        Ok(EtlPipeline::from_dataframe(df))
    }

    /// Mutates nothing but the sink: pushes the current frame into the
    /// loader and returns self.
    pub fn load(&mut self, loader: &mut dyn Loader) -> Result<&mut Self> {
        loader.load(self.require_data()?)?;
        Ok(self)
    }

    /// Returns a new independent pipeline with its own copy of the frame
    /// (or empty, when this one is empty).
    pub fn clone_pipeline(&self) -> EtlPipeline {
        self.clone()
    }

    /// Returns new independent pipelines, one per branch name. Each row is
    /// routed by the classifier; rows classified outside `flow_names` are
    /// dropped with a warning — lossy routing is the contract, not an
    /// error. Row order is preserved within each branch, and every
    /// requested branch exists in the result even when empty.
    pub fn split<F>(
        &self,
        flow_names: &[&str],
        classifier: F,
    ) -> Result<HashMap<String, EtlPipeline>>
    where
        F: Fn(&RowView) -> String,
    {
        let df = self.require_data()?;
        info!("[EtlPipeline] split into branches: {:?}", flow_names);

        let mut buckets: HashMap<&str, Vec<IdxSize>> =
            flow_names.iter().map(|n| (*n, Vec::new())).collect();
        let mut dropped = 0usize;
        for idx in 0..df.height() {
            let row = RowView::new(df, idx);
            let key = classifier(&row);
            match buckets.get_mut(key.as_str()) {
                Some(indices) => indices.push(idx as IdxSize),
                None => {
                    warn!(
                        "[EtlPipeline] split key '{}' not among branch names, row {} dropped",
                        key, idx
                    );
                    dropped += 1;
                }
            }
        }

        let mut result = HashMap::with_capacity(flow_names.len());
        for name in flow_names {
            let indices = buckets.remove(*name).unwrap_or_default();
            let idx_ca = IdxCa::from_vec("idx", indices);
            let branch = df.take(&idx_ca)?;
            info!(
                "[EtlPipeline] branch '{}' holds {} rows",
                name,
                branch.height()
            );
            result.insert(name.to_string(), EtlPipeline::from_dataframe(branch));
        }
        if dropped > 0 {
            warn!("[EtlPipeline] split dropped {} unrouted rows", dropped);
        }
        Ok(result)
    }

    /// Relational join with another pipeline; returns a new independent
    /// pipeline. Key columns are cast to String **in place on both
    /// inputs** before matching, so typed and string keys compare equal —
    /// callers must not rely on original key column types surviving the
    /// call. Colliding right-side column names get `suffix` (default
    /// `_right`).
    pub fn join_with(
        &mut self,
        other: &mut EtlPipeline,
        how: JoinHow,
        keys: JoinKeys,
        suffix: Option<&str>,
    ) -> Result<EtlPipeline> {
        let (left_on, right_on) = keys.sides()?;
        self.coerce_join_keys(&left_on)?;
        other.coerce_join_keys(&right_on)?;

        let left = self.require_data()?;
        let right = other.require_data()?;
        info!("[EtlPipeline] join {:?} on {:?} / {:?}", how, left_on, right_on);

        let args = |t: JoinType| {
            let mut a = JoinArgs::new(t);
            a.suffix = Some(suffix.unwrap_or("_right").to_string());
            a
        };
        // polars has no right join; swap sides and join left instead.
        let joined = match how {
            JoinHow::Inner => left.join(right, &left_on, &right_on, args(JoinType::Inner))?,
            JoinHow::Left => left.join(right, &left_on, &right_on, args(JoinType::Left))?,
            JoinHow::Outer => left.join(right, &left_on, &right_on, args(JoinType::Outer))?,
            JoinHow::Right => right.join(left, &right_on, &left_on, args(JoinType::Left))?,
        };

        info!("[EtlPipeline] rows post-join: {}", joined.height());
        Ok(EtlPipeline::from_dataframe(joined))
    }

    /// Returns a new independent pipeline holding the rows of this
    /// pipeline with no key match in `other`. Built as a left join against
    /// the keyed right side carrying a match indicator, keeping the
    /// unmatched rows; key columns are cast to String in place on both
    /// inputs, as in [`join_with`](Self::join_with).
    pub fn anti_join_with(
        &mut self,
        other: &mut EtlPipeline,
        keys: JoinKeys,
    ) -> Result<EtlPipeline> {
        let (left_on, right_on) = keys.sides()?;
        self.coerce_join_keys(&left_on)?;
        other.coerce_join_keys(&right_on)?;

        let left = self.require_data()?;
        let right = other.require_data()?;
        info!("[EtlPipeline] anti join on {:?} / {:?}", left_on, right_on);

        // keys-plus-indicator projection of the right side; distinct so the
        // left row count cannot grow through duplicate matches.
        let mut right_keys = right
            .select(right_on.clone())?
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        for (r, l) in right_on.iter().zip(left_on.iter()) {
            if r != l {
                right_keys.rename(r, l)?;
            }
        }
        let indicator = match_indicator_name(left, &right_keys);
        let height = right_keys.height();
        right_keys.with_column(Series::new(&indicator, vec![true; height]))?;

        let joined = left.join(
            &right_keys,
            &left_on,
            &left_on,
            JoinArgs::new(JoinType::Left),
        )?;
        let unmatched = joined
            .lazy()
            .filter(col(&indicator).is_null())
            .collect()?
            .drop(&indicator)?;

        info!("[EtlPipeline] rows post-anti-join: {}", unmatched.height());
        Ok(EtlPipeline::from_dataframe(unmatched))
    }

    /// Diagnostic only: logs shape, column names and dtypes.
    pub fn log_structure(&self) {
        match &self.data {
            None => info!("[EtlPipeline] empty pipeline"),
            Some(df) => {
                info!("[EtlPipeline] shape: {:?}", df.shape());
                for series in df.get_columns() {
                    info!("[EtlPipeline]   {}: {}", series.name(), series.dtype());
                }
            }
        }
    }

    fn coerce_join_keys(&mut self, columns: &[String]) -> Result<()> {
        match self.data.as_mut() {
            Some(df) => coerce_keys_to_string(df, columns),
            None => Err(EtlError::NoData),
        }
    }
}
