//! flowetl: tabular ETL pipelines over polars DataFrames.
//!
//! A pipeline threads one DataFrame through extract → preprocess/transform →
//! load stages, with relational branching (filter, split, join, anti-join)
//! and a generic write-mode engine that reconciles sink state under
//! insert / update / upsert semantics.

pub mod dataset;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod preprocess;
pub mod transform;
pub mod validate;

pub use dataset::{map_columns, ColumnMapping, RowView, Value};
pub use error::{EtlError, Result};
pub use pipeline::{EtlPipeline, JoinHow, JoinKeys};
