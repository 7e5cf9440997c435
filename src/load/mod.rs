//! Load stage: sink contracts, the generic write-mode engine, the
//! parent/child reconciler and the bundled sinks.

mod csv;
pub mod engine;
mod memory;
pub mod parent_child;
mod sink;

pub use csv::CsvLoader;
pub use engine::{SinkConnection, WriteEngine};
pub use memory::MemorySink;
pub use parent_child::{ForeignKeyLink, KeyedSink, ParentChildUpsertLoader, TableSpec};
pub use sink::{SinkConfig, UpsertStrategy, WriteMode};

use polars::prelude::DataFrame;

use crate::error::Result;

/// Terminal stage contract: push the frame into a sink. Implementations own
/// their connection state, hence `&mut self`.
pub trait Loader {
    fn load(&mut self, df: &DataFrame) -> Result<()>;
}
