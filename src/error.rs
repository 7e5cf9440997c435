use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("no data in pipeline: run extract() or build it from a DataFrame first")]
    NoData,

    #[error("schema error: {0}")]
    Schema(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("sink write error: {0}")]
    SinkWrite(String),

    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, EtlError>;
