use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::load::Loader;

/// CSV sink: writes the frame to a file, creating parent directories.
/// Insert-only; each load truncates and rewrites the file.
pub struct CsvLoader {
    output_path: PathBuf,
    delimiter: u8,
    header: bool,
}

impl CsvLoader {
    pub fn new(output_path: impl AsRef<Path>) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
            delimiter: b',',
            header: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

impl Loader for CsvLoader {
    fn load(&mut self, df: &DataFrame) -> Result<()> {
        info!("[CsvLoader] writing {}", self.output_path.display());

        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&self.output_path)?;
        let mut out = df.clone();
        CsvWriter::new(&mut file)
            .include_header(self.header)
            .with_separator(self.delimiter)
            .finish(&mut out)
            .map_err(|e| {
                EtlError::SinkWrite(format!(
                    "failed to write {}: {}",
                    self.output_path.display(),
                    e
                ))
            })?;

        info!("[CsvLoader] wrote {} rows", df.height());
        Ok(())
    }
}
