use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::extract::Extractor;

/// CSV source. Every column is read as String (no schema inference), like a
/// raw staging load; downstream transformers decide about types. Header
/// names are cleaned of BOM markers, stray quotes and surrounding
/// whitespace.
pub struct CsvExtractor {
    path: PathBuf,
    delimiter: u8,
    has_header: bool,
}

impl CsvExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            has_header: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}

impl Extractor for CsvExtractor {
    fn extract(&self) -> Result<DataFrame> {
        info!("[CsvExtractor] reading {}", self.path.display());

        if !self.path.exists() {
            return Err(EtlError::Extraction(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let mut df = LazyCsvReader::new(&self.path)
            .with_has_header(self.has_header)
            .with_separator(self.delimiter)
            .with_infer_schema_length(Some(0))
            .finish()
            .map_err(|e| EtlError::Extraction(format!("failed to read CSV: {}", e)))?
            .collect()
            .map_err(|e| EtlError::Extraction(format!("failed to collect CSV: {}", e)))?;

        let renames: Vec<(String, String)> = df
            .get_column_names()
            .iter()
            .map(|&n| (n.to_string(), clean_header(n)))
            .filter(|(orig, clean)| orig != clean)
            .collect();
        for (orig, clean) in renames {
            df.rename(&orig, &clean)?;
        }

        info!("[CsvExtractor] read {} rows", df.height());
        Ok(df)
    }
}

fn clean_header(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .replace("ï»¿", "")
        .replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_header_strips_bom_and_quotes() {
        assert_eq!(clean_header("\u{feff}\"codice\" "), "codice");
        assert_eq!(clean_header("nome"), "nome");
    }

    #[test]
    fn missing_file_is_extraction_error() {
        let err = CsvExtractor::new("/no/such/file.csv").extract().unwrap_err();
        assert!(matches!(err, EtlError::Extraction(_)));
    }
}
