//! Table Sources
//! Named tabular sources the loader reads in full.

use crate::data::LoaderError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Namespace-qualified table name, e.g. `LA_PERMIT_DATA.PUBLIC.PERMIT_RECORDS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Last segment of the qualified name.
    pub fn table(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A queryable source of whole tables.
pub trait TableSource {
    /// Read the named table in full.
    fn fetch(&self, name: &TableName) -> Result<DataFrame, LoaderError>;
}

/// Reads `<root>/<TABLE>.csv` for each requested table.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the CSV file backing a table, trying the exact table name
    /// first and the lower-case file name second.
    pub fn resolve(&self, name: &TableName) -> Option<PathBuf> {
        let table = name.table();
        [table.to_string(), table.to_lowercase()]
            .into_iter()
            .map(|stem| self.root.join(format!("{stem}.csv")))
            .find(|path| path.is_file())
    }
}

impl TableSource for CsvDirectorySource {
    fn fetch(&self, name: &TableName) -> Result<DataFrame, LoaderError> {
        let path = self.resolve(name).ok_or_else(|| LoaderError::Fetch {
            table: name.to_string(),
            reason: format!(
                "Table {} does not exist: no {}.csv under {}",
                name,
                name.table(),
                self.root.display()
            ),
        })?;

        log::debug!("Reading {} from {}", name, path.display());

        LazyCsvReader::new(&path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| LoaderError::Fetch {
                table: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// In-memory tables, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<TableName, DataFrame>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<TableName>, df: DataFrame) -> Self {
        self.insert(name, df);
        self
    }

    pub fn insert(&mut self, name: impl Into<TableName>, df: DataFrame) {
        self.tables.insert(name.into(), df);
    }
}

impl TableSource for MemorySource {
    fn fetch(&self, name: &TableName) -> Result<DataFrame, LoaderError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::Fetch {
                table: name.to_string(),
                reason: format!("Table {name} does not exist or not authorized."),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn table_name_exposes_last_segment() {
        let name = TableName::new("LA_PERMIT_DATA.PUBLIC.PERMIT_RECORDS");
        assert_eq!(name.table(), "PERMIT_RECORDS");
        assert_eq!(TableName::new("PLAIN").table(), "PLAIN");
    }

    #[test]
    fn memory_source_reports_missing_table() {
        let source = MemorySource::new();
        let err = source.fetch(&"DB.PUBLIC.NOPE".into()).unwrap_err();
        assert!(matches!(err, LoaderError::Fetch { ref table, .. } if table == "DB.PUBLIC.NOPE"));
    }

    #[test]
    fn csv_source_falls_back_to_lowercase_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("census_tracts.csv"),
            "CENSUS_TRACT,AMI_CATEGORY\n6037123400,Low Income\n",
        )
        .unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let df = source
            .fetch(&"LA_PERMIT_DATA.PUBLIC.CENSUS_TRACTS".into())
            .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn csv_source_missing_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDirectorySource::new(dir.path());
        let err = source
            .fetch(&"LA_PERMIT_DATA.PUBLIC.PERMIT_RECORDS".into())
            .unwrap_err();
        assert!(err.to_string().contains("PERMIT_RECORDS"));
    }
}
