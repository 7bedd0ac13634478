//! Data module - table sources, loading, caching and filtering

mod cache;
mod loader;
mod processor;
mod source;

pub use cache::DatasetCache;
pub use loader::{
    find_date_column, join_key, parse_timestamp_millis, parse_tract_number, parse_valuation,
    LoaderError, MergedDataset, PermitLoader, LA_COUNTY_GEOID_PREFIX, MISSING_LABEL,
};
pub use processor::{AnalysisError, DataProcessor, FilterSelection, GroupSide, GroupSplit};
pub use source::{CsvDirectorySource, MemorySource, TableName, TableSource};

/// Upper-cased column names the pipeline keys off.
pub mod columns {
    pub const PERMIT_TYPE: &str = "PERMIT_TYPE";
    pub const CENSUS_TRACT: &str = "CENSUS_TRACT";
    pub const GEOID: &str = "GEOID";
    pub const VALUATION: &str = "VALUATION";
    pub const AMI_CATEGORY: &str = "AMI_CATEGORY";
    /// Derived GEOID-form key added to the permit table before the join.
    pub const JOIN_KEY: &str = "CT_TO_COMBINE";
}
