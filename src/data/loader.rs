//! Permit Data Loader Module
//! Fetches the permit and census tables, cleans them and joins them on tract GEOID.

use crate::data::columns::{
    AMI_CATEGORY, CENSUS_TRACT, GEOID, JOIN_KEY, PERMIT_TYPE, VALUATION,
};
use crate::data::{TableName, TableSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

/// Los Angeles County FIPS prefix (state 06, county 037) in 11-digit GEOID form.
pub const LA_COUNTY_GEOID_PREFIX: i64 = 6_037_000_000;

/// Placeholder for a missing permit type or income category.
pub const MISSING_LABEL: &str = "nan";

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{reason}")]
    Fetch { table: String, reason: String },
    #[error("Missing {column} Column")]
    MissingColumn { table: String, column: String },
    #[error("{0}")]
    Transform(#[from] PolarsError),
}

/// Joined permit and tract rows plus the resolved column names.
#[derive(Debug, Clone)]
pub struct MergedDataset {
    pub frame: DataFrame,
    /// Parsed date column, when the permit table has one.
    pub date_col: Option<String>,
    pub valuation_col: String,
    /// Permit rows whose tract id did not parse and fell back to the
    /// sentinel key before the join.
    pub unparsed_tracts: usize,
}

impl MergedDataset {
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Runs the fetch, clean and join pipeline over a table source.
#[derive(Debug, Clone)]
pub struct PermitLoader {
    permits_table: TableName,
    census_table: TableName,
}

impl PermitLoader {
    pub fn new(permits_table: TableName, census_table: TableName) -> Self {
        Self {
            permits_table,
            census_table,
        }
    }

    /// Load both tables and produce the merged dataset.
    pub fn load<S: TableSource + ?Sized>(&self, source: &S) -> Result<MergedDataset, LoaderError> {
        let mut permits = source.fetch(&self.permits_table)?;
        let mut census = source.fetch(&self.census_table)?;
        log::info!(
            "Fetched {} permit rows and {} tract rows",
            permits.height(),
            census.height()
        );

        Self::normalize_columns(&mut permits)?;
        Self::normalize_columns(&mut census)?;

        let column_names = Self::column_names(&permits);
        let date_col = find_date_column(&column_names);
        match &date_col {
            Some(name) => Self::parse_dates(&mut permits, name)?,
            None => log::warn!("No date column found in {}", self.permits_table),
        }

        Self::clean_valuation(&mut permits)?;

        self.require_column(&permits, &self.permits_table, CENSUS_TRACT)?;
        self.require_column(&permits, &self.permits_table, PERMIT_TYPE)?;
        self.require_column(&census, &self.census_table, AMI_CATEGORY)?;
        let census_key = self.census_key(&census)?;

        let unparsed_tracts = Self::derive_join_key(&mut permits)?;
        if unparsed_tracts > 0 {
            log::warn!(
                "{} permit rows have an unparseable {}; they share the sentinel key {}",
                unparsed_tracts,
                CENSUS_TRACT,
                LA_COUNTY_GEOID_PREFIX
            );
        }

        let key_series = census
            .column(census_key)?
            .cast(&DataType::Int64)?
            .as_materialized_series()
            .clone();
        census.with_column(key_series)?;

        let mut frame = permits
            .lazy()
            .join(
                census.lazy(),
                [col(JOIN_KEY)],
                [col(census_key)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;

        Self::fill_labels(&mut frame, PERMIT_TYPE)?;
        Self::fill_labels(&mut frame, AMI_CATEGORY)?;

        log::info!("Merged dataset has {} rows", frame.height());

        Ok(MergedDataset {
            frame,
            date_col,
            valuation_col: VALUATION.to_string(),
            unparsed_tracts,
        })
    }

    /// Upper-case every column name so later lookups are case-insensitive.
    pub fn normalize_columns(df: &mut DataFrame) -> PolarsResult<()> {
        let upper: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_uppercase())
            .collect();
        df.set_column_names(upper)
    }

    /// Replace the date column with a millisecond datetime column.
    /// Values that do not parse become null.
    pub fn parse_dates(df: &mut DataFrame, name: &str) -> PolarsResult<()> {
        let target = DataType::Datetime(TimeUnit::Milliseconds, None);
        let column = df.column(name)?;

        let parsed = match column.dtype() {
            DataType::Date | DataType::Datetime(_, _) => {
                column.cast(&target)?.as_materialized_series().clone()
            }
            DataType::String => {
                let millis: Vec<Option<i64>> = column
                    .str()?
                    .into_iter()
                    .map(|value| value.and_then(parse_timestamp_millis))
                    .collect();
                Series::new(name.into(), millis).cast(&target)?
            }
            _ => Series::full_null(name.into(), df.height(), &target),
        };

        df.with_column(parsed)?;
        Ok(())
    }

    /// Strip currency formatting from VALUATION, or synthesize it as zeros.
    pub fn clean_valuation(df: &mut DataFrame) -> PolarsResult<()> {
        let values: Vec<f64> = if has_column(df, VALUATION) {
            df.column(VALUATION)?
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|value| value.map(parse_valuation).unwrap_or(0.0))
                .collect()
        } else {
            log::warn!("No {} column; every permit is valued at 0", VALUATION);
            vec![0.0; df.height()]
        };

        df.with_column(Series::new(VALUATION.into(), values))?;
        Ok(())
    }

    /// Add the GEOID-form join key. Returns how many tract ids failed to parse.
    pub fn derive_join_key(df: &mut DataFrame) -> PolarsResult<usize> {
        let tracts = df.column(CENSUS_TRACT)?.cast(&DataType::String)?;

        let mut unparsed = 0;
        let keys: Vec<i64> = tracts
            .str()?
            .into_iter()
            .map(|raw| {
                let tract = raw.and_then(parse_tract_number);
                if tract.is_none() {
                    unparsed += 1;
                }
                join_key(tract)
            })
            .collect();

        df.with_column(Series::new(JOIN_KEY.into(), keys))?;
        Ok(unparsed)
    }

    /// Cast a label column to strings, replacing nulls with [`MISSING_LABEL`].
    fn fill_labels(df: &mut DataFrame, name: &str) -> PolarsResult<()> {
        let labels: Vec<String> = df
            .column(name)?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|value| value.unwrap_or(MISSING_LABEL).to_string())
            .collect();
        df.with_column(Series::new(name.into(), labels))?;
        Ok(())
    }

    /// Census-side join column: CENSUS_TRACT, or GEOID when the table only has that.
    fn census_key(&self, census: &DataFrame) -> Result<&'static str, LoaderError> {
        if has_column(census, CENSUS_TRACT) {
            Ok(CENSUS_TRACT)
        } else if has_column(census, GEOID) {
            log::debug!("{} has no {}; joining on {}", self.census_table, CENSUS_TRACT, GEOID);
            Ok(GEOID)
        } else {
            Err(LoaderError::MissingColumn {
                table: self.census_table.to_string(),
                column: CENSUS_TRACT.to_string(),
            })
        }
    }

    fn require_column(
        &self,
        df: &DataFrame,
        table: &TableName,
        column: &str,
    ) -> Result<(), LoaderError> {
        if has_column(df, column) {
            Ok(())
        } else {
            Err(LoaderError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Pick the date column: names containing "DATE", preferring one that also
/// contains "ISSUE", else the first in column order.
pub fn find_date_column(columns: &[String]) -> Option<String> {
    let candidates: Vec<&String> = columns.iter().filter(|c| c.contains("DATE")).collect();
    candidates
        .iter()
        .find(|c| c.contains("ISSUE"))
        .or_else(|| candidates.first())
        .map(|c| c.to_string())
}

/// Parse a currency-formatted amount such as `"$1,234.50"`.
///
/// Anything that is not a finite, non-negative number after stripping
/// `$` and `,` is valued at `0.0`.
pub fn parse_valuation(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Parse a local tract number such as `"1234.01"`.
/// Numbers too large to form a key count as unparsed.
pub fn parse_tract_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| tract_key(*v).is_some())
}

/// GEOID-form key for a local tract number; unparsed tracts map to the county prefix.
pub fn join_key(tract: Option<f64>) -> i64 {
    tract.and_then(tract_key).unwrap_or(LA_COUNTY_GEOID_PREFIX)
}

fn tract_key(tract: f64) -> Option<i64> {
    let scaled = (tract * 100.0).round();
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return None;
    }
    (scaled as i64).checked_add(LA_COUNTY_GEOID_PREFIX)
}

/// Milliseconds since the epoch for the common permit date layouts.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().timestamp_millis())
}
