//! Data Processor Module
//! Handles filtering of the merged dataset into the two income groups.

use crate::data::columns::{AMI_CATEGORY, PERMIT_TYPE};
use crate::data::MergedDataset;
use polars::prelude::*;
use std::fmt;
use thiserror::Error;

/// The cost filter is only offered when some permit is valued above this.
pub const COST_FILTER_THRESHOLD: f64 = 1000.0;

const LOW_INCOME_MARKER: &str = "Low";
const HIGH_INCOME_MARKER: &str = "Above Moderate";

/// Which side of the comparison a group sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSide {
    Low,
    High,
}

impl fmt::Display for GroupSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSide::Low => f.write_str("Low Income"),
            GroupSide::High => f.write_str("High Income"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Filters result in empty dataset ({0} group is empty). Please adjust your selection.")]
    EmptyGroup(GroupSide),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

impl AnalysisError {
    /// Empty groups are a user-correctable warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, AnalysisError::EmptyGroup(_))
    }
}

/// User selections applied on top of the merged dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub low_categories: Vec<String>,
    pub high_categories: Vec<String>,
    pub essential_types: Vec<String>,
    /// Inclusive valuation ceiling; `None` keeps every row.
    pub max_cost: Option<f64>,
}

/// Rows of the merged dataset split into the two compared groups.
#[derive(Debug, Clone)]
pub struct GroupSplit {
    pub low: DataFrame,
    pub high: DataFrame,
}

/// Handles filtering and selection defaults.
pub struct DataProcessor;

impl DataProcessor {
    /// Sorted distinct values of a string column.
    pub fn unique_labels(df: &DataFrame, column: &str) -> Vec<String> {
        df.column(column)
            .ok()
            .and_then(|col| col.cast(&DataType::String).ok())
            .and_then(|col| col.unique().ok())
            .map(|unique| {
                let mut labels: Vec<String> = unique
                    .str()
                    .map(|ca| ca.into_iter().flatten().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                labels.sort();
                labels
            })
            .unwrap_or_default()
    }

    /// All income categories present, sorted.
    pub fn income_categories(dataset: &MergedDataset) -> Vec<String> {
        Self::unique_labels(&dataset.frame, AMI_CATEGORY)
    }

    /// All permit types present, sorted.
    pub fn permit_types(dataset: &MergedDataset) -> Vec<String> {
        Self::unique_labels(&dataset.frame, PERMIT_TYPE)
    }

    /// Largest valuation in the dataset, `0.0` when empty.
    pub fn max_valuation(dataset: &MergedDataset) -> f64 {
        dataset
            .frame
            .column(&dataset.valuation_col)
            .ok()
            .and_then(|col| col.f64().ok().and_then(|ca| ca.max()))
            .unwrap_or(0.0)
    }

    /// Range offered to the cost filter, or `None` when there is no
    /// meaningful valuation data and the full dataset should be used.
    pub fn cost_ceiling_range(max_valuation: f64) -> Option<(f64, f64)> {
        (max_valuation > COST_FILTER_THRESHOLD).then_some((0.0, max_valuation))
    }

    pub fn default_low_categories(categories: &[String]) -> Vec<String> {
        categories
            .iter()
            .filter(|c| c.contains(LOW_INCOME_MARKER))
            .cloned()
            .collect()
    }

    pub fn default_high_categories(categories: &[String]) -> Vec<String> {
        categories
            .iter()
            .filter(|c| c.contains(HIGH_INCOME_MARKER))
            .cloned()
            .collect()
    }

    /// Configured essential types that actually occur, in configured order.
    pub fn default_essentials(configured: &[String], permit_types: &[String]) -> Vec<String> {
        configured
            .iter()
            .filter(|t| permit_types.contains(t))
            .cloned()
            .collect()
    }

    /// Default selection for a freshly loaded dataset.
    pub fn default_selection(dataset: &MergedDataset, essentials: &[String]) -> FilterSelection {
        let categories = Self::income_categories(dataset);
        let types = Self::permit_types(dataset);
        let max_cost = Self::cost_ceiling_range(Self::max_valuation(dataset)).map(|(_, max)| max);

        FilterSelection {
            low_categories: Self::default_low_categories(&categories),
            high_categories: Self::default_high_categories(&categories),
            essential_types: Self::default_essentials(essentials, &types),
            max_cost,
        }
    }

    /// Keep rows valued at or below the ceiling.
    pub fn filter_by_cost(
        df: &DataFrame,
        valuation_col: &str,
        max_cost: Option<f64>,
    ) -> PolarsResult<DataFrame> {
        match max_cost {
            Some(limit) => df
                .clone()
                .lazy()
                .filter(col(valuation_col).lt_eq(lit(limit)))
                .collect(),
            None => Ok(df.clone()),
        }
    }

    /// Keep rows whose income category is one of `categories`.
    pub fn filter_by_categories(df: &DataFrame, categories: &[String]) -> PolarsResult<DataFrame> {
        let predicate = categories.iter().fold(lit(false), |acc, category| {
            acc.or(col(AMI_CATEGORY).eq(lit(category.as_str())))
        });
        df.clone().lazy().filter(predicate).collect()
    }

    /// Apply the cost ceiling, then split into low and high income groups.
    /// Either group coming out empty is reported as [`AnalysisError::EmptyGroup`].
    pub fn split_groups(
        dataset: &MergedDataset,
        selection: &FilterSelection,
    ) -> Result<GroupSplit, AnalysisError> {
        let filtered =
            Self::filter_by_cost(&dataset.frame, &dataset.valuation_col, selection.max_cost)?;

        let low = Self::filter_by_categories(&filtered, &selection.low_categories)?;
        let high = Self::filter_by_categories(&filtered, &selection.high_categories)?;

        log::debug!(
            "Cost ceiling {:?}: {} of {} rows, {} low / {} high",
            selection.max_cost,
            filtered.height(),
            dataset.height(),
            low.height(),
            high.height()
        );

        if low.height() == 0 {
            return Err(AnalysisError::EmptyGroup(GroupSide::Low));
        }
        if high.height() == 0 {
            return Err(AnalysisError::EmptyGroup(GroupSide::High));
        }

        Ok(GroupSplit { low, high })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::VALUATION;

    fn dataset() -> MergedDataset {
        let frame = df!(
            "PERMIT_TYPE" => ["Electrical", "Roofing", "Plumbing", "Electrical"],
            "AMI_CATEGORY" => ["Low Income", "Low Income", "Above Moderate Income", "Moderate Income"],
            "VALUATION" => [500.0, 2000.0, 800.0, 100.0]
        )
        .unwrap();
        MergedDataset {
            frame,
            date_col: None,
            valuation_col: VALUATION.to_string(),
            unparsed_tracts: 0,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn unique_labels_are_sorted() {
        let ds = dataset();
        assert_eq!(
            DataProcessor::permit_types(&ds),
            strings(&["Electrical", "Plumbing", "Roofing"])
        );
    }

    #[test]
    fn default_selection_matches_income_markers() {
        let ds = dataset();
        let selection =
            DataProcessor::default_selection(&ds, &strings(&["Electrical", "HVAC", "Plumbing"]));
        assert_eq!(selection.low_categories, strings(&["Low Income"]));
        assert_eq!(selection.high_categories, strings(&["Above Moderate Income"]));
        assert_eq!(selection.essential_types, strings(&["Electrical", "Plumbing"]));
        assert_eq!(selection.max_cost, Some(2000.0));
    }

    #[test]
    fn cost_filter_disabled_without_valuation_data() {
        assert_eq!(DataProcessor::cost_ceiling_range(0.0), None);
        assert_eq!(DataProcessor::cost_ceiling_range(1000.0), None);
        assert_eq!(DataProcessor::cost_ceiling_range(1500.0), Some((0.0, 1500.0)));
    }

    #[test]
    fn split_applies_ceiling_inclusively() {
        let ds = dataset();
        let selection = FilterSelection {
            low_categories: strings(&["Low Income"]),
            high_categories: strings(&["Above Moderate Income"]),
            essential_types: Vec::new(),
            max_cost: Some(800.0),
        };
        let split = DataProcessor::split_groups(&ds, &selection).unwrap();
        assert_eq!(split.low.height(), 1);
        assert_eq!(split.high.height(), 1);
        // base table untouched
        assert_eq!(ds.height(), 4);
    }

    #[test]
    fn empty_group_is_a_warning() {
        let ds = dataset();
        let selection = FilterSelection {
            low_categories: strings(&["Low Income"]),
            high_categories: strings(&["Above Moderate Income"]),
            essential_types: Vec::new(),
            max_cost: Some(600.0),
        };
        let err = DataProcessor::split_groups(&ds, &selection).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyGroup(GroupSide::High)));
        assert!(err.is_warning());

        let none_selected = FilterSelection::default();
        let err = DataProcessor::split_groups(&ds, &none_selected).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyGroup(GroupSide::Low)));
    }
}
