//! Permit Type Aggregator
//! Normalized permit-type distributions per income group and their difference.

use crate::data::columns::PERMIT_TYPE;
use crate::data::{AnalysisError, GroupSide, GroupSplit};
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;

const COUNT_COLUMN: &str = "count";

/// Share of each permit type within one group, summing to 1.0.
///
/// Entries are ordered by share descending, then label ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(String, f64)>,
}

impl Distribution {
    /// Normalize raw `(label, count)` pairs. Returns `None` when the counts
    /// sum to zero, since proportions are undefined for an empty group.
    pub fn from_counts(counts: Vec<(String, f64)>) -> Option<Self> {
        let total: f64 = counts.iter().map(|(_, c)| c).sum();
        if total <= 0.0 {
            return None;
        }

        let mut entries: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(label, count)| (label, count / total))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(Self { entries })
    }

    /// Count a label column with a group-by and normalize it.
    pub fn from_frame(df: &DataFrame, column: &str) -> PolarsResult<Option<Self>> {
        let counted = df
            .clone()
            .lazy()
            .select([col(column).cast(DataType::String)])
            .group_by([col(column)])
            .agg([len().cast(DataType::Float64).alias(COUNT_COLUMN)])
            .collect()?;

        let labels = counted.column(column)?.str()?;
        let counts = counted.column(COUNT_COLUMN)?.f64()?;

        let pairs: Vec<(String, f64)> = labels
            .into_iter()
            .zip(counts.into_iter())
            .filter_map(|(label, count)| Some((label?.to_string(), count?)))
            .collect();

        Ok(Self::from_counts(pairs))
    }

    /// Share of `label`, `0.0` when it does not occur.
    pub fn get(&self, label: &str) -> f64 {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, share)| *share)
            .unwrap_or(0.0)
    }

    /// Combined share of the given labels.
    pub fn share_of(&self, labels: &[String]) -> f64 {
        self.entries
            .iter()
            .filter(|(l, _)| labels.contains(l))
            .map(|(_, share)| share)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }
}

/// One permit type's share in each group.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub label: String,
    pub low: f64,
    pub high: f64,
    /// `high - low`; positive means preferred by the high income group.
    pub diff: f64,
}

impl ComparisonRow {
    pub fn combined(&self) -> f64 {
        self.low + self.high
    }
}

/// Both distributions plus the union table, sorted by label.
#[derive(Debug, Clone)]
pub struct GroupComparison {
    pub low: Distribution,
    pub high: Distribution,
    pub rows: Vec<ComparisonRow>,
}

impl GroupComparison {
    /// Build the union table; labels missing from one group get 0.0 there.
    pub fn from_distributions(low: Distribution, high: Distribution) -> Self {
        let labels: BTreeSet<&str> = low.labels().chain(high.labels()).collect();
        let rows = labels
            .into_iter()
            .map(|label| {
                let (l, h) = (low.get(label), high.get(label));
                ComparisonRow {
                    label: label.to_string(),
                    low: l,
                    high: h,
                    diff: h - l,
                }
            })
            .collect();

        Self { low, high, rows }
    }

    pub fn row(&self, label: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// Aggregation over a filtered group split.
pub struct Aggregator;

impl Aggregator {
    /// Compare permit-type distributions of the two groups.
    /// Refuses to aggregate an empty group.
    pub fn compare(split: &GroupSplit) -> Result<GroupComparison, AnalysisError> {
        let low = Distribution::from_frame(&split.low, PERMIT_TYPE)?
            .ok_or(AnalysisError::EmptyGroup(GroupSide::Low))?;
        let high = Distribution::from_frame(&split.high, PERMIT_TYPE)?
            .ok_or(AnalysisError::EmptyGroup(GroupSide::High))?;

        Ok(GroupComparison::from_distributions(low, high))
    }

    /// Rank by combined share descending, ties by label ascending.
    pub fn rank(rows: &mut [ComparisonRow]) {
        rows.sort_by(Self::by_combined_desc);
    }

    /// The `n` permit types with the largest combined share.
    pub fn top_n(rows: &[ComparisonRow], n: usize) -> Vec<ComparisonRow> {
        let mut ranked = rows.to_vec();
        Self::rank(&mut ranked);
        ranked.truncate(n);
        ranked
    }

    /// Essential types first, then the rest, each part ranked by combined
    /// share. Also returns how many rows are essential.
    pub fn essentials_first(
        rows: &[ComparisonRow],
        essentials: &[String],
    ) -> (Vec<ComparisonRow>, usize) {
        let (mut essential, mut other): (Vec<ComparisonRow>, Vec<ComparisonRow>) = rows
            .iter()
            .cloned()
            .partition(|r| essentials.contains(&r.label));
        Self::rank(&mut essential);
        Self::rank(&mut other);

        let boundary = essential.len();
        essential.extend(other);
        (essential, boundary)
    }

    fn by_combined_desc(a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
        b.combined()
            .total_cmp(&a.combined())
            .then_with(|| a.label.cmp(&b.label))
    }
}
