//! Dashboard Views
//! Plain data behind the KPI cards and the five charts.

use crate::data::{AnalysisError, FilterSelection, GroupSplit};
use crate::stats::{Aggregator, ComparisonRow, Distribution, GroupComparison};
use serde::{Deserialize, Serialize};

/// Label of the bucket that absorbs composition slices past the limit.
pub const OTHERS_LABEL: &str = "Others";

/// Tunables for view construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub top_n: usize,
    pub composition_slices: usize,
    pub gap_threshold: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            top_n: 12,
            composition_slices: 6,
            gap_threshold: 0.002,
        }
    }
}

/// Headline metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiSummary {
    pub low_count: usize,
    pub high_count: usize,
    pub low_essential_share: f64,
    pub high_essential_share: f64,
}

impl KpiSummary {
    /// High minus low essential share, in percentage points.
    pub fn essential_gap_points(&self) -> f64 {
        (self.high_essential_share - self.low_essential_share) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSlice {
    pub label: String,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CumulativePoint {
    pub label: String,
    pub low_cum: f64,
    pub high_cum: f64,
}

/// Running shares in essentials-first order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CumulativeShare {
    pub points: Vec<CumulativePoint>,
    /// Number of leading points that are essential types.
    pub essential_count: usize,
}

/// Everything the dashboard renders for one selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub kpis: KpiSummary,
    /// Chart 1: top-N permit types by combined share.
    pub comparison: Vec<ComparisonRow>,
    /// Chart 2: low income composition.
    pub low_composition: Vec<CompositionSlice>,
    /// Chart 3: high income composition.
    pub high_composition: Vec<CompositionSlice>,
    /// Chart 4: cumulative share, essentials first.
    pub cumulative: CumulativeShare,
    /// Chart 5: preference gap, sorted by `diff` ascending.
    pub gap: Vec<ComparisonRow>,
}

impl DashboardView {
    /// Aggregate a group split and derive every view from it.
    pub fn build(
        split: &GroupSplit,
        selection: &FilterSelection,
        options: &ViewOptions,
    ) -> Result<Self, AnalysisError> {
        let comparison = Aggregator::compare(split)?;
        Ok(Self::from_comparison(
            &comparison,
            split.low.height(),
            split.high.height(),
            selection,
            options,
        ))
    }

    pub fn from_comparison(
        comparison: &GroupComparison,
        low_count: usize,
        high_count: usize,
        selection: &FilterSelection,
        options: &ViewOptions,
    ) -> Self {
        let essentials = &selection.essential_types;
        Self {
            kpis: KpiSummary {
                low_count,
                high_count,
                low_essential_share: comparison.low.share_of(essentials),
                high_essential_share: comparison.high.share_of(essentials),
            },
            comparison: Aggregator::top_n(&comparison.rows, options.top_n),
            low_composition: composition(&comparison.low, options.composition_slices),
            high_composition: composition(&comparison.high, options.composition_slices),
            cumulative: cumulative_share(&comparison.rows, essentials),
            gap: preference_gap(&comparison.rows, options.gap_threshold),
        }
    }
}

/// Largest `slices` shares, with the remainder folded into [`OTHERS_LABEL`].
pub fn composition(dist: &Distribution, slices: usize) -> Vec<CompositionSlice> {
    let mut out: Vec<CompositionSlice> = dist
        .iter()
        .take(slices)
        .map(|(label, share)| CompositionSlice {
            label: label.to_string(),
            share,
        })
        .collect();

    if dist.len() > slices {
        let rest: f64 = dist.iter().skip(slices).map(|(_, share)| share).sum();
        out.push(CompositionSlice {
            label: OTHERS_LABEL.to_string(),
            share: rest,
        });
    }
    out
}

pub fn cumulative_share(rows: &[ComparisonRow], essentials: &[String]) -> CumulativeShare {
    let (ordered, essential_count) = Aggregator::essentials_first(rows, essentials);

    let mut low_cum = 0.0;
    let mut high_cum = 0.0;
    let points = ordered
        .into_iter()
        .map(|row| {
            low_cum += row.low;
            high_cum += row.high;
            CumulativePoint {
                label: row.label,
                low_cum,
                high_cum,
            }
        })
        .collect();

    CumulativeShare {
        points,
        essential_count,
    }
}

/// Rows whose absolute difference exceeds `threshold`, most low-leaning first.
pub fn preference_gap(rows: &[ComparisonRow], threshold: f64) -> Vec<ComparisonRow> {
    let mut gap: Vec<ComparisonRow> = rows
        .iter()
        .filter(|r| r.diff.abs() > threshold)
        .cloned()
        .collect();
    gap.sort_by(|a, b| a.diff.total_cmp(&b.diff).then_with(|| a.label.cmp(&b.label)));
    gap
}
