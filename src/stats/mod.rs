//! Stats module - permit type aggregation and dashboard views

mod aggregator;
mod views;

pub use aggregator::{Aggregator, ComparisonRow, Distribution, GroupComparison};
pub use views::{
    composition, cumulative_share, preference_gap, CompositionSlice, CumulativePoint,
    CumulativeShare, DashboardView, KpiSummary, ViewOptions, OTHERS_LABEL,
};
