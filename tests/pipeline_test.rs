//! End-to-end tests: load, filter, aggregate.

use permit_gap::config::DashboardConfig;
use permit_gap::data::{
    CsvDirectorySource, DataProcessor, DatasetCache, FilterSelection, LoaderError, MemorySource,
    MergedDataset, PermitLoader, LA_COUNTY_GEOID_PREFIX,
};
use permit_gap::stats::DashboardView;
use polars::prelude::*;
use std::fs;

const PERMITS: &str = "LA_PERMIT_DATA.PUBLIC.PERMIT_RECORDS";
const TRACTS: &str = "LA_PERMIT_DATA.PUBLIC.CENSUS_TRACTS";

fn loader() -> PermitLoader {
    PermitLoader::new(PERMITS.into(), TRACTS.into())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn census() -> DataFrame {
    df!(
        "CENSUS_TRACT" => [6_037_123_400i64, 6_037_555_501],
        "AMI_CATEGORY" => ["Low Income", "Above Moderate Income"]
    )
    .unwrap()
}

fn sorted_valuations(dataset: &MergedDataset) -> Vec<f64> {
    let mut values: Vec<f64> = dataset
        .frame
        .column(&dataset.valuation_col)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

#[test]
fn merges_permits_onto_tract_income_categories() {
    let permits = df!(
        "permit_type" => ["Electrical", "Roofing"],
        "Census_Tract" => ["1234.00", "1234.00"],
        "valuation" => ["$500", "$2,000"],
        "Issue_Date" => ["2023-01-05", "2023-02-10"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, census());

    let dataset = loader().load(&source).unwrap();

    assert_eq!(dataset.height(), 2);
    assert_eq!(dataset.date_col.as_deref(), Some("ISSUE_DATE"));
    assert_eq!(dataset.unparsed_tracts, 0);
    assert_eq!(sorted_valuations(&dataset), vec![500.0, 2000.0]);
    assert_eq!(
        DataProcessor::income_categories(&dataset),
        strings(&["Low Income"])
    );

    // Both rows sit in one tract, so compare the group with itself.
    let selection = FilterSelection {
        low_categories: strings(&["Low Income"]),
        high_categories: strings(&["Low Income"]),
        essential_types: strings(&["Electrical"]),
        max_cost: Some(1000.0),
    };
    let split = DataProcessor::split_groups(&dataset, &selection).unwrap();
    assert_eq!(split.low.height(), 1);

    let view = DashboardView::build(&split, &selection, &Default::default()).unwrap();
    assert_eq!(view.kpis.low_count, 1);
    assert_eq!(view.kpis.low_essential_share, 1.0);
    assert_eq!(view.comparison.len(), 1);
    assert_eq!(view.comparison[0].label, "Electrical");
    assert_eq!(view.comparison[0].low, 1.0);
    assert!(view.gap.is_empty());
}

#[test]
fn missing_valuation_values_every_permit_at_zero() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical", "Pool"],
        "CENSUS_TRACT" => ["1234.00", "5555.01"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, census());

    let dataset = loader().load(&source).unwrap();
    assert_eq!(sorted_valuations(&dataset), vec![0.0, 0.0]);
    assert_eq!(DataProcessor::max_valuation(&dataset), 0.0);

    let selection = DataProcessor::default_selection(&dataset, &[]);
    assert_eq!(selection.max_cost, None);

    // A zero ceiling still keeps zero-valued rows.
    let capped = FilterSelection {
        max_cost: Some(0.0),
        ..selection
    };
    let split = DataProcessor::split_groups(&dataset, &capped).unwrap();
    assert_eq!(split.low.height(), 1);
    assert_eq!(split.high.height(), 1);
}

#[test]
fn missing_census_tract_column_is_reported() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical"],
        "VALUATION" => ["$500"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, census());

    let err = loader().load(&source).unwrap_err();
    assert!(matches!(err, LoaderError::MissingColumn { .. }));
    assert_eq!(err.to_string(), "Missing CENSUS_TRACT Column");
}

#[test]
fn missing_table_surfaces_the_fetch_reason() {
    let source = MemorySource::new().with_table(TRACTS, census());
    let err = loader().load(&source).unwrap_err();
    assert!(matches!(err, LoaderError::Fetch { .. }));
    assert!(err.to_string().contains(PERMITS));
}

#[test]
fn census_table_keyed_by_geoid() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical"],
        "CENSUS_TRACT" => ["1234"]
    )
    .unwrap();
    let tracts = df!(
        "geoid" => [6_037_123_400i64],
        "ami_category" => ["Low Income"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, tracts);

    let dataset = loader().load(&source).unwrap();
    assert_eq!(dataset.height(), 1);
}

#[test]
fn unparseable_tracts_join_on_the_county_sentinel() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical", "Fence"],
        "CENSUS_TRACT" => ["1234.00", "n/a"]
    )
    .unwrap();
    let tracts = df!(
        "CENSUS_TRACT" => [6_037_123_400i64, LA_COUNTY_GEOID_PREFIX],
        "AMI_CATEGORY" => ["Low Income", "Unknown"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, tracts);

    let dataset = loader().load(&source).unwrap();
    assert_eq!(dataset.unparsed_tracts, 1);
    assert_eq!(dataset.height(), 2);
    assert_eq!(
        DataProcessor::income_categories(&dataset),
        strings(&["Low Income", "Unknown"])
    );
}

#[test]
fn oversized_tract_number_falls_back_to_the_sentinel() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical", "Fence"],
        "CENSUS_TRACT" => ["1234.00", "1e20"]
    )
    .unwrap();
    let tracts = df!(
        "CENSUS_TRACT" => [6_037_123_400i64, LA_COUNTY_GEOID_PREFIX],
        "AMI_CATEGORY" => ["Low Income", "Unknown"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, tracts);

    let dataset = loader().load(&source).unwrap();
    assert_eq!(dataset.unparsed_tracts, 1);
    assert_eq!(dataset.height(), 2);
    assert_eq!(
        DataProcessor::income_categories(&dataset),
        strings(&["Low Income", "Unknown"])
    );
}

#[test]
fn null_labels_survive_the_join_as_nan() {
    let permits = df!(
        "PERMIT_TYPE" => [Some("Electrical"), None],
        "CENSUS_TRACT" => ["1234.00", "1234.00"]
    )
    .unwrap();
    let tracts = df!(
        "CENSUS_TRACT" => [6_037_123_400i64],
        "AMI_CATEGORY" => [None::<&str>]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, tracts);

    let dataset = loader().load(&source).unwrap();
    assert_eq!(dataset.height(), 2);
    assert_eq!(
        DataProcessor::permit_types(&dataset),
        strings(&["Electrical", "nan"])
    );
    assert_eq!(DataProcessor::income_categories(&dataset), strings(&["nan"]));

    let categories = dataset.frame.column("AMI_CATEGORY").unwrap();
    assert_eq!(categories.null_count(), 0);
}

#[test]
fn empty_high_group_is_a_warning() {
    let permits = df!(
        "PERMIT_TYPE" => ["Electrical"],
        "CENSUS_TRACT" => ["1234.00"]
    )
    .unwrap();
    let source = MemorySource::new()
        .with_table(PERMITS, permits)
        .with_table(TRACTS, census());
    let dataset = loader().load(&source).unwrap();

    let selection = DataProcessor::default_selection(&dataset, &[]);
    let err = DataProcessor::split_groups(&dataset, &selection).unwrap_err();
    assert!(err.is_warning());
    assert!(err.to_string().starts_with("Filters result in empty dataset"));
}

#[test]
fn csv_directory_feeds_the_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("PERMIT_RECORDS.csv"),
        "PERMIT_TYPE,CENSUS_TRACT,VALUATION,ISSUE_DATE\n\
         Electrical,1234.00,\"$500\",2023-01-05\n\
         Plumbing,1234.00,\"$1,500\",2023-01-06\n\
         Pool,5555.01,\"$40,000\",2023-02-01\n\
         Electrical,5555.01,\"$900\",2023-02-02\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("census_tracts.csv"),
        "CENSUS_TRACT,AMI_CATEGORY\n\
         6037123400,Low Income\n\
         6037555501,Above Moderate Income\n",
    )
    .unwrap();

    let config = DashboardConfig {
        data_dir: dir.path().to_path_buf(),
        ..DashboardConfig::default()
    };
    let mut cache = DatasetCache::new(CsvDirectorySource::new(dir.path()), config.loader())
        .with_ttl(config.cache_ttl());

    let dataset = cache.get_or_load().unwrap();
    assert_eq!(dataset.height(), 4);
    assert_eq!(DataProcessor::max_valuation(&dataset), 40_000.0);

    let selection = DataProcessor::default_selection(&dataset, &config.essential_types);
    assert_eq!(selection.low_categories, strings(&["Low Income"]));
    assert_eq!(selection.high_categories, strings(&["Above Moderate Income"]));
    assert_eq!(selection.essential_types, strings(&["Electrical", "Plumbing"]));
    assert_eq!(selection.max_cost, Some(40_000.0));

    let split = DataProcessor::split_groups(&dataset, &selection).unwrap();
    let view = DashboardView::build(&split, &selection, &config.view).unwrap();
    assert_eq!(view.kpis.low_count, 2);
    assert_eq!(view.kpis.high_count, 2);
    assert_eq!(view.kpis.low_essential_share, 1.0);
    assert_eq!(view.kpis.high_essential_share, 0.5);
    assert_eq!(view.cumulative.essential_count, 2);

    let gap: Vec<&str> = view.gap.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(gap, vec!["Plumbing", "Pool"]);

    // Second access is served from the cache.
    let again = cache.get_or_load().unwrap();
    assert!(std::sync::Arc::ptr_eq(&dataset, &again));
}
