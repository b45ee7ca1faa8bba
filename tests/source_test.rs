//! Dataset aggregation behind the report data source.

use chrono::NaiveDate;
use reportq::model::job::DateWindow;
use reportq::source::{DataScope, ReportDataSource, StaticDataSource};

const DATASET: &str = r#"
[[municipalities]]
id = "mun-1"
name = "Riverside"

[[municipalities]]
id = "mun-2"
name = "Hillcrest"

[[collectors]]
id = "col-1"
name = "Ana"
municipality_id = "mun-1"

[[collectors]]
id = "col-2"
name = "Ben"
municipality_id = "mun-2"

[[requests]]
collector_id = "col-1"
municipality_id = "mun-1"
status = "completed"
requested_at = "2026-01-05T08:00:00"
completed_at = "2026-01-05T10:00:00"

[[requests]]
collector_id = "col-1"
municipality_id = "mun-1"
status = "completed"
requested_at = "2026-01-06T08:00:00"
completed_at = "2026-01-06T12:00:00"

[[requests]]
collector_id = "col-1"
municipality_id = "mun-1"
status = "cancelled"
requested_at = "2026-01-07T08:00:00"

[[requests]]
collector_id = "col-2"
municipality_id = "mun-2"
status = "in_progress"
requested_at = "2026-01-07T09:00:00"

[[requests]]
municipality_id = "mun-2"
status = "pending"
requested_at = "2026-01-07T09:30:00"

[[requests]]
collector_id = "col-2"
municipality_id = "mun-2"
status = "completed"
requested_at = "2026-02-10T08:00:00"
completed_at = "2026-02-10T09:00:00"

[[pickups]]
date = "2026-01-05"
municipality_id = "mun-1"
collector_id = "col-1"
waste_type = "organic"
weight_kg = 100.0

[[pickups]]
date = "2026-01-05"
municipality_id = "mun-1"
collector_id = "col-1"
waste_type = "organic"
weight_kg = 20.0

[[pickups]]
date = "2026-01-04"
municipality_id = "mun-2"
collector_id = "col-2"
waste_type = "glass"
weight_kg = 30.0
"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn january() -> DataScope {
    DataScope {
        municipality_id: None,
        collector_id: None,
        window: DateWindow {
            start: date(2026, 1, 1),
            end: date(2026, 1, 31),
        },
    }
}

fn source() -> StaticDataSource {
    StaticDataSource::from_toml_str(DATASET).unwrap()
}

#[tokio::test]
async fn performance_is_aggregated_per_collector() {
    let stats = source().collector_performance(&january()).await.unwrap();
    assert_eq!(stats.len(), 2);

    let ana = &stats[0];
    assert_eq!(ana.collector_id, "col-1");
    assert_eq!(ana.collector_name, "Ana");
    assert_eq!((ana.assigned, ana.completed, ana.pending), (3, 2, 0));
    assert_eq!(ana.avg_completion_hours, Some(3.0));

    let ben = &stats[1];
    assert_eq!(ben.collector_name, "Ben");
    assert_eq!((ben.assigned, ben.completed, ben.pending), (1, 0, 1));
    assert_eq!(ben.avg_completion_hours, None);
    assert_eq!(ben.completion_rate(), 0.0);
}

#[tokio::test]
async fn scope_filters_by_municipality_and_window() {
    let scope = DataScope {
        municipality_id: Some("mun-2".to_string()),
        ..january()
    };
    let stats = source().collector_performance(&scope).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].collector_id, "col-2");
    // The February request is outside the window.
    assert_eq!(stats[0].completed, 0);
}

#[tokio::test]
async fn collector_scope_excludes_unassigned_pickups() {
    let scope = DataScope {
        collector_id: Some("col-1".to_string()),
        ..january()
    };
    let volumes = source().collection_volumes(&scope).await.unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].municipality_id, "mun-1");
}

#[tokio::test]
async fn volumes_are_grouped_and_sorted() {
    let volumes = source().collection_volumes(&january()).await.unwrap();
    assert_eq!(volumes.len(), 2);

    assert_eq!(volumes[0].date, date(2026, 1, 4));
    assert_eq!(volumes[0].waste_type, "glass");

    assert_eq!(volumes[1].date, date(2026, 1, 5));
    assert_eq!(volumes[1].pickups, 2);
    assert_eq!(volumes[1].weight_kg, 120.0);
}

#[tokio::test]
async fn municipality_names_resolve() {
    let source = source();
    assert_eq!(
        source.municipality_name("mun-2").await.unwrap().as_deref(),
        Some("Hillcrest")
    );
    assert_eq!(source.municipality_name("mun-9").await.unwrap(), None);
}

#[test]
fn scope_matching_rules() {
    let scope = DataScope {
        municipality_id: Some("mun-1".to_string()),
        collector_id: Some("col-1".to_string()),
        ..january()
    };
    assert!(scope.matches("mun-1", Some("col-1")));
    assert!(!scope.matches("mun-1", Some("col-2")));
    assert!(!scope.matches("mun-1", None));
    assert!(!scope.matches("mun-2", Some("col-1")));
    assert!(january().matches("anything", None));
}

#[test]
fn malformed_dataset_is_a_config_error() {
    let result = StaticDataSource::from_toml_str("[[pickups]]\ndate = 5\n");
    assert!(matches!(result, Err(reportq::error::Error::Config(_))));
}

#[test]
fn missing_dataset_file_is_a_config_error() {
    let result = StaticDataSource::load(std::path::Path::new("/nonexistent/data.toml"));
    assert!(matches!(result, Err(reportq::error::Error::Config(_))));
}
