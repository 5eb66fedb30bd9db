use shard_finder::config::{AppConfig, ExportConfig, OutputFormat, ScanConfig};
use shard_finder::filter::FilterCriteria;

#[test]
fn defaults_and_validation_ok() {
    let cfg = AppConfig {
        scan: ScanConfig { workers: 6, limit: 10_000, ..ScanConfig::default() },
        criteria: FilterCriteria::default(),
        export: ExportConfig { out_path: Some("./tmp/out.csv".into()), format: Some(OutputFormat::Csv), ..ExportConfig::default() },
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn validation_catches_issues() {
    let bad = AppConfig {
        scan: ScanConfig { workers: 0, ..ScanConfig::default() },
        ..Default::default()
    };
    let msg = format!("{}", bad.validate().unwrap_err());
    assert!(msg.contains("missing required field") || msg.contains("out of range"));

    let no_output = AppConfig::default();
    let msg = format!("{}", no_output.validate().unwrap_err());
    assert!(msg.contains("missing required field"), "{msg}");
}

#[test]
fn criteria_problems_surface_through_app_config() {
    let cfg = AppConfig {
        criteria: FilterCriteria { required_materials: Vec::new(), ..Default::default() },
        export: ExportConfig { out_path: Some("out.json.gz".into()), format: Some(OutputFormat::Json), ..ExportConfig::default() },
        ..Default::default()
    };
    let msg = cfg.validate().unwrap_err().to_string();
    assert!(msg.contains("required_materials"), "{msg}");

    let cfg = AppConfig {
        criteria: FilterCriteria { min_arrival_distance: f64::NAN, ..Default::default() },
        export: ExportConfig { out_path: Some("out.csv".into()), format: Some(OutputFormat::Csv), ..ExportConfig::default() },
        ..Default::default()
    };
    assert!(cfg.validate().unwrap_err().to_string().contains("out of range"));
}

#[test]
fn config_round_trips_through_json_with_partial_fields() {
    let cfg: AppConfig = serde_json::from_str(
        r#"{"scan": {"workers": 4}, "criteria": {"max_surface_temperature": 180}, "export": {"out_path": "x.csv", "format": "csv"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.scan.workers, 4);
    assert_eq!(cfg.scan.queue_capacity, ScanConfig::default().queue_capacity);
    assert_eq!(cfg.criteria.max_surface_temperature, 180.0);
    assert_eq!(cfg.criteria.parent_label, "Planet");
    assert!(cfg.validate().is_ok());
}

#[test]
fn es_export_needs_url_not_path() {
    let mut cfg = AppConfig {
        export: ExportConfig { format: Some(OutputFormat::Es), ..ExportConfig::default() },
        ..Default::default()
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.export.es_url, "http://localhost:9200");
    assert_eq!(cfg.export.es_index, "candidates");

    cfg.export.es_url = " ".into();
    assert!(cfg.validate().unwrap_err().to_string().contains("missing required field"));
}
