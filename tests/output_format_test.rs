//! Tests for the JSON and SARIF report shapes on the fixture project.

use std::path::PathBuf;

use throwcheck::cli::collect_files;
use throwcheck::config::Config;
use throwcheck::detect::{DetectionResult, Runner};
use throwcheck::report::{json_report, sarif_report, JsonReport};

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("project")
}

fn run_project() -> DetectionResult {
    let root = project_path();
    let config = Config::default();
    let files = collect_files(&root, &config).expect("should collect fixtures");
    Runner::new(&root)
        .run(&files, &config)
        .expect("detection should succeed")
}

fn run_and_get_json() -> JsonReport {
    let root = project_path();
    json_report(&root.to_string_lossy(), "", &run_project())
}

#[test]
fn test_json_report_structure() {
    let report = run_and_get_json();

    assert!(!report.version.is_empty(), "version should not be empty");
    assert!(report.config.is_empty(), "defaults carry no config path");
    assert!(!report.passed);
    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.violations.len(), 8);
    assert_eq!(report.suppressed_count, 1);
    assert_eq!(report.suppressed.len(), 1);
}

#[test]
fn test_json_violations_format() {
    let report = run_and_get_json();

    let known_rules = [
        "unhandled_exception",
        "unhandled_exception_in_expression_body",
        "base_member_violation",
        "interface_violation",
        "event_handler_exception",
    ];
    for v in &report.violations {
        assert!(known_rules.contains(&v.rule.as_str()), "unknown rule: {}", v.rule);
        assert_eq!(v.severity, "warning");
        assert!(v.line > 0 && v.column > 0);
        assert!(!v.properties.declared_exception_types.is_empty());
    }

    let interface = report
        .violations
        .iter()
        .find(|v| v.rule == "interface_violation")
        .expect("interface violation present");
    assert_eq!(interface.file, "Storage.cs");
    assert_eq!(
        interface.properties.declared_exception_types,
        vec!["Demo.Storage.StorageException", "System.TimeoutException"]
    );
}

#[test]
fn test_json_suppressed_entry() {
    let report = run_and_get_json();
    let value = serde_json::to_value(&report).unwrap();

    let suppressed = &value["suppressed"][0];
    assert_eq!(suppressed["violation"]["line"], 35);
    assert_eq!(suppressed["suppression"]["rule"], "unhandled_exception");
    assert_eq!(suppressed["suppression"]["reason"], "startup only");
    assert_eq!(suppressed["suppression"]["type"], "nextline");
}

#[test]
fn test_json_serialization() {
    let report = run_and_get_json();

    let json = serde_json::to_string_pretty(&report).expect("should serialize to JSON");
    let parsed: JsonReport = serde_json::from_str(&json).expect("should deserialize from JSON");

    assert_eq!(parsed.passed, report.passed);
    assert_eq!(parsed.violations.len(), report.violations.len());
    assert_eq!(parsed.violations[0].message, report.violations[0].message);
}

#[test]
fn test_sarif_structure() {
    let root = project_path();
    let report = sarif_report(&root, &run_project());
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["version"], "2.1.0");
    assert!(value["$schema"].as_str().unwrap().contains("sarif-schema-2.1.0"));

    let run = &value["runs"][0];
    assert_eq!(run["tool"]["driver"]["name"], "throwcheck");
    let rule_ids: Vec<&str> = run["tool"]["driver"]["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        rule_ids,
        vec![
            "unhandled_exception",
            "unhandled_exception_in_expression_body",
            "base_member_violation",
            "interface_violation",
            "event_handler_exception",
        ]
    );

    let results = run["results"].as_array().unwrap();
    assert_eq!(results.len(), 8);
    for result in results {
        let location = &result["locations"][0]["physicalLocation"];
        let uri = location["artifactLocation"]["uri"].as_str().unwrap();
        assert!(uri.ends_with(".cs"));
        assert!(!uri.contains('\\'));
        assert!(location["region"]["startLine"].as_u64().unwrap() >= 1);
    }

    let handler = results
        .iter()
        .find(|r| r["ruleId"] == "event_handler_exception")
        .unwrap();
    assert_eq!(handler["locations"][0]["physicalLocation"]["region"]["startLine"], 23);
    assert_eq!(
        handler["properties"]["declared_exception_types"][0],
        "Demo.Storage.StorageException"
    );
}
