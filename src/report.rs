//! Output formatting for throwcheck results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detect::{
    DetectionResult, Severity, SuppressedViolation, SuppressionType, Violation,
    ViolationProperties, ViolationRule,
};

/// Output format of the lint command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
    Sarif,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            "sarif" => Some(Format::Sarif),
            _ => None,
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    /// Config file used, empty when running on defaults.
    pub config: String,
    pub passed: bool,
    pub files_scanned: usize,
    pub violations: Vec<JsonViolation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedViolation>,
    pub suppressed_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct JsonViolation {
    pub rule: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub properties: ViolationProperties,
}

/// Suppressed violation with suppression info.
#[derive(Serialize, Deserialize)]
pub struct JsonSuppressedViolation {
    pub violation: JsonViolation,
    pub suppression: JsonSuppression,
}

/// Suppression directive info.
#[derive(Serialize, Deserialize)]
pub struct JsonSuppression {
    pub rule: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub file: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

/// Build the JSON report for a result.
pub fn json_report(path: &str, config_path: &str, result: &DetectionResult) -> JsonReport {
    let suppressed = result
        .suppressed
        .iter()
        .map(|sv| JsonSuppressedViolation {
            violation: violation_to_json(&sv.violation),
            suppression: JsonSuppression {
                rule: sv.suppression.rule.clone(),
                reason: sv.suppression.reason.clone(),
                file: sv.suppression.file.clone(),
                line: sv.suppression.line,
                suppression_type: format!("{:?}", sv.suppression.suppression_type).to_lowercase(),
            },
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.to_string(),
        passed: result.violations.is_empty(),
        files_scanned: result.scanned,
        violations: result.violations.iter().map(violation_to_json).collect(),
        suppressed,
        suppressed_count: result.suppressed_count(),
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: &str, result: &DetectionResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(path, config_path, result))?;
    println!("{}", json);
    Ok(())
}

fn violation_to_json(v: &Violation) -> JsonViolation {
    JsonViolation {
        rule: v.rule.as_str().to_string(),
        severity: v.severity.to_string(),
        file: v.file.clone(),
        line: v.line,
        column: v.column,
        message: v.message.clone(),
        properties: v.properties.clone(),
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "throwcheck";

#[derive(Serialize, Deserialize)]
pub struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize, Deserialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
    properties: ViolationProperties,
}

#[derive(Serialize, Deserialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
}

/// PascalCase rule name for SARIF metadata.
fn rule_name(rule: ViolationRule) -> String {
    rule.as_str()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn map_severity_to_level(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    let file = Path::new(file_path);
    if base_path.as_os_str().is_empty() || file.is_relative() {
        return file_path.replace('\\', "/");
    }
    file.strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.to_string())
}

/// Build the SARIF log for a result. Every rule is listed in the driver.
pub fn sarif_report(base_path: &Path, result: &DetectionResult) -> SarifReport {
    let rules = ViolationRule::ALL
        .iter()
        .map(|rule| SarifRule {
            id: rule.as_str().to_string(),
            name: rule_name(*rule),
            short_description: SarifMessage {
                text: rule.description().to_string(),
            },
            default_config: SarifRuleConfig {
                level: "warning".to_string(),
            },
        })
        .collect();

    let results = result
        .violations
        .iter()
        .map(|v| SarifResult {
            rule_id: v.rule.as_str().to_string(),
            level: map_severity_to_level(&v.severity).to_string(),
            message: SarifMessage {
                text: v.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&v.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: v.line.max(1),
                        start_column: v.column.max(1),
                    },
                },
            }],
            properties: v.properties.clone(),
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(base_path: &Path, result: &DetectionResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&sarif_report(base_path, result))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, config_path: &str, result: &DetectionResult, show_suppressed: bool) {
    // Header
    println!();
    print!("  ");
    print!("{}", "throwcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Config:   ".dimmed());
    if config_path.is_empty() {
        println!("{}", "(defaults)".dimmed());
    } else {
        println!("{}", config_path);
    }
    println!();

    if !result.violations.is_empty() {
        write_violations(&result.violations);
        println!();
    }

    if !result.suppressed.is_empty() {
        write_suppressed_summary(&result.suppressed, show_suppressed);
        println!();
    }

    write_final_status(result);
    println!();
}

fn write_violations(violations: &[Violation]) {
    println!("  {} ({}):", "Violations".bold(), violations.len());
    println!();

    let mut current_file: Option<&str> = None;
    for v in violations {
        if current_file != Some(v.file.as_str()) {
            println!("  {}", v.file.blue().bold());
            current_file = Some(v.file.as_str());
        }
        write_severity_tag(&v.severity);
        print!("{}", format!("{}:{}:{}", v.file, v.line, v.column).blue());
        println!("  {}", v.rule.as_str().dimmed());

        // Message on next line, indented
        println!("            {}", v.message);
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_final_status(result: &DetectionResult) {
    print!(
        "  {}",
        format!("Files: {}", result.scanned).dimmed()
    );
    print!("  Violations: {}", result.violations.len());
    if result.suppressed_count() > 0 {
        print!(
            "  {}",
            format!("({} suppressed)", result.suppressed_count()).dimmed()
        );
    }
    print!("  ");

    if result.violations.is_empty() {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

fn write_suppressed_summary(suppressed: &[SuppressedViolation], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for sv in suppressed {
        let v = &sv.violation;
        let s = &sv.suppression;

        print!("    {:<40}", v.rule.as_str().dimmed());
        print!("{}", v.file.blue());
        if matches!(s.suppression_type, SuppressionType::File) {
            print!("{}", ":* (file)".dimmed());
        } else if v.line > 0 {
            print!("{}", format!(":{}", v.line).dimmed());
        }
        println!();

        if !s.reason.is_empty() {
            println!("            {}", format!("reason: {:?}", s.reason).dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Severity;

    fn violation() -> Violation {
        Violation {
            rule: ViolationRule::UnhandledException,
            message: "Unhandled exception(s): IOException".to_string(),
            file: "src/Store.cs".to_string(),
            line: 12,
            column: 9,
            severity: Severity::Warning,
            properties: ViolationProperties {
                declared_exception_types: vec!["System.IO.IOException".to_string()],
                is_short_comment_target: false,
            },
            target: None,
        }
    }

    fn result() -> DetectionResult {
        DetectionResult {
            violations: vec![violation()],
            suppressed: Vec::new(),
            scanned: 3,
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("sarif"), Some(Format::Sarif));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_json_report_shape() {
        let report = json_report(".", "throwcheck.yaml", &result());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["files_scanned"], 3);
        assert_eq!(value["passed"], false);
        assert_eq!(value["violations"][0]["rule"], "unhandled_exception");
        assert_eq!(value["violations"][0]["column"], 9);
        assert_eq!(
            value["violations"][0]["properties"]["declared_exception_types"][0],
            "System.IO.IOException"
        );
        assert!(value.get("suppressed").is_none());
        assert_eq!(value["suppressed_count"], 0);
    }

    #[test]
    fn test_sarif_lists_all_rules() {
        let report = sarif_report(Path::new("/repo"), &result());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let rules = value["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[1]["name"], "UnhandledExceptionInExpressionBody");

        let region = &value["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 12);
        assert_eq!(region["startColumn"], 9);
        assert_eq!(
            value["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "src/Store.cs"
        );
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(make_relative_path("/repo/a/B.cs", Path::new("/repo")), "a/B.cs");
        assert_eq!(make_relative_path("a\\B.cs", Path::new("/repo")), "a/B.cs");
    }
}
