//! Inline suppression of violations via comments.
//!
//! Supports suppression comments like:
//! - `// throwcheck:ignore <rule> - <reason>`
//! - `// throwcheck:ignore-next-line <rule> - <reason>`
//! - `// throwcheck:ignore-file <rule> - <reason>`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Violation, ViolationRule};
use crate::analysis::SourceFile;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule to suppress (e.g., "unhandled_exception") or "*" for all
    pub rule: String,
    /// Human-readable reason
    pub reason: String,
    /// File containing the suppression
    pub file: String,
    /// Line number (0 for file-level)
    pub line: usize,
    /// How the suppression applies
    pub suppression_type: SuppressionType,
}

/// A violation that was suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedViolation {
    pub violation: Violation,
    pub suppression: Suppression,
}

/// File-level directives must appear within this many lines of the top.
const FILE_HEADER_LINES: usize = 10;

lazy_static::lazy_static! {
    /// Patterns for matching suppression comments.
    static ref SUPPRESSION_PATTERNS: Vec<Regex> = vec![
        // Line comment: // throwcheck:...
        Regex::new(r"//\s*throwcheck:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap(),
        // Block comment: /* throwcheck:... */
        Regex::new(r"/\*\s*throwcheck:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*?))?\s*\*/").unwrap(),
    ];
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(file_path: &str, content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1;
        let trimmed = line.trim();

        if in_header && !is_header_line(trimmed) {
            in_header = false;
        }

        for pattern in SUPPRESSION_PATTERNS.iter() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let directive = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let rule = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let reason = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            let suppression_type = match directive {
                "ignore-file" => {
                    if !in_header && line_number > FILE_HEADER_LINES {
                        continue;
                    }
                    SuppressionType::File
                }
                "ignore-next-line" => SuppressionType::NextLine,
                "ignore" => {
                    // Alone on its line it covers the next line, otherwise its own.
                    let alone = caps
                        .get(0)
                        .map(|m| line[..m.start()].trim().is_empty())
                        .unwrap_or(true);
                    if alone {
                        SuppressionType::NextLine
                    } else {
                        SuppressionType::Line
                    }
                }
                _ => continue,
            };

            suppressions.push(Suppression {
                rule: rule.to_string(),
                reason,
                file: file_path.to_string(),
                line: if suppression_type == SuppressionType::File {
                    0
                } else {
                    line_number
                },
                suppression_type,
            });
            break; // Only one suppression per line
        }
    }

    suppressions
}

/// Comments, blank lines, usings and preprocessor lines form the file header.
fn is_header_line(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("//")
        || line.starts_with("/*")
        || line.starts_with('*')
        || line.starts_with('#')
        || line.starts_with("using ")
}

/// Check if a violation matches a suppression.
pub fn matches_suppression(violation: &Violation, suppression: &Suppression) -> bool {
    if violation.file != suppression.file {
        return false;
    }

    if suppression.rule != "*" {
        match ViolationRule::parse(&suppression.rule) {
            Some(rule) if violation.rule != rule => return false,
            Some(_) => {}
            None => return false,
        }
    }

    match suppression.suppression_type {
        SuppressionType::File => true,
        SuppressionType::Line => violation.line == suppression.line,
        SuppressionType::NextLine => violation.line == suppression.line + 1,
    }
}

/// Separate violations into active and suppressed based on suppressions.
pub fn filter_suppressed(
    violations: Vec<Violation>,
    suppressions: &[Suppression],
) -> (Vec<Violation>, Vec<SuppressedViolation>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for violation in violations {
        match suppressions
            .iter()
            .find(|s| matches_suppression(&violation, s))
        {
            Some(suppression) => suppressed.push(SuppressedViolation {
                violation,
                suppression: suppression.clone(),
            }),
            None => active.push(violation),
        }
    }

    (active, suppressed)
}

/// Collect suppressions from all loaded files, keyed by display path.
pub fn collect_suppressions(files: &[SourceFile]) -> HashMap<String, Vec<Suppression>> {
    let mut result = HashMap::new();
    for file in files {
        let suppressions = parse_suppressions(&file.path, &file.source);
        if !suppressions.is_empty() {
            result.insert(file.path.clone(), suppressions);
        }
    }
    result
}
