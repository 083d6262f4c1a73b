//! Core types for detection results.

use serde::{Deserialize, Serialize};

use crate::analysis::Span;
use crate::contract::AccessorScope;

/// Severity levels for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Rule names for the diagnostic families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationRule {
    #[serde(rename = "unhandled_exception")]
    UnhandledException,
    #[serde(rename = "unhandled_exception_in_expression_body")]
    UnhandledExceptionInExpressionBody,
    #[serde(rename = "base_member_violation")]
    BaseMemberViolation,
    #[serde(rename = "interface_violation")]
    InterfaceViolation,
    #[serde(rename = "event_handler_exception")]
    EventHandlerException,
}

impl ViolationRule {
    pub const ALL: [ViolationRule; 5] = [
        ViolationRule::UnhandledException,
        ViolationRule::UnhandledExceptionInExpressionBody,
        ViolationRule::BaseMemberViolation,
        ViolationRule::InterfaceViolation,
        ViolationRule::EventHandlerException,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationRule::UnhandledException => "unhandled_exception",
            ViolationRule::UnhandledExceptionInExpressionBody => {
                "unhandled_exception_in_expression_body"
            }
            ViolationRule::BaseMemberViolation => "base_member_violation",
            ViolationRule::InterfaceViolation => "interface_violation",
            ViolationRule::EventHandlerException => "event_handler_exception",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unhandled_exception" => Some(ViolationRule::UnhandledException),
            "unhandled_exception_in_expression_body" => {
                Some(ViolationRule::UnhandledExceptionInExpressionBody)
            }
            "base_member_violation" => Some(ViolationRule::BaseMemberViolation),
            "interface_violation" => Some(ViolationRule::InterfaceViolation),
            "event_handler_exception" => Some(ViolationRule::EventHandlerException),
            _ => None,
        }
    }

    /// One-line description used in SARIF rule metadata.
    pub fn description(&self) -> &'static str {
        match self {
            ViolationRule::UnhandledException => {
                "Exception can escape a member body without being caught or declared"
            }
            ViolationRule::UnhandledExceptionInExpressionBody => {
                "Exception can escape an expression-bodied member without being declared"
            }
            ViolationRule::BaseMemberViolation => {
                "Overriding member declares exceptions its base member does not"
            }
            ViolationRule::InterfaceViolation => {
                "Implementing member declares exceptions its interface member does not"
            }
            ViolationRule::EventHandlerException => {
                "Event handler declares exceptions that would surface in the event source"
            }
        }
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(
            self,
            ViolationRule::UnhandledException | ViolationRule::UnhandledExceptionInExpressionBody
        )
    }
}

impl std::fmt::Display for ViolationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extra data attached to a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationProperties {
    /// Fully qualified names of the exception types involved.
    pub declared_exception_types: Vec<String>,
    /// Whether a declare/ignore fix should emit only exception entries.
    pub is_short_comment_target: bool,
}

/// What a fix for this diagnostic edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixTarget {
    /// Start byte of the member declaration the fix documents.
    pub member_start: usize,
    pub scope: AccessorScope,
    /// The statement a handle fix wraps, when the body is a block.
    pub statement: Option<Span>,
}

/// A single detected issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: ViolationRule,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    #[serde(default)]
    pub properties: ViolationProperties,
    #[serde(skip)]
    pub target: Option<FixTarget>,
}

/// Results of running detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub violations: Vec<Violation>,
    /// Violations that were suppressed by inline comments
    #[serde(default)]
    pub suppressed: Vec<super::SuppressedViolation>,
    /// Number of files scanned
    pub scanned: usize,
}

impl DetectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suppressed violations.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }

    /// Violations reported for one file, in report order.
    pub fn violations_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.file == file)
    }

    /// Sort violations by file, position and rule.
    pub fn sort(&mut self) {
        self.violations.sort_by(|a, b| {
            (a.file.as_str(), a.line, a.column, a.rule).cmp(&(b.file.as_str(), b.line, b.column, b.rule))
        });
    }
}
