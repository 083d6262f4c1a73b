//! Throwcheck - checked-exception discipline for C#.
//!
//! Throwcheck treats `<exception cref="...">` documentation comments as a
//! contract. It reports exceptions that can escape a member without being
//! caught or declared, and declarations that break substitutability between
//! a member and the base or interface member it stands in for.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `analysis`: C# front end lowering tree-sitter CSTs into a closed syntax tree
//! - `semantic`: Symbol table, type-name resolution and subsumption
//! - `contract`: `<exception>` doc parsing and declared-exception extraction
//! - `detect`: Exception flow, substitution and event-handler checks
//! - `fix`: Declare, ignore and handle fixes
//! - `config`: YAML configuration schema
//! - `report`: Output formatting (pretty, JSON, SARIF)

pub mod analysis;
pub mod cli;
pub mod config;
pub mod contract;
pub mod detect;
pub mod error;
pub mod fix;
pub mod report;
pub mod semantic;

pub use analysis::{parse_source, AnalysisContext, SourceFile};
pub use config::Config;
pub use detect::{DetectionResult, Runner, Violation, ViolationRule};
pub use error::ThrowcheckError;
pub use fix::{FixAction, Fixer};
pub use semantic::SemanticModel;
