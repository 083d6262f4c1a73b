//! AST-backed C# front end.
//!
//! This module turns C# source into a closed syntax tree that the checks
//! consume:
//! - Type and member declarations with their `///` documentation blocks
//! - Statements and expressions of executable bodies
//! - Source spans for every node that can carry a diagnostic
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source Files    │────▶│ CSharp       │────▶│ SourceFile    │
//! └─────────────────┘     │ Analyzer     │     │ (Types,       │
//!                         └──────────────┘     │  Members, AST)│
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ Detection    │◀────│ Semantic      │
//!                         │ Rules        │     │ Model         │
//!                         └──────────────┘     └───────────────┘
//! ```

mod context;
mod csharp;
mod facts;
pub mod syntax;
mod traits;

pub use context::AnalysisContext;
pub use csharp::{parse_source, CSharpAnalyzer};
pub use facts::Span;
pub use syntax::SourceFile;
pub use traits::{LanguageAnalyzer, ParsedFile};
