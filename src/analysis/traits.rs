//! Core traits for language front ends.

use std::path::Path;

use super::SourceFile;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept separate from `SourceFile` so the raw tree can be inspected by
/// tests without lowering.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Language front end trait.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create parsers as
/// needed.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier.
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors are still returned as a valid tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Lower a parsed file into the closed syntax tree.
    fn lower(&self, parsed: &ParsedFile) -> SourceFile;

    /// Parse and lower in one step.
    fn load(&self, path: &Path, source: &[u8]) -> anyhow::Result<SourceFile> {
        let parsed = self.parse(path, source)?;
        Ok(self.lower(&parsed))
    }

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
