//! Source positions shared by the syntax tree and the diagnostics.

use std::fmt;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    /// Whether the byte offset lies inside this span.
    pub fn contains_byte(&self, offset: usize) -> bool {
        self.start_byte <= offset && offset < self.end_byte
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span {
            start_byte: start,
            end_byte: end,
            start_line: 1,
            start_col: start + 1,
            end_line: 1,
            end_col: end + 1,
        }
    }

    #[test]
    fn test_contains() {
        let outer = span(0, 20);
        assert!(outer.contains(&span(5, 10)));
        assert!(outer.contains(&span(0, 20)));
        assert!(!outer.contains(&span(15, 25)));
        assert!(outer.contains_byte(19));
        assert!(!outer.contains_byte(20));
    }

    #[test]
    fn test_display_uses_start_position() {
        let s = Span {
            start_byte: 10,
            end_byte: 12,
            start_line: 3,
            start_col: 9,
            end_line: 3,
            end_col: 11,
        };
        assert_eq!(s.to_string(), "3:9");
        assert_eq!(s.len(), 2);
    }
}
