//! Exception contracts declared in documentation comments.
//!
//! A member's contract is the set of `<exception cref="...">` entries in its
//! `///` block, optionally scoped to one accessor and optionally marked
//! `Ignore.`. `<inheritdoc/>` pulls in the contracts of the base member and of
//! every implemented interface member.

mod doc;
mod extract;

use std::fmt;

pub use doc::{strip_doc_id, AccessorTag, DocComment, ExceptionEntry};
pub use extract::ContractExtractor;

/// Which half of a read/write member a declaration or query applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AccessorScope {
    #[default]
    None,
    Get,
    Set,
    /// Read-modify-write access: the union of Get and Set.
    Both,
}

impl AccessorScope {
    pub fn from_tag(tag: Option<AccessorTag>) -> Self {
        match tag {
            Some(AccessorTag::Get) => AccessorScope::Get,
            Some(AccessorTag::Set) => AccessorScope::Set,
            None => AccessorScope::None,
        }
    }

    /// Whether an entry tagged `tag` answers a query for this scope.
    pub fn admits(self, tag: Option<AccessorTag>) -> bool {
        match self {
            AccessorScope::None => true,
            AccessorScope::Get => tag == Some(AccessorTag::Get),
            AccessorScope::Set => tag == Some(AccessorTag::Set),
            AccessorScope::Both => tag.is_some(),
        }
    }

    /// The marker written in front of an entry body, if any.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            AccessorScope::Get => Some("Get."),
            AccessorScope::Set => Some("Set."),
            AccessorScope::None | AccessorScope::Both => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessorScope::None => "none",
            AccessorScope::Get => "get",
            AccessorScope::Set => "set",
            AccessorScope::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(AccessorScope::None),
            "get" => Some(AccessorScope::Get),
            "set" => Some(AccessorScope::Set),
            "both" => Some(AccessorScope::Both),
            _ => None,
        }
    }
}

impl fmt::Display for AccessorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One exception a member declares, or is asked to declare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionDeclaration {
    /// Fully qualified type name.
    pub name: String,
    /// Name as written in a `cref`, relative to the document's imports.
    pub short_name: String,
    pub text: String,
    pub ignore: bool,
    pub scope: AccessorScope,
}

impl ExceptionDeclaration {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            text: String::new(),
            ignore: false,
            scope: AccessorScope::None,
        }
    }

    pub fn ignored(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn scoped(mut self, scope: AccessorScope) -> Self {
        self.scope = scope;
        self
    }

    /// Whether an existing entry's `cref` names this exception.
    pub fn matches_cref(&self, cref: &str) -> bool {
        let cref = strip_doc_id(cref).trim();
        let cref = cref.strip_prefix("global::").unwrap_or(cref);
        cref == self.name || cref == self.short_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_admits() {
        assert!(AccessorScope::None.admits(None));
        assert!(AccessorScope::None.admits(Some(AccessorTag::Set)));
        assert!(!AccessorScope::Get.admits(None));
        assert!(AccessorScope::Get.admits(Some(AccessorTag::Get)));
        assert!(!AccessorScope::Get.admits(Some(AccessorTag::Set)));
        assert!(AccessorScope::Both.admits(Some(AccessorTag::Set)));
        assert!(!AccessorScope::Both.admits(None));
    }

    #[test]
    fn test_scope_parse_roundtrip() {
        for scope in [
            AccessorScope::None,
            AccessorScope::Get,
            AccessorScope::Set,
            AccessorScope::Both,
        ] {
            assert_eq!(AccessorScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(AccessorScope::parse("getter"), None);
    }

    #[test]
    fn test_matches_cref() {
        let decl = ExceptionDeclaration::new("System.IO.IOException", "IOException");
        assert!(decl.matches_cref("IOException"));
        assert!(decl.matches_cref("T:System.IO.IOException"));
        assert!(decl.matches_cref("global::System.IO.IOException"));
        assert!(!decl.matches_cref("Exception"));
    }
}
