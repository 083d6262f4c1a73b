//! Comment Synthesizer: merges requested exception entries into a `///`
//! documentation block.
//!
//! Existing entries that already name a requested exception (same type, same
//! accessor scope) are never duplicated; at most they gain an `Ignore.`
//! marker. Everything else in the block is preserved byte for byte, so
//! applying the same additions twice yields the same text as applying them
//! once.

use crate::analysis::syntax::{MemberDecl, MemberKind};
use crate::contract::{AccessorScope, DocComment, ExceptionDeclaration, ExceptionEntry};

/// The declaration a comment is written for.
#[derive(Debug, Clone, Default)]
pub struct CommentTarget {
    /// Leading whitespace reproduced on every emitted line.
    pub indent: String,
    /// Summary text of a new block.
    pub title: String,
    pub params: Vec<String>,
    /// Emit `<returns></returns>` in a new block.
    pub returns_value: bool,
    /// Entries carry accessor tags.
    pub scoped: bool,
}

impl CommentTarget {
    pub fn for_member(member: &MemberDecl) -> Self {
        let title = if member.kind == MemberKind::Constructor {
            "ctor".to_string()
        } else {
            member.name.clone()
        };
        let callable = member.kind.is_callable();
        Self {
            indent: member.indent.clone(),
            title,
            params: if callable {
                member.params.iter().map(|p| p.name.clone()).collect()
            } else {
                Vec::new()
            },
            returns_value: matches!(member.kind, MemberKind::Method | MemberKind::Operator)
                && !member.returns_void(),
            scoped: member.kind.has_accessors(),
        }
    }
}

const IGNORE_MARKER: &str = "Ignore.";

/// Merge `additions` into `existing` (a raw `///` block, or `None` when the
/// declaration has none) and return the new block without a trailing newline.
///
/// With `short_form` a new block holds only the exception entries.
pub fn synthesize(
    existing: Option<&str>,
    additions: &[ExceptionDeclaration],
    target: &CommentTarget,
    short_form: bool,
) -> String {
    let mut pending: Vec<&ExceptionDeclaration> = additions.iter().collect();

    let Some(existing) = existing else {
        return new_block(&pending, target, short_form);
    };

    let mut block = existing.trim_end().to_string();
    let doc = DocComment::parse(&block);

    // Back to front so earlier offsets stay valid.
    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    for entry in doc.entries.iter().rev() {
        let scope = if target.scoped {
            AccessorScope::from_tag(entry.accessor)
        } else {
            AccessorScope::None
        };
        let Some(idx) = pending
            .iter()
            .position(|a| a.scope == scope && a.matches_cref(&entry.cref))
        else {
            continue;
        };
        let addition = pending.remove(idx);
        if addition.ignore && !entry.ignored {
            edits.push(ignore_edit(&block, entry));
        }
    }
    for (start, end, text) in edits {
        block.replace_range(start..end, &text);
    }

    for addition in pending {
        block.push('\n');
        block.push_str(&entry_line(addition, &target.indent));
    }
    block
}

/// The replacement that marks `entry` as ignored.
fn ignore_edit(block: &str, entry: &ExceptionEntry) -> (usize, usize, String) {
    let Some(body) = &entry.body else {
        // `<exception cref="X"/>` becomes `<exception cref="X">Ignore.</exception>`.
        let end = entry.span.end;
        let start = block[..end.saturating_sub(2)].trim_end().len();
        return (start, end, format!(">{}</exception>", IGNORE_MARKER));
    };

    let at = entry.marker_at;
    let text = if entry.accessor.is_some() {
        format!(" {}", IGNORE_MARKER)
    } else if block[at..body.end].trim().is_empty() {
        IGNORE_MARKER.to_string()
    } else {
        format!("{} ", IGNORE_MARKER)
    };
    (at, at, text)
}

fn entry_line(decl: &ExceptionDeclaration, indent: &str) -> String {
    let accessor = decl.scope.marker().unwrap_or("");
    let ignore = if decl.ignore { IGNORE_MARKER } else { "" };
    let space = if !accessor.is_empty() && !ignore.is_empty() {
        " "
    } else {
        ""
    };
    format!(
        "{}/// <exception cref=\"{}\">{}{}{}</exception>",
        indent, decl.short_name, accessor, space, ignore
    )
}

fn new_block(additions: &[&ExceptionDeclaration], target: &CommentTarget, short_form: bool) -> String {
    let indent = &target.indent;
    let mut lines = Vec::new();

    if !short_form {
        lines.push(format!("{}/// <summary>", indent));
        lines.push(format!("{}/// {}", indent, target.title));
        lines.push(format!("{}/// </summary>", indent));
        for param in &target.params {
            lines.push(format!("{}/// <param name=\"{}\"></param>", indent, param));
        }
        if target.returns_value {
            lines.push(format!("{}/// <returns></returns>", indent));
        }
    }
    lines.extend(additions.iter().map(|a| entry_line(a, indent)));
    lines.join("\n")
}
