//! Fixes for reported diagnostics.
//!
//! Each fix produces the full new text of exactly one document:
//! - `declare` documents the exceptions with `<exception>` entries
//! - `ignore` does the same, marking the entries `Ignore.`
//! - `handle` catches the exceptions around the offending statement

mod handle;
mod synthesize;

pub use handle::handle;
pub use synthesize::{synthesize, CommentTarget};

use std::collections::HashSet;

use tracing::debug;

use crate::analysis::parse_source;
use crate::analysis::syntax::{Body, MemberDecl, SourceFile, TypeDecl};
use crate::config::Config;
use crate::contract::ExceptionDeclaration;
use crate::detect::{executable_bodies, Runner, Violation, ViolationRule};
use crate::error::ThrowcheckError;

/// Upper bound on edits made by one `fix --all` run on a file.
pub const MAX_FIX_ITERATIONS: usize = 100;

/// A fix that can be applied to a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    Declare,
    Ignore,
    Handle,
}

impl FixAction {
    pub const ALL: [FixAction; 3] = [FixAction::Declare, FixAction::Ignore, FixAction::Handle];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixAction::Declare => "declare",
            FixAction::Ignore => "ignore",
            FixAction::Handle => "handle",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ThrowcheckError> {
        match s.to_ascii_lowercase().as_str() {
            "declare" => Ok(FixAction::Declare),
            "ignore" => Ok(FixAction::Ignore),
            "handle" => Ok(FixAction::Handle),
            _ => Err(ThrowcheckError::UnknownFixAction(s.to_string())),
        }
    }

    /// Whether this fix is offered for a diagnostic.
    pub fn applies_to(&self, violation: &Violation) -> bool {
        let Some(target) = &violation.target else {
            return false;
        };
        match self {
            FixAction::Declare => violation.rule.is_unhandled(),
            FixAction::Ignore => violation.rule != ViolationRule::EventHandlerException,
            FixAction::Handle => {
                violation.rule == ViolationRule::UnhandledException && target.statement.is_some()
            }
        }
    }
}

impl std::fmt::Display for FixAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name to write for `full_name` in code that belongs to `owner`.
///
/// The simple name is used when the namespace is global, imported, or
/// encloses the owner's namespace.
pub fn display_name(full_name: &str, owner: &TypeDecl) -> String {
    let Some((namespace, simple)) = full_name.rsplit_once('.') else {
        return full_name.to_string();
    };
    let imported = owner.usings.iter().any(|u| u == namespace);
    let enclosing = owner.namespace == namespace
        || owner
            .namespace
            .strip_prefix(namespace)
            .map_or(false, |rest| rest.starts_with('.'));
    if imported || enclosing {
        simple.to_string()
    } else {
        full_name.to_string()
    }
}

/// Apply `action` to `diagnostic` and return the new text of `file`.
pub fn apply(
    file: &SourceFile,
    diagnostic: &Violation,
    action: FixAction,
    config: &Config,
) -> Result<String, ThrowcheckError> {
    let unavailable = || ThrowcheckError::FixUnavailable {
        action: action.to_string(),
        rule: diagnostic.rule.to_string(),
    };
    if !action.applies_to(diagnostic) {
        return Err(unavailable());
    }
    let target = diagnostic.target.ok_or_else(unavailable)?;
    let (owner, member) = file
        .member_at(target.member_start)
        .ok_or_else(|| ThrowcheckError::TargetNotFound(file.path.clone()))?;

    let names: Vec<String> = diagnostic
        .properties
        .declared_exception_types
        .iter()
        .map(|full| display_name(full, owner))
        .collect();

    match action {
        FixAction::Handle => {
            let statement = target.statement.ok_or_else(unavailable)?;
            let block = executable_bodies(member)
                .into_iter()
                .find_map(|b| match b.body {
                    Body::Block(block) if block.span.contains(&statement) => Some(block),
                    _ => None,
                })
                .ok_or_else(unavailable)?;
            Ok(handle(file, block, statement, &names))
        }
        FixAction::Declare | FixAction::Ignore => {
            let additions: Vec<ExceptionDeclaration> = diagnostic
                .properties
                .declared_exception_types
                .iter()
                .zip(&names)
                .map(|(full, short)| {
                    ExceptionDeclaration::new(full.as_str(), short.as_str())
                        .ignored(action == FixAction::Ignore)
                        .scoped(target.scope)
                })
                .collect();
            let short_form = config.short_comments.for_visibility(member.visibility);
            Ok(document(file, member, &additions, short_form))
        }
    }
}

/// Splice the synthesized block for `member` into the file.
fn document(
    file: &SourceFile,
    member: &MemberDecl,
    additions: &[ExceptionDeclaration],
    short_form: bool,
) -> String {
    let target = CommentTarget::for_member(member);
    let existing = member.doc.as_ref().map(|d| d.text.as_str());
    let block = synthesize(existing, additions, &target, short_form);

    let mut source = file.source.clone();
    match &member.doc {
        Some(doc) => source.replace_range(doc.start_byte..doc.end_byte, &block),
        None => {
            // Above the declaration, attributes included.
            let at = file.line_start(member.span.start_byte);
            source.insert_str(at, &format!("{}\n", block));
        }
    }
    source
}

/// Runs fixes on one file against the rest of the compilation.
pub struct Fixer<'a> {
    config: &'a Config,
    /// Every other source in the compilation, for symbol resolution.
    context: Vec<SourceFile>,
}

impl<'a> Fixer<'a> {
    pub fn new(config: &'a Config, context: Vec<SourceFile>) -> Self {
        Self { config, context }
    }

    /// Diagnostics reported for `file`.
    pub fn diagnostics(&self, file: &SourceFile) -> Vec<Violation> {
        let mut sources = self.context.clone();
        sources.push(file.clone());
        let result = Runner::new(".").run_sources(&sources, self.config);
        result.violations_in(&file.path).cloned().collect()
    }

    /// Apply `action` to the first diagnostic on `line` that accepts it.
    pub fn fix_line(
        &self,
        file: &SourceFile,
        line: usize,
        action: FixAction,
    ) -> Result<String, ThrowcheckError> {
        let on_line: Vec<Violation> = self
            .diagnostics(file)
            .into_iter()
            .filter(|v| v.line == line)
            .collect();
        let Some(first) = on_line.first() else {
            return Err(ThrowcheckError::NoDiagnostic {
                file: file.path.clone(),
                line,
            });
        };
        let diagnostic = on_line.iter().find(|v| action.applies_to(v)).unwrap_or(first);
        apply(file, diagnostic, action, self.config)
    }

    /// Apply `action` until no diagnostic accepts it. Diagnostics whose fix
    /// leaves the text unchanged are skipped for the rest of the run.
    /// Returns the final text and the number of edits.
    pub fn fix_all(
        &self,
        file: &SourceFile,
        action: FixAction,
    ) -> Result<(String, usize), ThrowcheckError> {
        let mut current = file.clone();
        let mut edits = 0;
        // Only unchanged text keeps these positions valid; reset on every edit.
        let mut unchanged: HashSet<(usize, usize, ViolationRule)> = HashSet::new();

        while edits < MAX_FIX_ITERATIONS {
            let diagnostics = self.diagnostics(&current);
            let Some(diagnostic) = diagnostics.iter().find(|v| {
                action.applies_to(v) && !unchanged.contains(&(v.line, v.column, v.rule))
            }) else {
                break;
            };
            let text = apply(&current, diagnostic, action, self.config)?;
            if text == current.source {
                debug!(file = %current.path, line = diagnostic.line, "fix made no change");
                unchanged.insert((diagnostic.line, diagnostic.column, diagnostic.rule));
                continue;
            }
            edits += 1;
            unchanged.clear();
            current = parse_source(&current.path, &text).map_err(|e| ThrowcheckError::Parse {
                path: current.path.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok((current.source, edits))
    }
}
