//! The "handle" rewrite: catch the reported exceptions where they escape.

use crate::analysis::syntax::{Block, SourceFile, Stmt, StmtKind, TryStmt};
use crate::analysis::Span;

const INDENT_UNIT: &str = "    ";

/// Catch `types` around `statement`.
///
/// When the statement sits in the protected block of a `try`, the innermost
/// such `try` gains one catch clause per type. Otherwise the statement is
/// wrapped in a new `try` with those clauses. Returns the full new source.
pub fn handle(file: &SourceFile, body: &Block, statement: Span, types: &[String]) -> String {
    let mut source = file.source.clone();

    if let Some((try_span, try_stmt)) = enclosing_try(&body.stmts, &statement) {
        let indent = file.line_indent(try_span.start_byte);
        let clauses: String = types.iter().map(|t| catch_clause(t, indent)).collect();

        match try_stmt.catches.last() {
            // A general catch has to stay last.
            Some(last) if last.ty.is_none() => {
                // The insertion point already follows the line's indentation.
                let lead = format!("\n{}", indent);
                let first = clauses.strip_prefix(lead.as_str()).unwrap_or(&clauses);
                let text = format!("{}{}", first, lead);
                source.insert_str(last.span.start_byte, &text);
            }
            Some(last) => source.insert_str(last.span.end_byte, &clauses),
            None => source.insert_str(try_stmt.block.span.end_byte, &clauses),
        }
        return source;
    }

    let indent = file.line_indent(statement.start_byte);
    let inner = indent_continuation_lines(file.text(&statement));
    let mut text = format!(
        "try\n{indent}{{\n{indent}{unit}{inner}\n{indent}}}",
        indent = indent,
        unit = INDENT_UNIT,
        inner = inner
    );
    for ty in types {
        text.push_str(&catch_clause(ty, indent));
    }
    source.replace_range(statement.start_byte..statement.end_byte, &text);
    source
}

fn catch_clause(ty: &str, indent: &str) -> String {
    format!("\n{indent}catch ({ty})\n{indent}{{\n{indent}}}", indent = indent, ty = ty)
}

/// Shift every line after the first one indent unit to the right.
fn indent_continuation_lines(text: &str) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or("").to_string();
    for line in lines {
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str(INDENT_UNIT);
        }
        out.push_str(line);
    }
    out
}

/// The innermost `try` whose protected block contains `target`.
fn enclosing_try<'a>(stmts: &'a [Stmt], target: &Span) -> Option<(Span, &'a TryStmt)> {
    stmts.iter().find_map(|stmt| {
        if !stmt.span.contains(target) {
            return None;
        }
        match &stmt.kind {
            StmtKind::Try(try_stmt) if try_stmt.block.span.contains(target) => {
                enclosing_try(&try_stmt.block.stmts, target).or(Some((stmt.span, try_stmt)))
            }
            _ => child_statements(stmt)
                .into_iter()
                .find_map(|children| enclosing_try(children, target)),
        }
    })
}

fn child_statements(stmt: &Stmt) -> Vec<&[Stmt]> {
    match &stmt.kind {
        StmtKind::Block(block) => vec![&block.stmts],
        StmtKind::If {
            then, otherwise, ..
        } => {
            let mut children = vec![std::slice::from_ref(then.as_ref())];
            if let Some(otherwise) = otherwise {
                children.push(std::slice::from_ref(otherwise.as_ref()));
            }
            children
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Foreach { body, .. }
        | StmtKind::Using { body, .. }
        | StmtKind::Labeled(body) => vec![std::slice::from_ref(body.as_ref())],
        StmtKind::For { init, body, .. } => vec![init.as_slice(), std::slice::from_ref(body.as_ref())],
        StmtKind::Try(try_stmt) => {
            let mut children: Vec<&[Stmt]> = vec![&try_stmt.block.stmts];
            children.extend(try_stmt.catches.iter().map(|c| c.block.stmts.as_slice()));
            if let Some(finally) = &try_stmt.finally {
                children.push(&finally.stmts);
            }
            children
        }
        StmtKind::Switch { sections, .. } => sections.iter().map(|s| s.stmts.as_slice()).collect(),
        StmtKind::Other { stmts, .. } => vec![stmts.as_slice()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_source;
    use crate::analysis::syntax::Body;

    fn first_block(file: &SourceFile) -> &Block {
        match &file.types[0].members[0].body {
            Some(Body::Block(block)) => block,
            other => panic!("expected block body, got {:?}", other),
        }
    }

    fn span_of(file: &SourceFile, needle: &str) -> Span {
        fn find(stmts: &[Stmt], file: &SourceFile, needle: &str) -> Option<Span> {
            for stmt in stmts {
                for children in child_statements(stmt) {
                    if let Some(found) = find(children, file, needle) {
                        return Some(found);
                    }
                }
                if file.text(&stmt.span) == needle {
                    return Some(stmt.span);
                }
            }
            None
        }
        find(&first_block(file).stmts, file, needle).unwrap()
    }

    #[test]
    fn test_wraps_statement() {
        let src = "class C\n{\n    void M()\n    {\n        Load();\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "Load();");
        let out = handle(&file, first_block(&file), stmt, &["IOException".to_string(), "TimeoutException".to_string()]);
        assert_eq!(
            out,
            "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch (IOException)\n        {\n        }\n        catch (TimeoutException)\n        {\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_appends_catch_to_enclosing_try() {
        let src = "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch (FormatException)\n        {\n        }\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "Load();");
        let out = handle(&file, first_block(&file), stmt, &["IOException".to_string()]);
        assert_eq!(
            out,
            "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch (FormatException)\n        {\n        }\n        catch (IOException)\n        {\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_catch_goes_before_general_catch() {
        let src = "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch\n        {\n            throw;\n        }\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "Load();");
        let out = handle(&file, first_block(&file), stmt, &["IOException".to_string()]);
        assert_eq!(
            out,
            "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch (IOException)\n        {\n        }\n        catch\n        {\n            throw;\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_several_catches_before_general_catch() {
        let src = "class C\n{\n    void M()\n    {\n        try\n        {\n            Load();\n        }\n        catch\n        {\n        }\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "Load();");
        let out = handle(
            &file,
            first_block(&file),
            stmt,
            &["IOException".to_string(), "TimeoutException".to_string()],
        );
        assert!(out.contains(
            "        }\n        catch (IOException)\n        {\n        }\n        catch (TimeoutException)\n        {\n        }\n        catch\n        {\n        }\n"
        ));
    }

    #[test]
    fn test_rethrow_in_catch_is_wrapped() {
        let src = "class C\n{\n    void M()\n    {\n        try\n        {\n        }\n        catch (IOException)\n        {\n            throw;\n        }\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "throw;");
        let out = handle(&file, first_block(&file), stmt, &["IOException".to_string()]);
        assert!(out.contains(
            "        {\n            try\n            {\n                throw;\n            }\n            catch (IOException)\n            {\n            }\n        }"
        ));
    }

    #[test]
    fn test_multiline_statement_is_reindented() {
        let src = "class C\n{\n    void M()\n    {\n        Load(\n            1);\n    }\n}\n";
        let file = parse_source("C.cs", src).unwrap();
        let stmt = span_of(&file, "Load(\n            1);");
        let out = handle(&file, first_block(&file), stmt, &["IOException".to_string()]);
        assert!(out.contains("        {\n            Load(\n                1);\n        }"));
    }
}
