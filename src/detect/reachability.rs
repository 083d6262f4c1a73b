//! Conservative end-point reachability for statements.
//!
//! `can_complete` answers whether control can fall off the end of a
//! statement. It only proves non-completion for jumps, constant conditions and
//! constructs whose every branch exits, and otherwise assumes completion.

use crate::analysis::syntax::{Block, Stmt, StmtKind};

/// Whether control can reach the point just after `stmt`.
pub fn can_complete(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_)
        | StmtKind::Throw(_)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Goto
        | StmtKind::YieldBreak => false,
        StmtKind::Block(block) => block_completes(&block.stmts),
        StmtKind::If {
            cond,
            then,
            otherwise,
        } => match cond.constant_bool() {
            Some(true) => can_complete(then),
            Some(false) => otherwise.as_deref().map_or(true, can_complete),
            None => can_complete(then) || otherwise.as_deref().map_or(true, can_complete),
        },
        StmtKind::While { cond, body } => {
            cond.constant_bool() != Some(true) || contains_break(body)
        }
        StmtKind::DoWhile { body, cond } => {
            if cond.constant_bool() == Some(true) {
                contains_break(body)
            } else {
                can_complete(body) || contains_break(body) || contains_continue(body)
            }
        }
        StmtKind::For { cond, body, .. } => {
            let infinite = cond.as_ref().map_or(true, |c| c.constant_bool() == Some(true));
            !infinite || contains_break(body)
        }
        StmtKind::Switch { sections, .. } => {
            let has_default = sections.iter().any(|s| s.has_default);
            !has_default
                || sections
                    .iter()
                    .any(|s| block_completes(&s.stmts) || s.stmts.iter().any(contains_break))
        }
        StmtKind::Try(try_stmt) => {
            if let Some(finally) = &try_stmt.finally {
                if !block_completes(&finally.stmts) {
                    return false;
                }
            }
            block_completes(&try_stmt.block.stmts)
                || try_stmt
                    .catches
                    .iter()
                    .any(|c| block_completes(&c.block.stmts))
        }
        StmtKind::Using { body, .. } | StmtKind::Labeled(body) => can_complete(body),
        StmtKind::Other { stmts, .. } => block_completes(stmts),
        StmtKind::Expr(_)
        | StmtKind::Local { .. }
        | StmtKind::Foreach { .. }
        | StmtKind::Yield(_)
        | StmtKind::LocalFunction { .. }
        | StmtKind::Empty => true,
    }
}

/// Whether control can fall off the end of a statement list.
pub fn block_completes(stmts: &[Stmt]) -> bool {
    stmts.iter().all(can_complete)
}

/// A `break` that exits the enclosing loop or switch of `stmt`.
fn contains_break(stmt: &Stmt) -> bool {
    contains_jump(stmt, &|k| matches!(k, StmtKind::Break))
}

fn contains_continue(stmt: &Stmt) -> bool {
    contains_jump(stmt, &|k| matches!(k, StmtKind::Continue))
}

fn contains_jump(stmt: &Stmt, is_jump: &dyn Fn(&StmtKind) -> bool) -> bool {
    if is_jump(&stmt.kind) {
        return true;
    }
    let any = |stmts: &[Stmt]| stmts.iter().any(|s| contains_jump(s, is_jump));
    match &stmt.kind {
        // Jumps inside nested loops and switches target those.
        StmtKind::While { .. }
        | StmtKind::DoWhile { .. }
        | StmtKind::For { .. }
        | StmtKind::Foreach { .. }
        | StmtKind::Switch { .. }
        | StmtKind::LocalFunction { .. } => false,
        StmtKind::Block(block) => any(&block.stmts),
        StmtKind::If {
            then, otherwise, ..
        } => {
            contains_jump(then, is_jump)
                || otherwise
                    .as_deref()
                    .map_or(false, |s| contains_jump(s, is_jump))
        }
        StmtKind::Try(try_stmt) => {
            any(&try_stmt.block.stmts)
                || try_stmt.catches.iter().any(|c| any(&c.block.stmts))
                || try_stmt.finally.as_ref().map_or(false, |f| any(&f.stmts))
        }
        StmtKind::Using { body, .. } | StmtKind::Labeled(body) => contains_jump(body, is_jump),
        StmtKind::Other { stmts, .. } => any(stmts),
        _ => false,
    }
}

/// Whether a catch block contains a bare `throw;` that rethrows its exception.
///
/// Rethrows inside nested catch clauses, lambdas and local functions belong
/// to those and are not counted.
pub fn contains_rethrow(block: &Block) -> bool {
    block.stmts.iter().any(stmt_rethrows)
}

fn stmt_rethrows(stmt: &Stmt) -> bool {
    let any = |stmts: &[Stmt]| stmts.iter().any(stmt_rethrows);
    match &stmt.kind {
        StmtKind::Throw(None) => true,
        StmtKind::Block(block) => any(&block.stmts),
        StmtKind::If {
            then, otherwise, ..
        } => stmt_rethrows(then) || otherwise.as_deref().map_or(false, stmt_rethrows),
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::Foreach { body, .. }
        | StmtKind::Using { body, .. }
        | StmtKind::Labeled(body) => stmt_rethrows(body),
        StmtKind::Try(try_stmt) => {
            any(&try_stmt.block.stmts) || try_stmt.finally.as_ref().map_or(false, |f| any(&f.stmts))
        }
        StmtKind::Switch { sections, .. } => sections.iter().any(|s| any(&s.stmts)),
        StmtKind::Other { stmts, .. } => any(stmts),
        _ => false,
    }
}
