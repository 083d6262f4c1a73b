//! Substitution contracts between a member and the members it overrides or
//! implements.
//!
//! An overriding or implementing member may not declare exceptions that its
//! base or interface counterpart does not. Excess types for one counterpart
//! family and accessor are joined into a single diagnostic at the member.

use crate::analysis::syntax::{MemberDecl, MemberKind};
use crate::contract::AccessorScope;
use crate::semantic::{MemberId, TypeId};

use super::{FileContext, FixTarget, Violation, ViolationRule};

/// Accessor scopes compared between `member` and `counterpart`.
fn compared_scopes(ctx: &FileContext<'_>, member: MemberId, counterpart: MemberId) -> Vec<AccessorScope> {
    let (m, c) = (ctx.model.member(member), ctx.model.member(counterpart));
    match m.kind {
        MemberKind::Method => vec![AccessorScope::None],
        MemberKind::Property | MemberKind::Indexer => {
            let mut scopes = Vec::new();
            if m.has_getter && c.has_getter {
                scopes.push(AccessorScope::Get);
            }
            if m.has_setter && c.has_setter {
                scopes.push(AccessorScope::Set);
            }
            scopes
        }
        _ => Vec::new(),
    }
}

/// Declared types of `member` not subsumed by anything `counterpart` declares.
fn excess(ctx: &FileContext<'_>, member: MemberId, counterpart: MemberId, scope: AccessorScope) -> Vec<TypeId> {
    let extractor = ctx.extractor();
    let own: Vec<TypeId> = extractor
        .declared_exceptions(member, true, scope)
        .into_iter()
        .collect();
    let own = ctx.noise.filter(ctx.model, own, |t| *t);
    let upstream = extractor.declared_exceptions(counterpart, true, scope);
    own.into_iter()
        .filter(|t| !ctx.model.is_covered(*t, &upstream))
        .collect()
}

fn message(
    ctx: &FileContext<'_>,
    rule: ViolationRule,
    member: &MemberDecl,
    counterpart: MemberId,
    scope: AccessorScope,
    types: &[TypeId],
) -> String {
    let upstream = ctx.model.member(counterpart);
    let owner = &ctx.model.ty(upstream.owner).name;
    let relation = if rule == ViolationRule::InterfaceViolation {
        "interface"
    } else {
        "base"
    };
    let types = ctx.short_names(types);

    match scope {
        AccessorScope::Get | AccessorScope::Set => {
            let accessor = if scope == AccessorScope::Get {
                "getter"
            } else {
                "setter"
            };
            format!(
                "Property {} {} throws exception(s) {} not declared in {} property {}.{}",
                member.name, accessor, types, relation, owner, upstream.name
            )
        }
        _ => format!(
            "Method {} throws exception(s) {} not declared in {} method {}.{}",
            member.name, types, relation, owner, upstream.name
        ),
    }
}

/// Report declared exceptions that exceed the base member or any implemented
/// interface member.
pub fn detect_substitution_violations(
    ctx: &FileContext<'_>,
    member: &MemberDecl,
    member_id: MemberId,
) -> Vec<Violation> {
    if member.kind == MemberKind::Constructor {
        return Vec::new();
    }

    let families = [
        (
            ViolationRule::BaseMemberViolation,
            ctx.model.base_member(member_id).into_iter().collect::<Vec<_>>(),
        ),
        (
            ViolationRule::InterfaceViolation,
            ctx.model.implemented_interface_members(member_id),
        ),
    ];

    let mut violations = Vec::new();
    for (rule, counterparts) in families {
        let Some(first) = counterparts.first().copied() else {
            continue;
        };

        for scope in [AccessorScope::None, AccessorScope::Get, AccessorScope::Set] {
            let mut types: Vec<TypeId> = Vec::new();
            for counterpart in &counterparts {
                if !compared_scopes(ctx, member_id, *counterpart).contains(&scope) {
                    continue;
                }
                for ty in excess(ctx, member_id, *counterpart, scope) {
                    if !types.contains(&ty) {
                        types.push(ty);
                    }
                }
            }
            if types.is_empty() {
                continue;
            }
            types.sort();

            let text = message(ctx, rule, member, first, scope, &types);
            let mut violation = ctx.violation(rule, member.report_span, text, &types);
            violation.target = Some(FixTarget {
                member_start: member.span.start_byte,
                scope,
                statement: None,
            });
            violations.push(violation);
        }
    }
    violations
}
