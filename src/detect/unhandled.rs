//! Unhandled and undeclared exceptions in member bodies.

use crate::analysis::syntax::{AccessorKind, Body, MemberDecl, MemberKind};
use crate::contract::AccessorScope;
use crate::semantic::MemberId;

use super::{group_by_location, FileContext, FixTarget, FlowResult, Violation, ViolationRule};

/// One body of a member together with the accessor it implements.
pub struct ExecutableBody<'a> {
    pub body: &'a Body,
    pub scope: AccessorScope,
}

impl ExecutableBody<'_> {
    pub fn is_expression(&self) -> bool {
        matches!(self.body, Body::Arrow(..))
    }
}

/// Every body of a member that can throw.
pub fn executable_bodies(member: &MemberDecl) -> Vec<ExecutableBody<'_>> {
    let mut bodies = Vec::new();
    if member.kind == MemberKind::Field {
        return bodies;
    }

    let own_scope = if member.kind.has_accessors() {
        // `int X => ...` is a getter.
        AccessorScope::Get
    } else {
        AccessorScope::None
    };
    if let Some(body) = &member.body {
        bodies.push(ExecutableBody {
            body,
            scope: own_scope,
        });
    }

    for accessor in &member.accessors {
        let scope = match accessor.kind {
            AccessorKind::Get => AccessorScope::Get,
            AccessorKind::Set | AccessorKind::Init => AccessorScope::Set,
            AccessorKind::Add | AccessorKind::Remove => AccessorScope::None,
        };
        if let Some(body) = &accessor.body {
            bodies.push(ExecutableBody { body, scope });
        }
    }
    bodies
}

/// Report exceptions escaping `body` that the member does not declare.
///
/// One diagnostic per escape location. Noise families are dropped first, then
/// anything covered by a declaration for the body's accessor scope.
pub fn detect_unhandled_exceptions(
    ctx: &FileContext<'_>,
    member: &MemberDecl,
    member_id: MemberId,
    body: &ExecutableBody<'_>,
    flow: &FlowResult,
) -> Vec<Violation> {
    let declared = ctx
        .extractor()
        .declared_exceptions(member_id, false, body.scope);
    let escapes = ctx.noise.filter(ctx.model, flow.escapes.clone(), |e| e.ty);

    let rule = if body.is_expression() {
        ViolationRule::UnhandledExceptionInExpressionBody
    } else {
        ViolationRule::UnhandledException
    };
    let short_comment = ctx.config.short_comments.for_visibility(member.visibility);

    let mut violations = Vec::new();
    for (location, types) in group_by_location(&escapes) {
        let types: Vec<_> = types
            .into_iter()
            .filter(|t| !ctx.model.is_covered(*t, &declared))
            .collect();
        if types.is_empty() {
            continue;
        }

        let message = format!("Unhandled exception(s): {}", ctx.short_names(&types));
        let mut violation = ctx.violation(rule, location, message, &types);
        violation.properties.is_short_comment_target = short_comment;
        violation.target = Some(FixTarget {
            member_start: member.span.start_byte,
            scope: body.scope,
            statement: (!body.is_expression()).then_some(location),
        });
        violations.push(violation);
    }
    violations
}

#[cfg(test)]
mod tests {
    use crate::analysis::parse_source;
    use crate::config::{Config, NoiseConfig, ShortCommentConfig};
    use crate::contract::AccessorScope;
    use crate::detect::{Runner, Violation, ViolationRule};

    fn run_with(src: &str, config: &Config) -> Vec<Violation> {
        let file = parse_source("Test.cs", src).unwrap();
        Runner::new(".").run_sources(&[file], config).violations
    }

    fn run(src: &str) -> Vec<Violation> {
        run_with(src, &Config::default())
    }

    #[test]
    fn test_declared_exception_is_not_reported() {
        let violations = run(r#"using System;
using System.IO;
class C
{
    /// <exception cref="IOException"></exception>
    void Declared() { throw new FileNotFoundException(); }

    /// <exception cref="IOException">Ignore.</exception>
    void IgnoredStillDeclares() { throw new IOException(); }

    void Undeclared() { throw new IOException(); }
}"#);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 11);
        assert_eq!(violations[0].message, "Unhandled exception(s): IOException");
    }

    #[test]
    fn test_grouping_by_location() {
        let violations = run(r#"using System;
class Api
{
    /// <exception cref="TimeoutException"></exception>
    /// <exception cref="InvalidOperationException"></exception>
    public static int Call() { return 0; }
}
class C
{
    void M()
    {
        var x = Api.Call();
    }
}"#);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Unhandled exception(s): InvalidOperationException, TimeoutException"
        );
        let target = violations[0].target.unwrap();
        assert_eq!(target.scope, AccessorScope::None);
        assert!(target.statement.is_some());
    }

    #[test]
    fn test_noise_families_follow_config() {
        let src = r#"using System;
class C
{
    void M(string s)
    {
        if (s == null) throw new ArgumentNullException(nameof(s));
        throw new FormatException();
    }
}"#;
        assert!(run(src).is_empty());

        let config = Config {
            noise: NoiseConfig {
                argument: true,
                format: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let violations = run_with(src, &config);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "Unhandled exception(s): ArgumentNullException");
        assert_eq!(violations[1].message, "Unhandled exception(s): FormatException");
    }

    #[test]
    fn test_accessor_isolation() {
        let violations = run(r#"using System;
class C
{
    /// <exception cref="InvalidOperationException">Get. Ignore.</exception>
    public int Value
    {
        get { throw new InvalidOperationException(); }
        set { throw new TimeoutException(); }
    }
}"#);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 8);
        assert_eq!(violations[0].message, "Unhandled exception(s): TimeoutException");
        assert_eq!(violations[0].target.unwrap().scope, AccessorScope::Set);
    }

    #[test]
    fn test_expression_body_rule() {
        let config = Config {
            short_comments: ShortCommentConfig {
                private: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let violations = run_with(
            r#"using System;
class C
{
    int Value => throw new InvalidOperationException();
}"#,
            &config,
        );
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.rule, ViolationRule::UnhandledExceptionInExpressionBody);
        assert!(v.properties.is_short_comment_target);
        let target = v.target.unwrap();
        assert_eq!(target.scope, AccessorScope::Get);
        assert!(target.statement.is_none());
    }
}
