//! Exceptions declared by methods subscribed as event handlers.

use crate::contract::AccessorScope;
use crate::semantic::TypeId;

use super::{FileContext, FlowResult, Violation, ViolationRule};

/// Report handlers attached with `+=` or `-=` whose contract declares
/// exceptions. The raiser of an event has no way to expect them.
pub fn detect_event_handler_exceptions(ctx: &FileContext<'_>, flow: &FlowResult) -> Vec<Violation> {
    let extractor = ctx.extractor();
    let mut violations = Vec::new();

    for subscription in &flow.subscriptions {
        let declared: Vec<TypeId> = extractor
            .declared_exceptions(subscription.handler, true, AccessorScope::None)
            .into_iter()
            .collect();
        let types = ctx.noise.filter(ctx.model, declared, |t| *t);
        if types.is_empty() {
            continue;
        }

        let handler = &ctx.model.member(subscription.handler).name;
        let message = format!(
            "Exception(s) thrown from event handler {}: {}. You probably don't want to throw exceptions from an event handler.",
            handler,
            ctx.short_names(&types)
        );
        violations.push(ctx.violation(
            ViolationRule::EventHandlerException,
            subscription.span,
            message,
            &types,
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use crate::analysis::parse_source;
    use crate::config::Config;
    use crate::detect::{Runner, ViolationRule};

    #[test]
    fn test_handler_with_declared_exceptions() {
        let file = parse_source(
            "Test.cs",
            r#"using System;
using System.IO;
class Source
{
    public event EventHandler Changed;
}
class Listener
{
    void Attach(Source s)
    {
        s.Changed += OnChanged;
        s.Changed -= Quiet;
    }

    /// <exception cref="IOException"></exception>
    /// <exception cref="ArgumentNullException"></exception>
    void OnChanged(object sender, EventArgs e) { }

    /// <exception cref="IOException">Ignore.</exception>
    void Quiet(object sender, EventArgs e) { }
}"#,
        )
        .unwrap();
        let result = Runner::new(".").run_sources(&[file], &Config::default());
        let events: Vec<_> = result
            .violations
            .iter()
            .filter(|v| v.rule == ViolationRule::EventHandlerException)
            .collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].line, 11);
        assert_eq!(events[0].column, 22);
        assert_eq!(
            events[0].message,
            "Exception(s) thrown from event handler OnChanged: IOException. You probably don't want to throw exceptions from an event handler."
        );
        assert!(events[0].target.is_none());
    }
}
