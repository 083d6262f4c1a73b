//! Detection of exception-contract violations in C# code.

mod events;
mod flow;
mod noise;
mod reachability;
mod runner;
mod substitution;
mod suppress;
mod types;
mod unhandled;

pub use events::detect_event_handler_exceptions;
pub use flow::{group_by_location, Escape, FlowAnalyzer, FlowResult, Subscription};
pub use noise::NoiseFilter;
pub use runner::{FileContext, Runner};
pub use substitution::detect_substitution_violations;
pub use suppress::{
    collect_suppressions, filter_suppressed, parse_suppressions, SuppressedViolation, Suppression,
    SuppressionType,
};
pub use types::{
    DetectionResult, FixTarget, Severity, Violation, ViolationProperties, ViolationRule,
};
pub use unhandled::{detect_unhandled_exceptions, executable_bodies, ExecutableBody};
