//! Base-library exception types known without source.

use once_cell::sync::Lazy;

/// `(full name, base full name)` pairs, parents before children.
pub static PRELUDE_TYPES: Lazy<Vec<(&'static str, Option<&'static str>)>> = Lazy::new(|| {
    vec![
        ("System.Object", None),
        ("System.String", Some("System.Object")),
        ("System.Exception", Some("System.Object")),
        ("System.SystemException", Some("System.Exception")),
        ("System.ApplicationException", Some("System.Exception")),
        ("System.AggregateException", Some("System.Exception")),
        // Argument validation
        ("System.ArgumentException", Some("System.SystemException")),
        ("System.ArgumentNullException", Some("System.ArgumentException")),
        ("System.ArgumentOutOfRangeException", Some("System.ArgumentException")),
        ("System.DuplicateWaitObjectException", Some("System.ArgumentException")),
        // Arithmetic
        ("System.ArithmeticException", Some("System.SystemException")),
        ("System.OverflowException", Some("System.ArithmeticException")),
        ("System.DivideByZeroException", Some("System.ArithmeticException")),
        ("System.NotFiniteNumberException", Some("System.ArithmeticException")),
        // Format
        ("System.FormatException", Some("System.SystemException")),
        ("System.UriFormatException", Some("System.FormatException")),
        // Operations
        ("System.InvalidOperationException", Some("System.SystemException")),
        ("System.ObjectDisposedException", Some("System.InvalidOperationException")),
        ("System.NotSupportedException", Some("System.SystemException")),
        ("System.PlatformNotSupportedException", Some("System.NotSupportedException")),
        ("System.NotImplementedException", Some("System.SystemException")),
        ("System.InvalidCastException", Some("System.SystemException")),
        ("System.NullReferenceException", Some("System.SystemException")),
        ("System.IndexOutOfRangeException", Some("System.SystemException")),
        ("System.ArrayTypeMismatchException", Some("System.SystemException")),
        ("System.RankException", Some("System.SystemException")),
        ("System.OutOfMemoryException", Some("System.SystemException")),
        ("System.InsufficientExecutionStackException", Some("System.SystemException")),
        ("System.StackOverflowException", Some("System.SystemException")),
        ("System.TimeoutException", Some("System.SystemException")),
        ("System.UnauthorizedAccessException", Some("System.SystemException")),
        ("System.OperationCanceledException", Some("System.SystemException")),
        // Member access
        ("System.MemberAccessException", Some("System.SystemException")),
        ("System.FieldAccessException", Some("System.MemberAccessException")),
        ("System.MethodAccessException", Some("System.MemberAccessException")),
        ("System.MissingMemberException", Some("System.MemberAccessException")),
        ("System.MissingFieldException", Some("System.MissingMemberException")),
        ("System.MissingMethodException", Some("System.MissingMemberException")),
        ("System.TypeLoadException", Some("System.SystemException")),
        ("System.EntryPointNotFoundException", Some("System.TypeLoadException")),
        // Collections
        (
            "System.Collections.Generic.KeyNotFoundException",
            Some("System.SystemException"),
        ),
        // IO
        ("System.IO.IOException", Some("System.SystemException")),
        ("System.IO.FileNotFoundException", Some("System.IO.IOException")),
        ("System.IO.DirectoryNotFoundException", Some("System.IO.IOException")),
        ("System.IO.EndOfStreamException", Some("System.IO.IOException")),
        ("System.IO.PathTooLongException", Some("System.IO.IOException")),
        ("System.IO.FileLoadException", Some("System.IO.IOException")),
        ("System.IO.InvalidDataException", Some("System.SystemException")),
        // Threading
        (
            "System.Threading.Tasks.TaskCanceledException",
            Some("System.OperationCanceledException"),
        ),
        (
            "System.Threading.SynchronizationLockException",
            Some("System.SystemException"),
        ),
        ("System.Threading.ThreadAbortException", Some("System.SystemException")),
        // Networking and serialization
        ("System.Net.WebException", Some("System.InvalidOperationException")),
        ("System.Net.Http.HttpRequestException", Some("System.Exception")),
        ("System.Security.SecurityException", Some("System.SystemException")),
        ("System.Xml.XmlException", Some("System.SystemException")),
        ("System.Text.Json.JsonException", Some("System.Exception")),
        (
            "System.Runtime.Serialization.SerializationException",
            Some("System.SystemException"),
        ),
        // MSTest
        (
            "Microsoft.VisualStudio.TestTools.UnitTesting.UnitTestAssertException",
            Some("System.Exception"),
        ),
        (
            "Microsoft.VisualStudio.TestTools.UnitTesting.AssertFailedException",
            Some("Microsoft.VisualStudio.TestTools.UnitTesting.UnitTestAssertException"),
        ),
        (
            "Microsoft.VisualStudio.TestTools.UnitTesting.AssertInconclusiveException",
            Some("Microsoft.VisualStudio.TestTools.UnitTesting.UnitTestAssertException"),
        ),
    ]
});

/// Keyword aliases for prelude types.
pub fn keyword_alias(name: &str) -> Option<&'static str> {
    match name {
        "object" => Some("System.Object"),
        "string" => Some("System.String"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parents_precede_children() {
        let mut seen = HashSet::new();
        for (name, parent) in PRELUDE_TYPES.iter() {
            if let Some(parent) = parent {
                assert!(seen.contains(parent), "{} listed before {}", name, parent);
            }
            assert!(seen.insert(*name), "duplicate {}", name);
        }
    }
}
