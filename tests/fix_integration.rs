//! Integration tests for the declare, ignore and handle fixes.

use std::path::PathBuf;

use throwcheck::analysis::{parse_source, AnalysisContext};
use throwcheck::config::Config;
use throwcheck::detect::ViolationRule;
use throwcheck::{FixAction, Fixer, SourceFile, ThrowcheckError};

const PLAIN_THROW: &str = "using System;\nclass C\n{\n    void M()\n    {\n        throw new Exception();\n    }\n}\n";

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("project")
}

/// Load `target` from the fixture project with every other fixture as context.
fn load_project(target: &str) -> (SourceFile, Vec<SourceFile>) {
    let ctx = AnalysisContext::new(project_path());
    let file = ctx.load_file(target).unwrap();
    let context = ["Storage.cs", "Service.cs", "Clean.cs"]
        .iter()
        .filter(|name| **name != target)
        .map(|name| ctx.load_file(name).unwrap())
        .collect();
    (file, context)
}

#[test]
fn test_handle_wraps_plain_throw() {
    let config = Config::default();
    let file = parse_source("C.cs", PLAIN_THROW).unwrap();
    let out = Fixer::new(&config, Vec::new())
        .fix_line(&file, 6, FixAction::Handle)
        .unwrap();
    assert_eq!(
        out,
        "using System;\nclass C\n{\n    void M()\n    {\n        try\n        {\n            throw new Exception();\n        }\n        catch (Exception)\n        {\n        }\n    }\n}\n"
    );
}

#[test]
fn test_declare_documents_plain_throw() {
    let config = Config::default();
    let file = parse_source("C.cs", PLAIN_THROW).unwrap();
    let fixer = Fixer::new(&config, Vec::new());
    let out = fixer.fix_line(&file, 6, FixAction::Declare).unwrap();
    assert_eq!(
        out,
        "using System;\nclass C\n{\n    /// <summary>\n    /// M\n    /// </summary>\n    /// <exception cref=\"Exception\"></exception>\n    void M()\n    {\n        throw new Exception();\n    }\n}\n"
    );

    let fixed = parse_source("C.cs", &out).unwrap();
    assert!(fixer.diagnostics(&fixed).is_empty());
}

#[test]
fn test_declare_appends_to_existing_block() {
    let src = "using System;\nclass C\n{\n    /// <summary>Runs.</summary>\n    /// <exception cref=\"TimeoutException\"></exception>\n    void M()\n    {\n        throw new Exception();\n    }\n}\n";
    let config = Config::default();
    let file = parse_source("C.cs", src).unwrap();
    let out = Fixer::new(&config, Vec::new())
        .fix_line(&file, 8, FixAction::Declare)
        .unwrap();
    assert!(out.contains(
        "    /// <summary>Runs.</summary>\n    /// <exception cref=\"TimeoutException\"></exception>\n    /// <exception cref=\"Exception\"></exception>\n    void M()"
    ));
}

#[test]
fn test_handle_rethrow_inside_catch() {
    let src = "using System;\nclass C\n{\n    /// <exception cref=\"FieldAccessException\"></exception>\n    void Risky() { }\n\n    void M()\n    {\n        try\n        {\n            Risky();\n        }\n        catch (FieldAccessException)\n        {\n            throw;\n        }\n    }\n}\n";
    let config = Config::default();
    let file = parse_source("C.cs", src).unwrap();
    let fixer = Fixer::new(&config, Vec::new());
    let out = fixer.fix_line(&file, 15, FixAction::Handle).unwrap();
    assert!(out.contains(
        "        {\n            try\n            {\n                throw;\n            }\n            catch (FieldAccessException)\n            {\n            }\n        }"
    ));

    let fixed = parse_source("C.cs", &out).unwrap();
    assert!(fixer.diagnostics(&fixed).is_empty());
}

#[test]
fn test_ignore_clears_interface_violation() {
    let config = Config::default();
    let (file, context) = load_project("Storage.cs");
    let fixer = Fixer::new(&config, context);

    let before = fixer.diagnostics(&file);
    assert!(before
        .iter()
        .any(|v| v.line == 19 && v.rule == ViolationRule::InterfaceViolation));

    let out = fixer.fix_line(&file, 19, FixAction::Ignore).unwrap();
    assert!(out.contains(
        "        /// <exception cref=\"StorageException\">Ignore. When the disk is full.</exception>\n        /// <exception cref=\"TimeoutException\">Ignore.</exception>\n"
    ));

    let fixed = parse_source("Storage.cs", &out).unwrap();
    assert!(fixer
        .diagnostics(&fixed)
        .iter()
        .all(|v| v.rule != ViolationRule::InterfaceViolation));
}

#[test]
fn test_declare_not_offered_for_interface_violation() {
    let config = Config::default();
    let (file, context) = load_project("Storage.cs");
    let err = Fixer::new(&config, context)
        .fix_line(&file, 19, FixAction::Declare)
        .unwrap_err();
    assert!(matches!(err, ThrowcheckError::FixUnavailable { .. }));
}

#[test]
fn test_declare_extends_handler_doc() {
    let config = Config::default();
    let (file, context) = load_project("Service.cs");
    let out = Fixer::new(&config, context)
        .fix_line(&file, 29, FixAction::Declare)
        .unwrap();
    assert!(out.contains(
        "        /// <exception cref=\"StorageException\"></exception>\n        /// <exception cref=\"TimeoutException\"></exception>\n        private void OnSaved"
    ));
}

#[test]
fn test_fix_all_is_idempotent() {
    let config = Config::default();
    let (file, context) = load_project("Storage.cs");
    let fixer = Fixer::new(&config, context);

    let (out, edits) = fixer.fix_all(&file, FixAction::Handle).unwrap();
    assert!(edits > 0);
    let fixed = parse_source("Storage.cs", &out).unwrap();
    assert!(fixer
        .diagnostics(&fixed)
        .iter()
        .all(|v| !FixAction::Handle.applies_to(v)));

    let (again, edits) = fixer.fix_all(&fixed, FixAction::Handle).unwrap();
    assert_eq!(edits, 0);
    assert_eq!(again, out);
}

#[test]
fn test_fix_all_declare_clears_unhandled() {
    let config = Config::default();
    let (file, context) = load_project("Service.cs");
    let fixer = Fixer::new(&config, context);

    let (out, _) = fixer.fix_all(&file, FixAction::Declare).unwrap();
    let fixed = parse_source("Service.cs", &out).unwrap();
    assert!(fixer
        .diagnostics(&fixed)
        .iter()
        .all(|v| !v.rule.is_unhandled()));
}
