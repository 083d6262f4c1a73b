//! Detection runner that orchestrates all checks.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analysis::syntax::{MemberDecl, SourceFile};
use crate::analysis::{AnalysisContext, Span};
use crate::config::Config;
use crate::contract::ContractExtractor;
use crate::semantic::{DeclRef, MemberId, SemanticModel, TypeId};

use super::{
    collect_suppressions, detect_event_handler_exceptions, detect_substitution_violations,
    detect_unhandled_exceptions, executable_bodies, filter_suppressed, DetectionResult,
    FlowAnalyzer, NoiseFilter, Severity, Violation, ViolationProperties, ViolationRule,
};

/// Everything the checks need to look at one file.
pub struct FileContext<'a> {
    pub model: &'a SemanticModel,
    pub config: &'a Config,
    pub noise: &'a NoiseFilter,
    pub file: &'a SourceFile,
    /// Index of `file` in the slice the model was built from.
    pub file_idx: usize,
}

impl<'a> FileContext<'a> {
    pub fn extractor(&self) -> ContractExtractor<'a> {
        ContractExtractor::new(self.model)
    }

    /// Simple type names, sorted and joined for messages.
    pub fn short_names(&self, types: &[TypeId]) -> String {
        let mut names: Vec<&str> = types
            .iter()
            .map(|t| self.model.ty(*t).name.as_str())
            .collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// A warning at `span` listing `types` in its properties, by full name.
    pub fn violation(
        &self,
        rule: ViolationRule,
        span: Span,
        message: String,
        types: &[TypeId],
    ) -> Violation {
        let mut full_names: Vec<String> = types
            .iter()
            .map(|t| self.model.ty(*t).full_name.clone())
            .collect();
        full_names.sort();
        Violation {
            rule,
            message,
            file: self.file.path.clone(),
            line: span.start_line,
            column: span.start_col,
            severity: Severity::Warning,
            properties: ViolationProperties {
                declared_exception_types: full_names,
                is_short_comment_target: false,
            },
            target: None,
        }
    }

    /// Run every check over every member of the file.
    pub fn check(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (type_idx, decl) in self.file.types.iter().enumerate() {
            let Some(owner) = self.model.source_type(self.file_idx, type_idx) else {
                continue;
            };
            for (member_idx, member) in decl.members.iter().enumerate() {
                let decl_ref = DeclRef {
                    file: self.file_idx,
                    ty: type_idx,
                    member: member_idx,
                };
                let Some(member_id) = self.model.source_member(decl_ref) else {
                    debug!(member = %member.name, "no symbol for member, skipping");
                    continue;
                };
                violations.extend(self.check_member(member, member_id, owner));
            }
        }

        violations
    }

    fn check_member(&self, member: &MemberDecl, member_id: MemberId, owner: TypeId) -> Vec<Violation> {
        let mut violations = Vec::new();

        for body in executable_bodies(member) {
            let flow = FlowAnalyzer::new(self.model, owner).analyze(body.body, &member.params);
            violations.extend(detect_unhandled_exceptions(
                self, member, member_id, &body, &flow,
            ));
            violations.extend(detect_event_handler_exceptions(self, &flow));
        }

        violations.extend(detect_substitution_violations(self, member, member_id));
        violations
    }
}

/// Executes all detection checks against a set of files.
pub struct Runner {
    base_dir: PathBuf,
}

impl Runner {
    /// Create a new detection runner.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Load, parse and check the given files.
    pub fn run(&self, files: &[PathBuf], config: &Config) -> anyhow::Result<DetectionResult> {
        let ctx = AnalysisContext::new(&self.base_dir);
        let sources = ctx.load_files_parallel(files);
        Ok(self.run_sources(&sources, config))
    }

    /// Check already lowered sources as one compilation.
    pub fn run_sources(&self, sources: &[SourceFile], config: &Config) -> DetectionResult {
        let model = SemanticModel::build(sources);
        let noise = NoiseFilter::new(&model, &config.noise);

        let violations: Vec<Violation> = sources
            .par_iter()
            .enumerate()
            .flat_map(|(file_idx, file)| {
                FileContext {
                    model: &model,
                    config,
                    noise: &noise,
                    file,
                    file_idx,
                }
                .check()
            })
            .collect();

        let mut result = DetectionResult::new();
        result.scanned = sources.len();
        result.violations = violations;

        // Apply suppressions - filter violations and track suppressed ones
        let suppression_map = collect_suppressions(sources);
        let all_suppressions: Vec<_> = suppression_map.values().flatten().cloned().collect();
        if !all_suppressions.is_empty() {
            let (active, suppressed) = filter_suppressed(result.violations, &all_suppressions);
            result.violations = active;
            result.suppressed = suppressed;
        }

        result.sort();
        info!(
            files = result.scanned,
            violations = result.violations.len(),
            suppressed = result.suppressed_count(),
            "analysis pass complete"
        );
        result
    }
}
