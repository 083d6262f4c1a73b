//! Analysis context for loading a set of C# files.
//!
//! The AnalysisContext provides:
//! - Relative path resolution against a base directory
//! - Parallel parsing and lowering of source files
//! - Tolerant loading: unreadable or unparsable files are logged and skipped

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{CSharpAnalyzer, LanguageAnalyzer, SourceFile};

/// Analysis context for a set of files.
pub struct AnalysisContext {
    /// Base directory for relative path resolution.
    base_dir: PathBuf,
    analyzer: CSharpAnalyzer,
}

impl AnalysisContext {
    /// Create a new analysis context.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            analyzer: CSharpAnalyzer::new(),
        }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path relative to the base directory, for reporting.
    pub fn relative_path(&self, path: &Path) -> String {
        let abs_path = self.absolute_path(path);
        let rel = abs_path
            .strip_prefix(&self.base_dir)
            .unwrap_or(&abs_path)
            .to_string_lossy()
            .to_string();
        if rel.is_empty() {
            // Single-file scan: base dir is the file itself.
            abs_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(rel)
        } else {
            rel
        }
    }

    fn absolute_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read, parse and lower one file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<SourceFile> {
        let abs_path = self.absolute_path(path.as_ref());
        let source = fs::read(&abs_path)?;
        let mut file = self.analyzer.load(&abs_path, &source)?;
        file.path = self.relative_path(&abs_path);
        if file.has_errors {
            debug!(
                file = %file.path,
                language = self.analyzer.language_id(),
                "file has syntax errors, lowering best-effort"
            );
        }
        Ok(file)
    }

    /// Load multiple files in parallel.
    ///
    /// Uses rayon for parallel processing. Results are sorted by path.
    pub fn load_files_parallel(&self, paths: &[PathBuf]) -> Vec<SourceFile> {
        use rayon::prelude::*;

        let results: Vec<_> = paths
            .par_iter()
            .map(|p| (p, self.load_file(p)))
            .collect();

        // Collect results, logging errors but continuing
        let mut files = Vec::new();
        for (path, result) in results {
            match result {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to analyze file");
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_file_relative_path() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("Program.cs");
        fs::write(&file_path, "class Program { static void Main() { } }").unwrap();

        let ctx = AnalysisContext::new(temp.path());
        let file = ctx.load_file(&file_path).unwrap();

        assert_eq!(file.path, "Program.cs");
        assert_eq!(file.types.len(), 1);
        assert_eq!(file.types[0].members[0].name, "Main");
    }

    #[test]
    fn test_parallel_load_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("A.cs");
        let b = temp.path().join("B.cs");
        fs::write(&a, "class A { }").unwrap();
        fs::write(&b, "class B { }").unwrap();
        let missing = temp.path().join("Missing.cs");

        let ctx = AnalysisContext::new(temp.path());
        let files = ctx.load_files_parallel(&[b, missing, a]);

        let names: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(names, vec!["A.cs", "B.cs"]);
    }
}
