//! Configuration schema for throwcheck.
//!
//! Configuration is read once per process and passed by reference into every
//! analysis and fix entry point. Nothing mutates it during a pass.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::syntax::Visibility;
use crate::error::ThrowcheckError;

/// File names searched for when no config path is given.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["throwcheck.yaml", ".throwcheck.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Which noisy exception families are reported.
    pub noise: NoiseConfig,
    /// Which visibilities get exception-only doc blocks from fixes.
    pub short_comments: ShortCommentConfig,
    /// Glob patterns for paths to exclude from analysis (e.g., "**/obj/**")
    pub excluded_paths: Vec<String>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file in `dir`, if any.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|p| p.is_file())
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// Report flags for broadly thrown exception families.
///
/// Every family is filtered out unless its flag is set.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NoiseConfig {
    /// `System.ArgumentException` and subtypes.
    pub argument: bool,
    /// `System.FormatException` and subtypes.
    pub format: bool,
    /// `System.OverflowException` and subtypes.
    pub overflow: bool,
    /// MSTest `AssertFailedException` and subtypes.
    pub assert_failed: bool,
    /// `System.NotSupportedException` and subtypes.
    pub not_supported: bool,
    /// `System.NotImplementedException` and subtypes.
    pub not_implemented: bool,
}

impl NoiseConfig {
    /// Report every family.
    pub fn all() -> Self {
        Self {
            argument: true,
            format: true,
            overflow: true,
            assert_failed: true,
            not_supported: true,
            not_implemented: true,
        }
    }

    /// Root type names of the families currently filtered out.
    pub fn filtered_roots(&self) -> Vec<&'static str> {
        [
            (self.argument, "System.ArgumentException"),
            (self.format, "System.FormatException"),
            (self.overflow, "System.OverflowException"),
            (
                self.assert_failed,
                "Microsoft.VisualStudio.TestTools.UnitTesting.AssertFailedException",
            ),
            (self.not_supported, "System.NotSupportedException"),
            (self.not_implemented, "System.NotImplementedException"),
        ]
        .into_iter()
        .filter(|(reported, _)| !reported)
        .map(|(_, root)| root)
        .collect()
    }
}

/// Short doc-comment format per member visibility.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ShortCommentConfig {
    pub private: bool,
    pub protected: bool,
    pub internal: bool,
    pub public: bool,
}

impl ShortCommentConfig {
    pub fn for_visibility(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Private => self.private,
            Visibility::Protected => self.protected,
            Visibility::Internal => self.internal,
            Visibility::Public => self.public,
        }
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| {
            ThrowcheckError::Config(format!("excluded_paths pattern {:?}: {}", pattern, e))
        })?;
    }
    Ok(())
}
