//! Command-line interface for throwcheck.

use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analysis::{AnalysisContext, CSharpAnalyzer, LanguageAnalyzer};
use crate::config::{self, Config};
use crate::detect::Runner;
use crate::fix::{FixAction, Fixer};
use crate::report::{self, Format};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Checked-exception discipline for C#.
///
/// Throwcheck treats `<exception cref="...">` documentation as a contract.
/// It reports exceptions that can escape a member without being caught or
/// declared, overrides and implementations that declare more than their base
/// or interface member, and event handlers that declare exceptions.
#[derive(Parser)]
#[command(name = "throwcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check exception contracts in C# sources
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Apply a fix to one or all diagnostics of a file
    Fix(FixArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Show suppressed violations in output
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Arguments for the fix command.
#[derive(Parser)]
pub struct FixArgs {
    /// C# file to fix
    pub file: PathBuf,

    /// Directory whose sources are analyzed with the file (default: the file's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Fix the diagnostic reported on this line
    #[arg(short, long, conflicts_with = "all")]
    pub line: Option<usize>,

    /// Fix every diagnostic the action applies to
    #[arg(long)]
    pub all: bool,

    /// Fix to apply: declare, ignore, or handle
    #[arg(short, long, default_value = "declare")]
    pub action: String,

    /// Print the fixed source instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "throwcheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "Noise families filtered, full doc blocks for every visibility",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "strict",
        description: "Every exception family reported, short blocks for non-public members",
        content: include_str!("templates/strict.yaml"),
    },
];

/// Load the config given with `-c`, or discover one next to `dir`.
///
/// Returns the config and the path it came from, empty for defaults.
fn load_config(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Config, String)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(dir).or_else(|| Config::discover(".")),
    };
    let Some(path) = path else {
        info!("no config file found, using defaults");
        return Ok((Config::default(), String::new()));
    };

    let config = Config::parse_file(&path)
        .map_err(|e| anyhow::anyhow!("cannot load config {}: {}", path.display(), e))?;
    config::validate(&config)?;
    Ok((config, path.to_string_lossy().to_string()))
}

/// Whether a file name belongs to generated code.
fn is_generated(name: &str) -> bool {
    const GENERATED_SUFFIXES: &[&str] = &[".g.cs", ".g.i.cs", ".designer.cs", ".generated.cs"];
    let lower = name.to_ascii_lowercase();
    GENERATED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Whether the leading comment block carries an `<auto-generated>` marker.
fn has_generated_header(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .map(|line| line.trim().to_string())
        .take_while(|line| line.is_empty() || line.starts_with("//") || line.starts_with('#'))
        .any(|line| line.contains("<auto-generated"))
}

/// Collect C# sources under `root`.
pub fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let analyzer = CSharpAnalyzer::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories and build output
            !(name.starts_with('.') || name == "bin" || name == "obj")
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !analyzer.handles_extension(ext) || is_generated(name) {
            continue;
        }
        if has_generated_header(path) {
            debug!(file = %path.display(), "skipping generated source");
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.is_path_excluded(relative) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    let Some(format) = Format::parse(&args.format) else {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    };

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let config_dir = if abs_path.is_dir() {
        abs_path.clone()
    } else {
        abs_path.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let (config, config_path) = match load_config(args.config.as_deref(), &config_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    // Collect files to scan
    let files = if abs_path.is_dir() {
        collect_files(&abs_path, &config)?
    } else {
        vec![abs_path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to scan");
        return Ok(EXIT_SUCCESS);
    }

    let runner = Runner::new(&abs_path);
    let result = runner.run(&files, &config)?;

    let path_str = args.path.to_string_lossy().to_string();
    match format {
        Format::Json => report::write_json(&path_str, &config_path, &result)?,
        Format::Sarif => report::write_sarif(&abs_path, &result)?,
        Format::Pretty => report::write_pretty(&path_str, &config_path, &result, args.show_suppressed),
    }

    if result.violations.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the fix command.
pub fn run_fix(args: &FixArgs) -> anyhow::Result<i32> {
    let action = match FixAction::parse(&args.action) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.line.is_none() && !args.all {
        eprintln!("Error: pass --line <N> or --all");
        return Ok(EXIT_ERROR);
    }

    let file_path = match args.file.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access file {:?}: {}", args.file, e);
            return Ok(EXIT_ERROR);
        }
    };
    let root = match &args.root {
        Some(root) => root.canonicalize()?,
        None => file_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let (config, _) = match load_config(args.config.as_deref(), &root) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let ctx = AnalysisContext::new(&root);
    let target = match ctx.load_file(&file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot parse {}: {}", file_path.display(), e);
            return Ok(EXIT_ERROR);
        }
    };
    let others: Vec<PathBuf> = collect_files(&root, &config)?
        .into_iter()
        .filter(|p| *p != file_path)
        .collect();
    let fixer = Fixer::new(&config, ctx.load_files_parallel(&others));

    let fixed = match args.line {
        Some(line) => fixer.fix_line(&target, line, action).map(|text| (text, 1)),
        None => fixer.fix_all(&target, action),
    };
    let (text, edits) = match fixed {
        Ok(fixed) => fixed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
    };

    if args.dry_run {
        print!("{}", text);
        return Ok(EXIT_SUCCESS);
    }
    if edits == 0 {
        warn!(file = %target.path, action = %action, "nothing to fix");
        println!("No {} fixes applied to {}", action, target.path);
        return Ok(EXIT_SUCCESS);
    }

    std::fs::write(&file_path, text)?;
    println!("Applied {} {} fix(es) to {}", edits, action, target.path);
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // List mode
    if args.list {
        return list_templates();
    }

    // Find template
    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'throwcheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to choose which exception families to report", args.output.display());
    println!("  2. Run: throwcheck lint . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  throwcheck init --template <name>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_templates_parse() {
        for template in TEMPLATES {
            let config: Config = serde_yaml::from_str(template.content).unwrap();
            assert!(config::validate(&config).is_ok(), "template {}", template.name);
        }
    }

    #[test]
    fn test_collect_files_skips_build_output_and_generated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["src", "obj", "bin", ".git", "src/Migrations"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "src/App.cs",
            "src/App.g.cs",
            "src/Form.Designer.cs",
            "src/notes.txt",
            "obj/Gen.cs",
            "bin/Out.cs",
            ".git/Hook.cs",
            "src/Migrations/Init.cs",
        ] {
            std::fs::write(root.join(file), "class X { }").unwrap();
        }
        std::fs::write(
            root.join("src/Proxy.cs"),
            "// <auto-generated>\n//   Generated by a tool.\n// </auto-generated>\nclass P { }\n",
        )
        .unwrap();

        let config = Config {
            excluded_paths: vec!["**/Migrations/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(root, &config).unwrap();
        assert_eq!(files, vec![root.join("src/App.cs")]);
    }

    #[test]
    fn test_load_config_explicit_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(load_config(Some(&missing), temp.path()).is_err());
    }
}
