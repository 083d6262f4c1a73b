//! Throwcheck CLI entry point.

use clap::Parser;
use throwcheck::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

/// Log filter from `THROWCHECK_LOG`, then `RUST_LOG`, defaulting to warnings.
fn init_logging() {
    let filter = EnvFilter::try_from_env("THROWCHECK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Lint(args) => cli::run_lint(&args),
        Commands::Fix(args) => cli::run_fix(&args),
        Commands::Init(args) => cli::run_init(&args),
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
