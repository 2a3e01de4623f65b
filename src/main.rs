//! dirhasher CLI - concurrent checksum calculator and verifier

use clap::Parser;
use dirhasher::config::{CliArgs, RunConfig, RunMode};
use dirhasher::core::HashRunner;
use dirhasher::error::Result;
use dirhasher::progress::ProgressReporter;
use tracing_subscriber::EnvFilter;

/// Exit code for errors that stop the run before any file is hashed
const EXIT_FATAL: i32 = 2;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(args.verbose, args.quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(args: CliArgs) -> Result<i32> {
    // Build configuration
    let config = RunConfig::from_cli(&args)?;

    // Print configuration if verbose
    if config.verbose > 1 {
        print_config(&config);
    }

    // Create progress reporter
    let progress = if config.quiet || !config.progress {
        ProgressReporter::disabled()
    } else {
        ProgressReporter::new()
    };

    let format = config.format;
    let quiet = config.quiet;
    let report = HashRunner::new(config).with_progress(progress).execute()?;

    // Print results
    if !quiet {
        report.print_summary(format);
    }

    Ok(report.exit_code())
}

fn print_config(config: &RunConfig) {
    eprintln!("=== Configuration ===");
    match &config.mode {
        RunMode::Calculate { inputs } => {
            eprintln!("Mode:        calculate ({} inputs)", inputs.len());
            match &config.output {
                Some(path) => eprintln!("Output:      {:?}", path),
                None => eprintln!("Output:      stdout"),
            }
        }
        RunMode::Check { source } => {
            eprintln!("Mode:        check");
            eprintln!("Manifest:    {}", source.label());
        }
    }
    eprintln!("Algorithm:   {}", config.algorithm.name());
    eprintln!("Workers:     {}", config.workers);
    eprintln!("Hidden:      {}", if config.include_hidden { "included" } else { "skipped" });
    if !config.exclude_patterns.is_empty() {
        eprintln!("Exclude:     {}", config.exclude_patterns.join(", "));
    }
    eprintln!();
}
