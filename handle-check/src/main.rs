//! Handle Check CLI Application
//!
//! A command-line interface for bulk-checking username availability on
//! fragment.com. This CLI application provides a user-friendly interface to
//! the handle-check-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use handle_check_lib::{
    load_env_config, parse_timeout_string, CheckConfig, ConfigManager, EnvConfig, FileConfig,
    HandleChecker, HandleCheckError, ResultSink,
};
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for handle-check
#[derive(Parser, Debug)]
#[command(name = "handle-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bulk-check username availability on fragment.com")]
#[command(
    long_about = "Bulk-check username availability on fragment.com.\n\nReads one handle per line, polls the service in rate-friendly batches with retries and backoff, and partitions results into a valid and a non-valid file."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Input file with handles (one per line)
    #[arg(value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Output file for available handles
    #[arg(long = "valid", value_name = "FILE", help_heading = "Output")]
    pub valid_file: Option<String>,

    /// Output file for taken/undetermined handles
    #[arg(long = "nonvalid", value_name = "FILE", help_heading = "Output")]
    pub nonvalid_file: Option<String>,

    /// Print the run summary as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Enable colorful, formatted output
    #[arg(short = 'p', long = "pretty", help_heading = "Output")]
    pub pretty: bool,

    /// Max concurrent requests (default: 20, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        default_value = "20",
        help_heading = "Performance"
    )]
    pub concurrency: usize,

    /// Handles per batch (default: 20)
    #[arg(long = "chunk-size", default_value = "20", help_heading = "Performance")]
    pub chunk_size: usize,

    /// Base pause between batches in seconds (default: 4)
    #[arg(long = "pause", default_value = "4", help_heading = "Performance")]
    pub pause: u64,

    /// Attempts per handle before giving up (default: 3)
    #[arg(long = "retries", default_value = "3", help_heading = "Performance")]
    pub retries: u32,

    /// Request timeout, e.g. "10s", "30s", "2m"
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Base URL of the remote service (testing, mirrors)
    #[arg(long = "base-url", value_name = "URL", help_heading = "Protocol")]
    pub base_url: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    // Run the handle checking
    if let Err(e) = run_handle_check(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    // Validate concurrency
    if args.concurrency == 0 || args.concurrency > 100 {
        return Err("Concurrency must be between 1 and 100".to_string());
    }

    if args.chunk_size == 0 {
        return Err("Chunk size must be at least 1".to_string());
    }

    if args.retries == 0 {
        return Err("Retries must be at least 1".to_string());
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '10s', '30s', '2m'",
                timeout
            ));
        }
    }

    // JSON summary and pretty text output are mutually exclusive
    if args.json && args.pretty {
        return Err("Cannot specify both --json and --pretty".to_string());
    }

    Ok(())
}

/// Initialize the tracing subscriber from verbosity flags.
///
/// An explicit RUST_LOG always wins; otherwise -d maps to debug and -v to
/// info for our crates, with warnings as the quiet default.
fn init_tracing(args: &Args) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if args.debug {
        "handle_check=debug,handle_check_lib=debug"
    } else if args.verbose {
        "handle_check=info,handle_check_lib=info"
    } else {
        "handle_check=warn,handle_check_lib=warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main handle checking logic
async fn run_handle_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_config = load_env_config(args.verbose);
    let file_config = load_file_config(&args, &env_config)?;

    // Build configuration from files, environment, and CLI args
    let config = build_config(&args, &env_config, &file_config)?;

    // Resolve input and output paths with the same precedence
    let input_path = args
        .file
        .clone()
        .or_else(|| env_config.file.clone())
        .ok_or("You must specify an input file (or set HC_FILE)")?;

    let (valid_path, nonvalid_path) = resolve_output_paths(&args, &env_config, &file_config);

    // Pretty output: CLI flag, then HC_PRETTY, then config file default.
    let pretty = args.pretty
        || env_config
            .pretty
            .or_else(|| file_config.defaults.as_ref().and_then(|d| d.pretty))
            .unwrap_or(false);

    // Read the handle list up front; a missing file aborts the run before
    // any network call is made.
    let names = read_handles_from_file(&input_path)?;
    tracing::info!(handles = names.len(), file = %input_path, "loaded handle list");

    // Ctrl-C stops submitting new work and lets open partitions close cleanly.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupt received, finishing current batch...");
                cancel.cancel();
            }
        });
    }

    if pretty && !args.json {
        ui::print_header(names.len(), config.concurrency, config.chunk_size);
    }

    let spinner = if !args.json {
        ui::Spinner::start(format!("Checking {} handles...", names.len()))
    } else {
        None
    };

    let checker = HandleChecker::with_config(config);
    let mut sink = ResultSink::create(&valid_path, &nonvalid_path)?;
    let run_result = checker.run(&names, &mut sink, &cancel).await;
    sink.finish()?;

    if let Some(s) = spinner {
        s.stop().await;
    }

    let summary = run_result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        ui::print_summary(&summary, &valid_path, &nonvalid_path);
        ui::print_anomalies(&summary);
    }

    Ok(())
}

/// Load the file config honoring --config / HC_CONFIG, falling back to
/// automatic discovery.
fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    if let Some(explicit_path) = &args.config {
        if args.verbose {
            println!("Using explicit config file (CLI --config): {}", explicit_path);
        }
        return Ok(config_manager
            .load_file(explicit_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", explicit_path, e))?);
    }

    if let Some(env_path) = &env_config.config {
        if args.verbose {
            println!("Using explicit config file (HC_CONFIG env var): {}", env_path);
        }
        return Ok(config_manager
            .load_file(env_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_path, e))?);
    }

    // No explicit config: automatic discovery, silently empty when none exist
    Ok(config_manager.discover_and_load().unwrap_or_default())
}

/// Build CheckConfig with proper precedence.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (HC_*)
/// 3. Config files (local > home > XDG)
/// 4. Built-in defaults
fn build_config(
    args: &Args,
    env_config: &EnvConfig,
    file_config: &FileConfig,
) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    let mut config = CheckConfig::default();

    // Step 1: apply config file defaults
    if let Some(defaults) = &file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(chunk_size) = defaults.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(pause) = defaults.pause {
            config.pause_between_chunks = Duration::from_secs(pause);
        }
        if let Some(retries) = defaults.retries {
            config.max_attempts = retries;
        }
        if let Some(timeout_str) = &defaults.timeout {
            if let Some(timeout) = parse_timeout_string(timeout_str) {
                config.request_timeout = timeout;
            }
        }
        if let Some(base_url) = &defaults.base_url {
            config.base_url = base_url.clone();
        }
    }

    // Step 2: apply environment variables (HC_*)
    if let Some(concurrency) = env_config.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(chunk_size) = env_config.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(pause) = env_config.pause {
        config.pause_between_chunks = Duration::from_secs(pause);
    }
    if let Some(retries) = env_config.retries {
        config.max_attempts = retries;
    }
    if let Some(timeout_str) = &env_config.timeout {
        if let Some(timeout) = parse_timeout_string(timeout_str) {
            config.request_timeout = timeout;
        }
    }
    if let Some(base_url) = &env_config.base_url {
        config.base_url = base_url.clone();
    }

    // Step 3: apply CLI arguments (highest precedence). We can't easily
    // detect whether a clap default was used, so values equal to the default
    // don't override env/config settings (explicit same-as-default still
    // counts as default here).
    if args.concurrency != 20 {
        config.concurrency = args.concurrency;
    }
    if args.chunk_size != 20 {
        config.chunk_size = args.chunk_size;
    }
    if args.pause != 4 {
        config.pause_between_chunks = Duration::from_secs(args.pause);
    }
    if args.retries != 3 {
        config.max_attempts = args.retries;
    }
    if let Some(timeout_str) = &args.timeout {
        if let Some(timeout) = parse_timeout_string(timeout_str) {
            config.request_timeout = timeout;
        }
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }

    Ok(config)
}

/// Resolve output partition paths: CLI > env > config file > defaults.
fn resolve_output_paths(
    args: &Args,
    env_config: &EnvConfig,
    file_config: &FileConfig,
) -> (String, String) {
    let file_output = file_config.output.clone().unwrap_or_default();

    let valid = args
        .valid_file
        .clone()
        .or_else(|| env_config.valid_file.clone())
        .or(file_output.valid_file)
        .unwrap_or_else(|| "valid.txt".to_string());

    let nonvalid = args
        .nonvalid_file
        .clone()
        .or_else(|| env_config.nonvalid_file.clone())
        .or(file_output.nonvalid_file)
        .unwrap_or_else(|| "nonvalid.txt".to_string());

    (valid, nonvalid)
}

/// Read handles from a file, one per line.
///
/// Blank lines and `#` comments are skipped; lines with embedded whitespace
/// are reported and skipped.
fn read_handles_from_file(file_path: &str) -> Result<Vec<String>, HandleCheckError> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::path::Path;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(HandleCheckError::file_error(file_path, "File not found"));
    }

    let file = File::open(path)
        .map_err(|e| HandleCheckError::file_error(file_path, e.to_string()))?;
    let reader = BufReader::new(file);

    let mut handles = Vec::new();
    let mut invalid_lines = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line_num = line_num + 1;
        match line {
            Ok(line) => {
                let trimmed = line.trim();

                // Skip empty lines and comments
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }

                if trimmed.chars().any(char::is_whitespace) {
                    invalid_lines.push(format!(
                        "Line {}: '{}' - handles cannot contain whitespace",
                        line_num, trimmed
                    ));
                    continue;
                }

                handles.push(trimmed.to_string());
            }
            Err(e) => {
                invalid_lines.push(format!("Line {}: Error reading line - {}", line_num, e));
            }
        }
    }

    // Report invalid lines if any
    if !invalid_lines.is_empty() {
        eprintln!("Found {} invalid entries in the file:", invalid_lines.len());
        for invalid in &invalid_lines[..invalid_lines.len().min(5)] {
            eprintln!("  {}", invalid);
        }
        if invalid_lines.len() > 5 {
            eprintln!("  ... and {} more invalid entries", invalid_lines.len() - 5);
        }
    }

    if handles.is_empty() {
        return Err(HandleCheckError::file_error(
            file_path,
            "No valid handles found in the file",
        ));
    }

    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Helper function with all required fields
    fn create_test_args() -> Args {
        Args {
            file: None,
            valid_file: None,
            nonvalid_file: None,
            json: false,
            pretty: false,
            concurrency: 20,
            chunk_size: 20,
            pause: 4,
            retries: 3,
            timeout: None,
            base_url: None,
            config: None,
            debug: false,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_args_defaults_ok() {
        let args = create_test_args();
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_concurrency_bounds() {
        let mut args = create_test_args();
        args.concurrency = 0;
        assert!(validate_args(&args).is_err());

        args.concurrency = 101;
        assert!(validate_args(&args).is_err());

        args.concurrency = 100;
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_json_pretty_conflict() {
        let mut args = create_test_args();
        args.json = true;
        args.pretty = true;
        let result = validate_args(&args);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("--json"));
    }

    #[test]
    fn test_validate_args_bad_timeout() {
        let mut args = create_test_args();
        args.timeout = Some("fast".to_string());
        assert!(validate_args(&args).is_err());

        args.timeout = Some("30s".to_string());
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_build_config_cli_overrides() {
        let mut args = create_test_args();
        args.concurrency = 5;
        args.chunk_size = 10;
        args.pause = 1;
        args.retries = 2;
        args.timeout = Some("30s".to_string());
        args.base_url = Some("http://localhost:9999".to_string());

        let config =
            build_config(&args, &EnvConfig::default(), &FileConfig::default()).unwrap();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.pause_between_chunks, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_build_config_defaults_preserved() {
        let args = create_test_args();
        let config =
            build_config(&args, &EnvConfig::default(), &FileConfig::default()).unwrap();
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.chunk_size, 20);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_build_config_env_beats_file() {
        let args = create_test_args();

        let file_config = FileConfig {
            defaults: Some(handle_check_lib::DefaultsConfig {
                concurrency: Some(5),
                chunk_size: Some(5),
                ..Default::default()
            }),
            output: None,
        };
        let env_config = EnvConfig {
            concurrency: Some(50),
            ..Default::default()
        };

        let config = build_config(&args, &env_config, &file_config).unwrap();
        assert_eq!(config.concurrency, 50, "env wins over file");
        assert_eq!(config.chunk_size, 5, "file survives when env is unset");
    }

    #[test]
    fn test_build_config_cli_beats_env() {
        let mut args = create_test_args();
        args.concurrency = 7;

        let env_config = EnvConfig {
            concurrency: Some(50),
            ..Default::default()
        };

        let config = build_config(&args, &env_config, &FileConfig::default()).unwrap();
        assert_eq!(config.concurrency, 7, "CLI wins over env");
    }

    #[test]
    fn test_resolve_output_paths_defaults() {
        let args = create_test_args();
        let (valid, nonvalid) =
            resolve_output_paths(&args, &EnvConfig::default(), &FileConfig::default());
        assert_eq!(valid, "valid.txt");
        assert_eq!(nonvalid, "nonvalid.txt");
    }

    #[test]
    fn test_resolve_output_paths_cli_wins() {
        let mut args = create_test_args();
        args.valid_file = Some("found.txt".to_string());

        let env_config = EnvConfig {
            valid_file: Some("env.txt".to_string()),
            nonvalid_file: Some("env-nonvalid.txt".to_string()),
            ..Default::default()
        };

        let (valid, nonvalid) = resolve_output_paths(&args, &env_config, &FileConfig::default());
        assert_eq!(valid, "found.txt", "CLI wins");
        assert_eq!(nonvalid, "env-nonvalid.txt", "env fills the gap");
    }

    #[test]
    fn test_read_handles_skips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice\n\n# comment\nbob\n   \ncarol").unwrap();

        let handles = read_handles_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(handles, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_read_handles_rejects_whitespace_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice\ntwo words\nbob").unwrap();

        let handles = read_handles_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(handles, vec!["alice", "bob"]);
    }

    #[test]
    fn test_read_handles_missing_file() {
        let result = read_handles_from_file("/nonexistent/usernames.txt");
        assert!(matches!(result, Err(HandleCheckError::FileError { .. })));
    }

    #[test]
    fn test_read_handles_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = read_handles_from_file(file.path().to_str().unwrap());
        assert!(matches!(result, Err(HandleCheckError::FileError { .. })));
    }
}
