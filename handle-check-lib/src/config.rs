//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and environment
//! variables, and merging configurations with proper precedence rules.

use crate::error::HandleCheckError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// This represents the structure of configuration files that users can create
/// to set default values for runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output partition paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Default concurrency level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Default batch size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Default base pause between batches, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause: Option<u64>,

    /// Default attempts per handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    /// Default request timeout (as string, e.g., "10s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Default base URL of the remote service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Default pretty output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

/// Output partition configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Path of the valid (available) partition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_file: Option<String>,

    /// Path of the non-valid (taken/undetermined) partition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonvalid_file: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to emit warnings for config issues
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if parsing fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HandleCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HandleCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HandleCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig =
            toml::from_str(&content).map_err(|e| HandleCheckError::ConfigError {
                message: format!("Failed to parse TOML configuration: {}", e),
            })?;

        // Validate the loaded configuration
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Looks for configuration files in standard locations and merges them
    /// according to precedence rules (local wins over home wins over XDG).
    pub fn discover_and_load(&self) -> Result<FileConfig, HandleCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        // 1. Load XDG config (lowest precedence)
        if let Some(xdg_path) = self.get_xdg_config_path() {
            if let Ok(config) = self.load_file(&xdg_path) {
                merged_config = self.merge_configs(merged_config, config);
                loaded_files.push(xdg_path);
            }
        }

        // 2. Load global config
        if let Some(global_path) = self.get_global_config_path() {
            if let Ok(config) = self.load_file(&global_path) {
                merged_config = self.merge_configs(merged_config, config);
                loaded_files.push(global_path);
            }
        }

        // 3. Load local config (highest precedence)
        if let Some(local_path) = self.get_local_config_path() {
            if let Ok(config) = self.load_file(&local_path) {
                merged_config = self.merge_configs(merged_config, config);
                loaded_files.push(local_path);
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            eprintln!("Multiple config files found. Using precedence:");
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "active"
                } else {
                    "overridden"
                };
                eprintln!("   {} ({})", path.display(), status);
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./handle-check.toml", "./.handle-check.toml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }

        None
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        if let Some(home) = env::var_os("HOME") {
            let candidates = [".handle-check.toml", "handle-check.toml"];

            for candidate in &candidates {
                let path = Path::new(&home).join(candidate);
                if path.exists() {
                    return Some(path);
                }
            }
        }

        None
    }

    /// Get the XDG configuration file path.
    ///
    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("handle-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.chunk_size.is_some() {
                        lower_defaults.chunk_size = higher_defaults.chunk_size;
                    }
                    if higher_defaults.pause.is_some() {
                        lower_defaults.pause = higher_defaults.pause;
                    }
                    if higher_defaults.retries.is_some() {
                        lower_defaults.retries = higher_defaults.retries;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.base_url.is_some() {
                        lower_defaults.base_url = higher_defaults.base_url;
                    }
                    if higher_defaults.pretty.is_some() {
                        lower_defaults.pretty = higher_defaults.pretty;
                    }
                    Some(lower_defaults)
                }
                (None, Some(higher_defaults)) => Some(higher_defaults),
                (Some(lower_defaults), None) => Some(lower_defaults),
                (None, None) => None,
            },
            output: match (lower.output, higher.output) {
                (Some(mut lower_output), Some(higher_output)) => {
                    if higher_output.valid_file.is_some() {
                        lower_output.valid_file = higher_output.valid_file;
                    }
                    if higher_output.nonvalid_file.is_some() {
                        lower_output.nonvalid_file = higher_output.nonvalid_file;
                    }
                    Some(lower_output)
                }
                (None, Some(higher_output)) => Some(higher_output),
                (Some(lower_output), None) => Some(lower_output),
                (None, None) => None,
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), HandleCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(HandleCheckError::ConfigError {
                        message: "Concurrency must be between 1 and 100".to_string(),
                    });
                }
            }

            if let Some(chunk_size) = defaults.chunk_size {
                if chunk_size == 0 {
                    return Err(HandleCheckError::ConfigError {
                        message: "Chunk size must be at least 1".to_string(),
                    });
                }
            }

            if let Some(retries) = defaults.retries {
                if retries == 0 {
                    return Err(HandleCheckError::ConfigError {
                        message: "Retries must be at least 1".to_string(),
                    });
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(HandleCheckError::ConfigError {
                        message: format!(
                            "Invalid timeout format '{}'. Use format like '10s', '30s', '2m'",
                            timeout_str
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via HC_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub chunk_size: Option<usize>,
    pub pause: Option<u64>,
    pub retries: Option<u32>,
    pub timeout: Option<String>,
    pub base_url: Option<String>,
    pub pretty: Option<bool>,
    pub file: Option<String>,
    pub valid_file: Option<String>,
    pub nonvalid_file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Parses all HC_* environment variables and returns a structured
/// configuration. Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    let mut env_config = EnvConfig::default();

    // HC_CONCURRENCY - concurrent fetches
    if let Ok(val) = env::var("HC_CONCURRENCY") {
        match val.parse::<usize>() {
            Ok(concurrency) if concurrency > 0 && concurrency <= 100 => {
                env_config.concurrency = Some(concurrency);
                if verbose {
                    println!("Using HC_CONCURRENCY={}", concurrency);
                }
            }
            _ => {
                if verbose {
                    eprintln!("Invalid HC_CONCURRENCY='{}', must be 1-100", val);
                }
            }
        }
    }

    // HC_CHUNK_SIZE - handles per batch
    if let Ok(val) = env::var("HC_CHUNK_SIZE") {
        match val.parse::<usize>() {
            Ok(chunk_size) if chunk_size > 0 => {
                env_config.chunk_size = Some(chunk_size);
                if verbose {
                    println!("Using HC_CHUNK_SIZE={}", chunk_size);
                }
            }
            _ => {
                if verbose {
                    eprintln!("Invalid HC_CHUNK_SIZE='{}', must be at least 1", val);
                }
            }
        }
    }

    // HC_PAUSE - base pause between batches, in seconds
    if let Ok(val) = env::var("HC_PAUSE") {
        match val.parse::<u64>() {
            Ok(pause) => {
                env_config.pause = Some(pause);
                if verbose {
                    println!("Using HC_PAUSE={}", pause);
                }
            }
            _ => {
                if verbose {
                    eprintln!("Invalid HC_PAUSE='{}', must be whole seconds", val);
                }
            }
        }
    }

    // HC_RETRIES - attempts per handle
    if let Ok(val) = env::var("HC_RETRIES") {
        match val.parse::<u32>() {
            Ok(retries) if retries > 0 => {
                env_config.retries = Some(retries);
                if verbose {
                    println!("Using HC_RETRIES={}", retries);
                }
            }
            _ => {
                if verbose {
                    eprintln!("Invalid HC_RETRIES='{}', must be at least 1", val);
                }
            }
        }
    }

    // HC_TIMEOUT - request timeout
    if let Ok(timeout_str) = env::var("HC_TIMEOUT") {
        if parse_timeout_string(&timeout_str).is_some() {
            env_config.timeout = Some(timeout_str.clone());
            if verbose {
                println!("Using HC_TIMEOUT={}", timeout_str);
            }
        } else if verbose {
            eprintln!(
                "Invalid HC_TIMEOUT='{}', use format like '10s', '30s', '2m'",
                timeout_str
            );
        }
    }

    // HC_BASE_URL - remote service base URL
    if let Ok(base_url) = env::var("HC_BASE_URL") {
        if !base_url.trim().is_empty() {
            env_config.base_url = Some(base_url.trim().to_string());
            if verbose {
                println!("Using HC_BASE_URL={}", env_config.base_url.as_deref().unwrap_or(""));
            }
        }
    }

    // HC_PRETTY - enable pretty output
    if let Ok(val) = env::var("HC_PRETTY") {
        match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => env_config.pretty = Some(true),
            "false" | "0" | "no" | "off" => env_config.pretty = Some(false),
            _ => {
                if verbose {
                    eprintln!("Invalid HC_PRETTY='{}', use true/false", val);
                }
            }
        }
    }

    // HC_FILE - input handle list
    if let Ok(file) = env::var("HC_FILE") {
        if !file.trim().is_empty() {
            env_config.file = Some(file.trim().to_string());
        }
    }

    // HC_VALID_FILE / HC_NONVALID_FILE - output partitions
    if let Ok(file) = env::var("HC_VALID_FILE") {
        if !file.trim().is_empty() {
            env_config.valid_file = Some(file.trim().to_string());
        }
    }
    if let Ok(file) = env::var("HC_NONVALID_FILE") {
        if !file.trim().is_empty() {
            env_config.nonvalid_file = Some(file.trim().to_string());
        }
    }

    // HC_CONFIG - explicit config file path
    if let Ok(config) = env::var("HC_CONFIG") {
        if !config.trim().is_empty() {
            env_config.config = Some(config.trim().to_string());
        }
    }

    env_config
}

/// Parse a timeout string like "10s", "30s", "2m" into a duration.
///
/// A bare number is taken as seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(stripped) = timeout_str.strip_suffix('s') {
        stripped.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(stripped) = timeout_str.strip_suffix('m') {
        stripped
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string("15"), Some(Duration::from_secs(15)));
        assert_eq!(parse_timeout_string(" 30S "), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("abc"), None);
        assert_eq!(parse_timeout_string(""), None);
    }

    #[test]
    fn test_load_valid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[defaults]
concurrency = 10
chunk_size = 5
pause = 2
retries = 4
timeout = "15s"

[output]
valid_file = "found.txt"
"#
        )
        .unwrap();

        let manager = ConfigManager::new(false);
        let config = manager.load_file(file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(10));
        assert_eq!(defaults.chunk_size, Some(5));
        assert_eq!(defaults.pause, Some(2));
        assert_eq!(defaults.retries, Some(4));
        assert_eq!(defaults.timeout.as_deref(), Some("15s"));

        let output = config.output.unwrap();
        assert_eq!(output.valid_file.as_deref(), Some("found.txt"));
        assert_eq!(output.nonvalid_file, None);
    }

    #[test]
    fn test_invalid_concurrency_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\nconcurrency = 0").unwrap();

        let manager = ConfigManager::new(false);
        let result = manager.load_file(file.path());
        assert!(matches!(result, Err(HandleCheckError::ConfigError { .. })));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\ntimeout = \"fast\"").unwrap();

        let manager = ConfigManager::new(false);
        let result = manager.load_file(file.path());
        assert!(matches!(result, Err(HandleCheckError::ConfigError { .. })));
    }

    #[test]
    fn test_missing_config_file() {
        let manager = ConfigManager::new(false);
        let result = manager.load_file("/nonexistent/handle-check.toml");
        assert!(matches!(result, Err(HandleCheckError::FileError { .. })));
    }

    #[test]
    fn test_merge_higher_wins() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(5),
                chunk_size: Some(10),
                ..Default::default()
            }),
            output: None,
        };
        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(50),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                valid_file: Some("v.txt".into()),
                nonvalid_file: None,
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(50), "higher wins");
        assert_eq!(defaults.chunk_size, Some(10), "lower survives when unset");
        assert_eq!(merged.output.unwrap().valid_file.as_deref(), Some("v.txt"));
    }
}
