//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, and merging them with proper precedence rules.
//! Everything is validated here, before any URL is checked.

use crate::error::UrlStatusError;
use crate::ratelimit::RateLimitRegistry;
use crate::types::{CheckConfig, OutputFormat};
use crate::utils::parse_timeout_string;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix shared by all environment variables the tool reads.
pub const ENV_PREFIX: &str = "URL_STATUS_";

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Worker pool size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-request timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Accept invalid TLS certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_ssl_errors: Option<bool>,

    /// Rate limit specs, `rate` or `domain:rate`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Vec<String>>,

    /// Redirects to follow per request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<usize>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// "csv" or "json"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Include the CSV header row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_headers: Option<bool>,
}

impl FileConfig {
    /// Overlay the values set in this file onto `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> Result<CheckConfig, UrlStatusError> {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(timeout) = &defaults.timeout {
                config.timeout = parse_timeout_string(timeout).ok_or_else(|| {
                    UrlStatusError::config(format!("Invalid timeout format '{}'", timeout))
                })?;
            }
            if let Some(ignore) = defaults.ignore_ssl_errors {
                config.ignore_tls_errors = ignore;
            }
            if let Some(rate) = &defaults.rate {
                config.rate_limits = rate.clone();
            }
            if let Some(max_redirects) = defaults.max_redirects {
                config.max_redirects = max_redirects;
            }
        }

        if let Some(output) = &self.output {
            if let Some(format) = &output.format {
                config.format = format.parse()?;
            }
            if let Some(headers) = output.csv_headers {
                config.csv_headers = headers;
            }
        }

        Ok(config)
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, UrlStatusError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(UrlStatusError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            UrlStatusError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;

        // Validate the loaded configuration
        self.validate_config(&config)?;

        if self.verbose {
            tracing::info!(path = %path.display(), "loaded configuration file");
        }

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that exist but fail to parse or validate are reported as
    /// errors rather than skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, UrlStatusError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        // XDG config (lowest precedence), then global, then local
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if self.verbose && loaded_files.len() > 1 {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "merged configuration file");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./url-status.toml", "./.url-status.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".url-status.toml", "url-status.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("url-status").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win field by field.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    concurrency: higher.concurrency.or(lower.concurrency),
                    timeout: higher.timeout.or(lower.timeout),
                    ignore_ssl_errors: higher.ignore_ssl_errors.or(lower.ignore_ssl_errors),
                    rate: higher.rate.or(lower.rate),
                    max_redirects: higher.max_redirects.or(lower.max_redirects),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputConfig {
                    format: higher.format.or(lower.format),
                    csv_headers: higher.csv_headers.or(lower.csv_headers),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), UrlStatusError> {
        if let Some(defaults) = &config.defaults {
            if defaults.concurrency == Some(0) {
                return Err(UrlStatusError::config("Concurrency must be at least 1"));
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(UrlStatusError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if let Some(rate) = &defaults.rate {
                RateLimitRegistry::from_specs(rate)?;
            }
        }

        if let Some(format) = config.output.as_ref().and_then(|o| o.format.as_ref()) {
            format.parse::<OutputFormat>()?;
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `URL_STATUS_*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<String>,
    pub ignore_ssl_errors: Option<bool>,
    pub rate: Option<Vec<String>>,
    pub format: Option<OutputFormat>,
    pub csv_headers: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values set in the environment onto `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> CheckConfig {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout.as_deref().and_then(parse_timeout_string) {
            config.timeout = timeout;
        }
        if let Some(ignore) = self.ignore_ssl_errors {
            config.ignore_tls_errors = ignore;
        }
        if let Some(rate) = &self.rate {
            config.rate_limits = rate.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(headers) = self.csv_headers {
            config.csv_headers = headers;
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        let key = format!("{}{}", ENV_PREFIX, name);
        lookup(&key).map(|value| (key, value))
    };
    let mut env_config = EnvConfig::default();

    if let Some((key, val)) = get("CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if concurrency > 0 => env_config.concurrency = Some(concurrency),
            _ => tracing::warn!("Invalid {}='{}', must be a positive integer", key, val),
        }
    }

    if let Some((key, val)) = get("TIMEOUT") {
        if parse_timeout_string(&val).is_some() {
            env_config.timeout = Some(val);
        } else {
            tracing::warn!("Invalid {}='{}', use format like '5s', '30s', '2m'", key, val);
        }
    }

    if let Some((key, val)) = get("IGNORE_SSL_ERRORS") {
        env_config.ignore_ssl_errors = parse_bool_var(&key, &val);
    }

    if let Some((key, val)) = get("RATE") {
        let specs: Vec<String> = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        match RateLimitRegistry::from_specs(&specs) {
            Ok(_) if !specs.is_empty() => env_config.rate = Some(specs),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring {}: {}", key, e),
        }
    }

    if let Some((key, val)) = get("FORMAT") {
        match val.parse::<OutputFormat>() {
            Ok(format) => env_config.format = Some(format),
            Err(e) => tracing::warn!("Ignoring {}: {}", key, e),
        }
    }

    if let Some((key, val)) = get("CSV_HEADERS") {
        env_config.csv_headers = parse_bool_var(&key, &val);
    }

    if let Some((_, path)) = get("CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    env_config
}

fn parse_bool_var(key: &str, val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Invalid {}='{}', use true/false", key, val);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn env_from(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_env_config_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
concurrency = 50
timeout = "15s"
ignore_ssl_errors = true
rate = ["example.com:1", "20"]

[output]
format = "json"
csv_headers = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let check = config.apply_to(CheckConfig::default()).unwrap();
        assert_eq!(check.concurrency, 50);
        assert_eq!(check.timeout, Duration::from_secs(15));
        assert!(check.ignore_tls_errors);
        assert_eq!(check.rate_limits, vec!["example.com:1", "20"]);
        assert_eq!(check.format, OutputFormat::Json);
        assert!(check.csv_headers);
    }

    #[test]
    fn test_invalid_concurrency() {
        let temp_file = write_config("[defaults]\nconcurrency = 0\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(UrlStatusError::ConfigError { .. })));
    }

    #[test]
    fn test_invalid_rate_in_file() {
        let temp_file = write_config("[defaults]\nrate = [\"example.com:fast\"]\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(UrlStatusError::InvalidRate { .. })));
    }

    #[test]
    fn test_invalid_format_and_timeout() {
        let manager = ConfigManager::new(false);

        let bad_format = write_config("[output]\nformat = \"xml\"\n");
        assert!(manager.load_file(bad_format.path()).is_err());

        let bad_timeout = write_config("[defaults]\ntimeout = \"soon\"\n");
        assert!(manager.load_file(bad_timeout.path()).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_file = write_config("[defaults\nconcurrency = ");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(UrlStatusError::ConfigError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new(false).load_file("/no/such/url-status.toml");
        assert!(matches!(result, Err(UrlStatusError::FileError { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(10),
                rate: Some(vec!["5".to_string()]),
                ignore_ssl_errors: Some(false),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                format: Some("json".to_string()),
                csv_headers: None,
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(25),
                ignore_ssl_errors: Some(true),
                ..Default::default()
            }),
            output: None,
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(25)); // Higher wins
        assert_eq!(defaults.rate, Some(vec!["5".to_string()])); // Lower preserved
        assert_eq!(defaults.ignore_ssl_errors, Some(true)); // Higher wins
        assert_eq!(merged.output.unwrap().format, Some("json".to_string()));
    }

    #[test]
    fn test_env_config() {
        let env = env_from(&[
            ("URL_STATUS_CONCURRENCY", "64"),
            ("URL_STATUS_TIMEOUT", "3s"),
            ("URL_STATUS_IGNORE_SSL_ERRORS", "yes"),
            ("URL_STATUS_RATE", "example.com:2, 10"),
            ("URL_STATUS_FORMAT", "json"),
        ]);

        assert_eq!(env.concurrency, Some(64));
        assert_eq!(env.ignore_ssl_errors, Some(true));
        assert_eq!(
            env.rate,
            Some(vec!["example.com:2".to_string(), "10".to_string()])
        );

        let check = env.apply_to(CheckConfig::default());
        assert_eq!(check.concurrency, 64);
        assert_eq!(check.timeout, Duration::from_secs(3));
        assert!(check.ignore_tls_errors);
        assert_eq!(check.format, OutputFormat::Json);
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let env = env_from(&[
            ("URL_STATUS_CONCURRENCY", "0"),
            ("URL_STATUS_TIMEOUT", "whenever"),
            ("URL_STATUS_IGNORE_SSL_ERRORS", "maybe"),
            ("URL_STATUS_RATE", "example.com:x"),
            ("URL_STATUS_FORMAT", "yaml"),
        ]);
        assert_eq!(env, EnvConfig::default());
    }
}
