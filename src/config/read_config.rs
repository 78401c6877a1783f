//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format configuration files,
//! with support for layered overrides.

use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::{Config, GithubConfig, Limit, NetworkConfig, TreeConfig};
use crate::github::DEFAULT_API_URL;

// =============================================================================
// Constants - Default Values
// =============================================================================

const DEFAULT_NETWORK_MAX_CONCURRENT_REQUESTS: u32 = 16;
const DEFAULT_TREE_PREFETCH: bool = false;

const ENV_CONFIG_FILE: &str = "GITFS_CONFIG_FILE";
const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
const DEFAULT_CONFIG_FILENAME: &str = ".gitfsconfig";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid integer '{value}': {source}")]
    InvalidInteger {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist, error.
    /// If None, fall back to GITFS_CONFIG_FILE env var, then ~/.gitfsconfig.
    pub config_file: Option<PathBuf>,

    /// Additional override config file (layered on top of base config).
    pub override_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "github.api_url", "tree.prefetch"
    pub overrides: Vec<(String, String)>,
}

// =============================================================================
// Value Parsing
// =============================================================================

fn parse_limit_value_u32(value: &str) -> Result<Limit<u32>> {
    if value.trim().eq_ignore_ascii_case("none") {
        Ok(Limit::Disabled)
    } else {
        let v: u32 = value.trim().parse().map_err(|e| ConfigError::InvalidInteger {
            value: value.to_string(),
            source: e,
        })?;
        Ok(Limit::Value(v))
    }
}

fn parse_bool_value(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Information about how the config file was resolved.
#[derive(Debug)]
struct ResolvedConfigFile {
    /// The path to the config file, if one was found.
    path: Option<PathBuf>,
    /// Warning message if env var pointed to nonexistent file.
    warning: Option<String>,
}

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(source: &ConfigSource) -> Result<ResolvedConfigFile> {
    // If explicit path provided, it must exist
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path.clone()),
                warning: None,
            });
        } else {
            return Err(ConfigError::FileNotFound(path.clone()));
        }
    }

    if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path),
                warning: None,
            });
        }
        // Warn but continue with defaults
        return Ok(ResolvedConfigFile {
            path: None,
            warning: Some(format!(
                "config file specified by {} does not exist: {}",
                ENV_CONFIG_FILE, env_path
            )),
        });
    }

    if let Some(home) = home_dir() {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(default_path),
                warning: None,
            });
        }
    }

    Ok(ResolvedConfigFile {
        path: None,
        warning: None,
    })
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
fn default_config() -> Config {
    Config {
        github: GithubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        },
        network: NetworkConfig {
            max_concurrent_requests: Limit::Value(DEFAULT_NETWORK_MAX_CONCURRENT_REQUESTS),
        },
        tree: TreeConfig {
            prefetch: DEFAULT_TREE_PREFETCH,
            glob: Vec::new(),
        },
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

// =============================================================================
// INI Parsing
// =============================================================================

/// Apply an INI file's contents to a Config, layering on top of existing values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    // [github] section
    if let Some(api_url) = ini.get("github", "api_url") {
        config.github.api_url = api_url;
    }
    if let Some(token) = ini.get("github", "token") {
        config.github.token = Some(token);
    }

    // [network] section
    if let Some(v) = ini.get("network", "max_concurrent_requests") {
        config.network.max_concurrent_requests = parse_limit_value_u32(&v)?;
    }

    // [tree] section
    if let Some(v) = ini.get("tree", "prefetch") {
        config.tree.prefetch = parse_bool_value("prefetch", &v)?;
    }
    if let Some(v) = ini.get("tree", "glob") {
        config.tree.glob = parse_comma_separated(&v);
    }

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Override Application
// =============================================================================

/// Apply a single key=value override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.splitn(2, '.').collect();

    match parts.as_slice() {
        // github.api_url, github.token
        ["github", param] => apply_github_override(config, param, value),

        // network.max_concurrent_requests
        ["network", param] => apply_network_override(config, param, value),

        // tree.prefetch, tree.glob
        ["tree", param] => apply_tree_override(config, param, value),

        _ => Err(ConfigError::InvalidOverrideKey {
            key: key.to_string(),
            message: "unrecognized key format".to_string(),
        }),
    }
}

fn apply_github_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "api_url" => {
            config.github.api_url = value.to_string();
            Ok(())
        }
        "token" => {
            config.github.token = Some(value.to_string());
            Ok(())
        }
        _ => Err(unknown_parameter("github", param)),
    }
}

fn apply_network_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "max_concurrent_requests" => {
            config.network.max_concurrent_requests = parse_limit_value_u32(value)?;
            Ok(())
        }
        _ => Err(unknown_parameter("network", param)),
    }
}

fn apply_tree_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "prefetch" => {
            config.tree.prefetch = parse_bool_value(param, value)?;
            Ok(())
        }
        "glob" => {
            config.tree.glob = parse_comma_separated(value);
            Ok(())
        }
        _ => Err(unknown_parameter("tree", param)),
    }
}

fn unknown_parameter(section: &str, param: &str) -> ConfigError {
    ConfigError::InvalidOverrideKey {
        key: format!("{}.{}", section, param),
        message: "unknown parameter".to_string(),
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Result of reading configuration, including any warnings.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Any warnings generated during config loading.
    pub warnings: Vec<String>,
}

/// Read and parse configuration from the specified sources.
///
/// Configuration is layered in this order:
/// 1. Built-in defaults
/// 2. Base config file (from CLI, env var, or ~/.gitfsconfig)
/// 3. Override config file (if specified)
/// 4. Individual overrides (applied last)
///
/// A token still unset after all layers is taken from GITHUB_TOKEN.
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    let mut warnings = Vec::new();

    let mut config = default_config();

    let resolved = resolve_config_file(source)?;
    if let Some(warning) = resolved.warning {
        warnings.push(warning);
    }
    if let Some(ref path) = resolved.path {
        let ini = load_ini(path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    if let Some(ref override_path) = source.override_file {
        if !override_path.exists() {
            return Err(ConfigError::FileNotFound(override_path.clone()));
        }
        let ini = load_ini(override_path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    if config.github.token.is_none() {
        config.github.token = env::var(ENV_GITHUB_TOKEN).ok().filter(|t| !t.is_empty());
    }

    Ok(ConfigResult { config, warnings })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.token, None);
        assert_eq!(config.network.max_concurrent_requests, Limit::Value(16));
        assert!(!config.tree.prefetch);
        assert!(config.tree.glob.is_empty());
    }

    #[test]
    fn test_apply_override_github() {
        let mut config = default_config();
        apply_override(&mut config, "github.api_url", "http://localhost:8080").unwrap();
        apply_override(&mut config, "github.token", "secret").unwrap();
        assert_eq!(config.github.api_url, "http://localhost:8080");
        assert_eq!(config.github.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_apply_override_network() {
        let mut config = default_config();
        apply_override(&mut config, "network.max_concurrent_requests", "100").unwrap();
        assert_eq!(config.network.max_concurrent_requests, Limit::Value(100));

        apply_override(&mut config, "network.max_concurrent_requests", "none").unwrap();
        assert_eq!(config.network.max_concurrent_requests, Limit::Disabled);
        assert_eq!(config.network.max_concurrent_requests.value(), None);

        assert!(matches!(
            apply_override(&mut config, "network.max_concurrent_requests", "many"),
            Err(ConfigError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_apply_override_tree() {
        let mut config = default_config();
        apply_override(&mut config, "tree.prefetch", "yes").unwrap();
        apply_override(&mut config, "tree.glob", "*.md, static/*,").unwrap();
        assert!(config.tree.prefetch);
        assert_eq!(config.tree.glob, vec!["*.md", "static/*"]);

        assert!(matches!(
            apply_override(&mut config, "tree.prefetch", "maybe"),
            Err(ConfigError::InvalidBoolean { .. })
        ));
    }

    #[test]
    fn test_apply_override_bad_keys() {
        let mut config = default_config();
        for key in ["prefetch", "tree.unknown", "cache.path", "github"] {
            assert!(
                matches!(
                    apply_override(&mut config, key, "x"),
                    Err(ConfigError::InvalidOverrideKey { .. })
                ),
                "{}",
                key
            );
        }
    }

    #[test]
    fn test_parse_ini_config() {
        let mut ini = Ini::new();
        ini.read(
            r#"
[github]
api_url = https://github.example.com/api/v3
token = abc

[network]
max_concurrent_requests = none

[tree]
prefetch = true
glob = *.html, static/*
"#
            .to_string(),
        )
        .unwrap();

        let mut config = default_config();
        apply_ini_to_config(&mut config, &ini).unwrap();

        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.network.max_concurrent_requests, Limit::Disabled);
        assert!(config.tree.prefetch);
        assert_eq!(config.tree.glob, vec!["*.html", "static/*"]);
    }

    #[test]
    fn test_read_config_layers() {
        let base = write_config("[network]\nmax_concurrent_requests = 4\n[tree]\nprefetch = true\n");
        let overrides = write_config("[network]\nmax_concurrent_requests = 8\n");
        let source = ConfigSource {
            config_file: Some(base.path().to_path_buf()),
            override_file: Some(overrides.path().to_path_buf()),
            overrides: vec![("tree.prefetch".to_string(), "false".to_string())],
        };

        let result = read_config(&source).unwrap();
        assert!(result.warnings.is_empty());
        assert_eq!(result.config.network.max_concurrent_requests, Limit::Value(8));
        assert!(!result.config.tree.prefetch);
    }

    #[test]
    fn test_read_config_missing_files() {
        let source = ConfigSource {
            config_file: Some(PathBuf::from("/nonexistent/gitfsconfig")),
            ..Default::default()
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::FileNotFound(_))
        ));

        let base = write_config("");
        let source = ConfigSource {
            config_file: Some(base.path().to_path_buf()),
            override_file: Some(PathBuf::from("/nonexistent/override")),
            overrides: Vec::new(),
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
