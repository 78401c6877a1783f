//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::config::{read_config, ConfigError, ConfigSource};
use crate::Options;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the main configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the configuration overrides file.
    #[arg(long = "config-file-overrides", global = true)]
    pub config_file_overrides: Option<PathBuf>,

    /// Configuration overrides in the form name=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Serve the project from the local checkout containing this path.
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    /// Download every file while building the tree.
    #[arg(long, global = true)]
    pub prefetch: bool,

    /// Only include paths matching this pattern. May be repeated.
    #[arg(long, global = true)]
    pub glob: Vec<String>,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    pub fn to_config_source(&self) -> ConfigSource {
        ConfigSource {
            config_file: self.config_file.clone(),
            override_file: self.config_file_overrides.clone(),
            overrides: self.config_overrides.clone(),
        }
    }

    /// Read the configuration and apply the command-line flags on top.
    pub fn to_options(&self) -> Result<Options> {
        let result = read_config(&self.to_config_source())?;
        for warning in &result.warnings {
            warn!("{}", warning);
        }
        Ok(self.apply_flags(Options::from_config(&result.config)))
    }

    fn apply_flags(&self, mut options: Options) -> Options {
        if self.prefetch {
            options = options.with_prefetch(true);
        }
        if !self.glob.is_empty() {
            options = options.with_glob(self.glob.iter().cloned());
        }
        if let Some(local) = &self.local {
            options = options.with_local(local.clone());
        }
        options
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Helper for commands that write output to a file or stdout.
#[derive(Args, Debug, Default)]
pub struct OutputSink {
    /// Write output to this file instead of stdout.
    #[arg(id = "output_file", short = 'o', long = "output-file")]
    pub file: Option<PathBuf>,
}

impl OutputSink {
    /// Write a string value to the output.
    pub async fn write_str(&self, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, value).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(value.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Write raw bytes to the output.
    pub async fn write_bytes(&self, data: &[u8]) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, data).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(data).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_override_format() {
        assert_eq!(
            parse_config_override("tree.glob=a=b").unwrap(),
            ("tree.glob".to_string(), "a=b".to_string())
        );
        assert!(parse_config_override("tree.glob").is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = GlobalArgs {
            prefetch: true,
            glob: vec!["*.md".to_string()],
            ..Default::default()
        };
        let options = args.apply_flags(Options::new().with_glob(["*.txt"]));
        assert!(options.prefetch());
        assert_eq!(options.glob(), ["*.md".to_string()]);

        let options = GlobalArgs::default().apply_flags(Options::new().with_glob(["*.txt"]));
        assert!(!options.prefetch());
        assert_eq!(options.glob(), ["*.txt".to_string()]);
    }
}
