//! Configuration types for gitfs.
//!
//! This module defines the structures used to represent configuration as
//! parsed from an INI-format config file.

// =============================================================================
// Primitive Types
// =============================================================================

/// A limit that can be disabled or set.
///
/// - `Disabled`: Explicitly set to "none"; no bound is applied
/// - `Value(T)`: Specific limit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit<T> {
    Disabled,
    Value(T),
}

impl<T: Copy> Limit<T> {
    /// The limit value, or `None` when disabled.
    pub fn value(&self) -> Option<T> {
        match self {
            Limit::Disabled => None,
            Limit::Value(v) => Some(*v),
        }
    }
}

// =============================================================================
// Config Sections
// =============================================================================

/// [github] section - remote API access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    pub api_url: String,
    /// Bearer token; falls back to the GITHUB_TOKEN environment variable.
    pub token: Option<String>,
}

/// [network] section - bounds on remote requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub max_concurrent_requests: Limit<u32>,
}

/// [tree] section - how trees are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Download all content while building instead of on first read.
    pub prefetch: bool,
    /// Include patterns; empty includes everything.
    pub glob: Vec<String>,
}

// =============================================================================
// Root Config
// =============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub github: GithubConfig,
    pub network: NetworkConfig,
    pub tree: TreeConfig,
}
