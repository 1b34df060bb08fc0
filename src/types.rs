// src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 20;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub retry: RetryConfig,
    pub api_keys: HashMap<String, String>,
    pub resolver: ResolverConfig,
    pub sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("Leviathan/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
            retry: RetryConfig::default(),
            api_keys: HashMap::new(),
            resolver: ResolverConfig::default(),
            sources: vec![
                "crtsh".to_string(),
                "securitytrails".to_string(),
                "shodan".to_string(),
                "virustotal".to_string(),
            ],
        }
    }
}

impl Config {
    /// Returns the credential for `source`, treating blank values as absent.
    pub fn api_key(&self, source: &str) -> Option<&str> {
        self.api_keys
            .get(source)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub enabled: bool,
    pub concurrency: usize,
    pub timeout: Duration,
    pub nameservers: Vec<String>,
    pub use_system_resolver: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            nameservers: vec![
                "8.8.8.8:53".to_string(),
                "8.8.4.4:53".to_string(),
                "1.1.1.1:53".to_string(),
                "1.0.0.1:53".to_string(),
            ],
            use_system_resolver: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResult {
    pub subdomain: String,
    pub active: bool,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub name: String,
    pub findings: usize,
    pub accepted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub unique_subdomains: usize,
    pub active_count: Option<usize>,
    pub sources_used: Vec<SourceOutcome>,
    pub sources_skipped: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub domain: String,
    /// Unique subdomains in first-seen order.
    pub subdomains: Vec<String>,
    pub liveness: Option<Vec<LivenessResult>>,
    pub stats: RunStats,
    pub timestamp: String,
}

pub struct SourceInfo {
    pub name: String,
    pub needs_key: bool,
    /// Part of the default source list.
    pub is_default: bool,
}

#[derive(Debug, Error)]
pub enum LeviathanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Proxy {proxy} is unreachable: {message}")]
    ProxyUnreachable {
        proxy: String,
        message: String,
    },

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),
}

impl LeviathanError {
    /// Configuration-class errors abort the run before any source is queried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LeviathanError::ConfigError(_)
                | LeviathanError::ProxyUnreachable { .. }
                | LeviathanError::InvalidDomain(_)
        )
    }
}
