// src/sources/mod.rs
use crate::session::Session;
use crate::types::{Config, LeviathanError, SourceInfo};
use async_trait::async_trait;
use serde_json::Value;

mod certsh;
mod securitytrails;
mod shodan;
mod virustotal;

pub use certsh::CrtShSource;
pub use securitytrails::SecurityTrailsSource;
pub use shodan::ShodanSource;
pub use virustotal::VirusTotalSource;

pub const ALL_SOURCES: [&str; 4] = ["crtsh", "securitytrails", "shodan", "virustotal"];

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    fn info(&self) -> SourceInfo;

    /// Disabled sources are skipped without any network traffic.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Returns raw findings. Normalization and deduplication happen downstream.
    async fn enumerate(&self, domain: &str, session: &Session) -> Result<Vec<String>, LeviathanError>;
    fn clone_source(&self) -> Box<dyn Source>;
}

pub fn create_source(name: &str, config: &Config) -> Option<Box<dyn Source>> {
    let name = name.trim().to_lowercase();
    let api_key = config.api_key(&name).map(str::to_string);

    match name.as_str() {
        "crtsh" => Some(Box::new(CrtShSource::new())),
        "securitytrails" => Some(Box::new(SecurityTrailsSource::new().with_api_key(api_key))),
        "shodan" => Some(Box::new(ShodanSource::new().with_api_key(api_key))),
        "virustotal" => Some(Box::new(VirusTotalSource::new().with_api_key(api_key))),
        _ => None,
    }
}

pub fn get_all_sources(config: &Config) -> Vec<Box<dyn Source>> {
    ALL_SOURCES
        .iter()
        .filter_map(|name| create_source(name, config))
        .collect()
}

/// `label.domain`, used for APIs that return bare labels.
pub(crate) fn join_label(label: &str, domain: &str) -> String {
    format!("{}.{}", label.trim().trim_end_matches('.'), domain)
}

/// Suffixes `name` with the domain unless it is already qualified.
pub(crate) fn qualify(name: &str, domain: &str) -> String {
    let name = name.trim().trim_end_matches('.');
    let lower = name.to_lowercase();
    let domain_lower = domain.to_lowercase();
    if lower == domain_lower || lower.ends_with(&format!(".{}", domain_lower)) {
        name.to_string()
    } else {
        join_label(name, domain)
    }
}

/// String elements of a JSON array; anything else is skipped.
pub(crate) fn strings(values: &[Value]) -> impl Iterator<Item = &str> {
    values.iter().filter_map(Value::as_str).filter(|s| !s.trim().is_empty())
}
