// src/sources/securitytrails.rs
use crate::session::Session;
use crate::sources::{join_label, strings, Source};
use crate::types::{LeviathanError, SourceInfo};
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

const SECURITYTRAILS_URL: &str = "https://api.securitytrails.com/v1";

#[derive(Debug, Deserialize)]
struct SecurityTrailsResponse {
    meta: Option<SecurityTrailsMeta>,
    #[serde(default)]
    subdomains: Vec<Value>,
    subdomain_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SecurityTrailsMeta {
    limit_reached: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SecurityTrailsSource {
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl Default for SecurityTrailsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityTrailsSource {
    pub fn new() -> Self {
        Self {
            name: "securitytrails".to_string(),
            api_key: None,
            base_url: SECURITYTRAILS_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse(&self, response: SecurityTrailsResponse, domain: &str) -> Vec<String> {
        if let Some(true) = response.meta.and_then(|m| m.limit_reached) {
            warn!(
                "[{}] Result limit reached. Total subdomains: {:?}",
                self.name, response.subdomain_count
            );
        }

        strings(&response.subdomains)
            .map(|label| join_label(label, domain))
            .collect()
    }
}

#[async_trait]
impl Source for SecurityTrailsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            needs_key: true,
            is_default: true,
        }
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, session: &Session) -> Result<Vec<String>, LeviathanError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LeviathanError::SourceError {
            source_name: self.name.to_string(),
            message: "No API key configured".to_string(),
        })?;

        let url = format!(
            "{}/domain/{}/subdomains",
            self.base_url.trim_end_matches('/'),
            domain
        );
        let request = session
            .client
            .get(&url)
            .header("APIKEY", api_key)
            .header("Accept", "application/json");

        let response: SecurityTrailsResponse = session.get_json(request, &self.name).await?;
        let results = self.parse(response, domain);

        info!("[{}] Received {} subdomain labels", self.name, results.len());
        Ok(results)
    }
}
