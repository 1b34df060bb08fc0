// src/sources/shodan.rs
use crate::session::Session;
use crate::sources::{join_label, strings, Source};
use crate::types::{LeviathanError, SourceInfo};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

const SHODAN_URL: &str = "https://api.shodan.io";
const MAX_PAGES: u32 = 5;

#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    subdomains: Vec<Value>,
    more: Option<bool>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShodanSource {
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl Default for ShodanSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ShodanSource {
    pub fn new() -> Self {
        Self {
            name: "shodan".to_string(),
            api_key: None,
            base_url: SHODAN_URL.to_string(),
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
}

#[async_trait]
impl Source for ShodanSource {
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

        let url = format!("{}/dns/domain/{}", self.base_url.trim_end_matches('/'), domain);
        let mut results = Vec::new();
        let mut page = 1;

        loop {
            let page_param = page.to_string();
            let request = session
                .client
                .get(&url)
                .query(&[("key", api_key), ("page", page_param.as_str())])
                .header("Accept", "application/json");

            let response: ShodanResponse = match session.get_json(request, &self.name).await {
                Ok(response) => response,
                // Keep what earlier pages produced
                Err(e) if page > 1 => {
                    debug!("[{}] Stopping at page {}: {}", self.name, page, e);
                    break;
                }
                Err(e) => return Err(e),
            };

            if let Some(error) = response.error {
                return Err(LeviathanError::SourceError {
                    source_name: self.name.to_string(),
                    message: format!("Shodan API error: {}", error),
                });
            }

            results.extend(strings(&response.subdomains).map(|label| join_label(label, domain)));

            if response.more == Some(true) && page < MAX_PAGES {
                page += 1;
                continue;
            }
            break;
        }

        info!("[{}] Received {} subdomain labels", self.name, results.len());
        Ok(results)
    }
}
