// src/sources/virustotal.rs
use crate::session::Session;
use crate::sources::{qualify, Source};
use crate::types::{LeviathanError, SourceInfo};
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::Value;

const VIRUSTOTAL_URL: &str = "https://www.virustotal.com/api/v3";

/// VirusTotal answers `{"data": [...]}`; Amass-style mirrors answer a flat array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VirusTotalResponse {
    Flat(Vec<Value>),
    Wrapped {
        #[serde(default)]
        data: Vec<Value>,
    },
}

impl VirusTotalResponse {
    fn entries(&self) -> &[Value] {
        match self {
            VirusTotalResponse::Flat(entries) => entries,
            VirusTotalResponse::Wrapped { data } => data,
        }
    }
}

/// An entry is either a bare string or a domain object identified by `id`.
fn entry_name(entry: &Value) -> Option<&str> {
    entry
        .as_str()
        .or_else(|| entry.get("id").and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn parse(response: &VirusTotalResponse, domain: &str) -> Vec<String> {
    response
        .entries()
        .iter()
        .filter_map(entry_name)
        .map(|name| qualify(name, domain))
        .collect()
}

#[derive(Debug, Clone)]
pub struct VirusTotalSource {
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl Default for VirusTotalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VirusTotalSource {
    pub fn new() -> Self {
        Self {
            name: "virustotal".to_string(),
            api_key: None,
            base_url: VIRUSTOTAL_URL.to_string(),
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
impl Source for VirusTotalSource {
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
            "{}/domains/{}/subdomains?limit=40",
            self.base_url.trim_end_matches('/'),
            domain
        );
        let request = session
            .client
            .get(&url)
            .header("x-apikey", api_key)
            .header("Accept", "application/json");

        let response: VirusTotalResponse = session.get_json(request, &self.name).await?;
        let results = parse(&response, domain);

        info!("[{}] Received {} subdomains", self.name, results.len());
        Ok(results)
    }
}
