// src/sources/certsh.rs
use crate::session::Session;
use crate::sources::Source;
use crate::types::{LeviathanError, SourceInfo};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const CRTSH_URL: &str = "https://crt.sh";

/// crt.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShSource {
    name: String,
    base_url: String,
}

impl Default for CrtShSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CrtShSource {
    pub fn new() -> Self {
        Self {
            name: "crtsh".to_string(),
            base_url: CRTSH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, domain: &str) -> String {
        format!(
            "{}/?q={}&output=json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&format!("%.{}", domain))
        )
    }
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    #[serde(default)]
    name_value: Value,
}

fn parse_entries(entries: &[Value]) -> Vec<String> {
    let mut results = Vec::new();
    for entry in entries {
        let Ok(entry) = CrtShEntry::deserialize(entry) else {
            continue;
        };
        if let Some(names) = entry.name_value.as_str() {
            // name_value holds one name per line for multi-SAN certificates
            results.extend(
                names
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }
    }
    results
}

#[async_trait]
impl Source for CrtShSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            needs_key: false,
            is_default: true,
        }
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, session: &Session) -> Result<Vec<String>, LeviathanError> {
        let request = session
            .client
            .get(self.url(domain))
            .header("Accept", "application/json");

        let entries: Vec<Value> = session.get_json(request, &self.name).await?;
        Ok(parse_entries(&entries))
    }
}
