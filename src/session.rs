// src/session.rs
use crate::retry::RetryPolicy;
use crate::types::{Config, LeviathanError};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::net::TcpStream;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct Session {
    pub client: Client,
    retry: RetryPolicy,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, LeviathanError> {
        // Build HTTP client
        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);

        if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let parsed = parse_proxy_url(proxy_url)?;
            check_proxy_reachable(&parsed, config.timeout)?;

            let proxy = reqwest::Proxy::all(parsed.as_str())
                .map_err(|e| LeviathanError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
            info!("Proxy configured: {}", proxy_url);
        }

        let client = client_builder.build().map_err(|e| {
            LeviathanError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Session {
            client,
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends `request`, retrying on transport errors and any status other than 200.
    pub async fn fetch(&self, request: RequestBuilder, label: &str) -> Result<Response, LeviathanError> {
        self.retry
            .run(label, |attempt| {
                let request = request.try_clone();
                async move {
                    let request = request.ok_or_else(|| {
                        LeviathanError::NetworkError("Request cannot be replayed".to_string())
                    })?;
                    debug!("[{}] Sending request (attempt {})", label, attempt);

                    let response = request.send().await?;
                    if response.status() == StatusCode::OK {
                        Ok(response)
                    } else {
                        Err(LeviathanError::HttpStatus(response.status().as_u16()))
                    }
                }
            })
            .await
    }

    /// Fetches with retries and decodes the body as JSON. Decoding is not retried.
    pub async fn get_json<T>(&self, request: RequestBuilder, label: &str) -> Result<T, LeviathanError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.fetch(request, label).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LeviathanError::NetworkError(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| LeviathanError::ParseError(e.to_string()))
    }
}

fn parse_proxy_url(proxy_url: &str) -> Result<Url, LeviathanError> {
    let parsed = Url::parse(proxy_url).map_err(|e| {
        LeviathanError::ConfigError(format!("Invalid proxy URL {:?}: {}", proxy_url, e))
    })?;

    if parsed.host_str().is_none() {
        return Err(LeviathanError::ConfigError(format!(
            "Invalid proxy URL {:?}: missing host",
            proxy_url
        )));
    }

    Ok(parsed)
}

fn default_proxy_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        "socks5" | "socks5h" | "socks4" | "socks4a" => Some(1080),
        _ => None,
    }
}

/// Blocking TCP connect against the proxy so a dead proxy fails the run up front.
fn check_proxy_reachable(proxy: &Url, timeout: Duration) -> Result<(), LeviathanError> {
    let unreachable = |message: String| LeviathanError::ProxyUnreachable {
        proxy: proxy.to_string(),
        message,
    };

    let addrs = proxy
        .socket_addrs(|| default_proxy_port(proxy.scheme()))
        .map_err(|e| unreachable(e.to_string()))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => {
                debug!("Proxy {} reachable at {}", proxy, addr);
                return Ok(());
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(unreachable(
        last_error.unwrap_or_else(|| "no addresses resolved".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn config_with_proxy(proxy: &str) -> Config {
        Config {
            proxy: Some(proxy.to_string()),
            timeout: Duration::from_secs(1),
            ..Config::default()
        }
    }

    #[test]
    fn test_malformed_proxy_is_fatal() {
        let err = Session::new(&config_with_proxy("not a url")).unwrap_err();
        assert!(matches!(err, LeviathanError::ConfigError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_proxy_without_host_is_rejected() {
        let err = Session::new(&config_with_proxy("localhost:8080")).unwrap_err();
        assert!(matches!(err, LeviathanError::ConfigError(_)));
    }

    #[test]
    fn test_unreachable_proxy_is_fatal() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = Session::new(&config_with_proxy(&format!("http://127.0.0.1:{}", port))).unwrap_err();
        assert!(matches!(err, LeviathanError::ProxyUnreachable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_reachable_proxy_is_accepted() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(Session::new(&config_with_proxy(&format!("http://127.0.0.1:{}", port))).is_ok());
    }

    #[test]
    fn test_no_proxy_builds_client() {
        assert!(Session::new(&Config::default()).is_ok());
    }

    #[test]
    fn test_retry_policy_follows_config() {
        let mut config = Config::default();
        config.retry.max_attempts = 5;
        let session = Session::new(&config).unwrap();
        assert_eq!(session.retry_policy().max_attempts(), 5);

        let session = session.with_retry_policy(RetryPolicy::new(1, crate::retry::Backoff::Fixed(Duration::ZERO)));
        assert_eq!(session.retry_policy().max_attempts(), 1);
    }

    #[test]
    fn test_default_proxy_ports() {
        assert_eq!(default_proxy_port("http"), Some(80));
        assert_eq!(default_proxy_port("socks5"), Some(1080));
        assert_eq!(default_proxy_port("gopher"), None);
    }
}
