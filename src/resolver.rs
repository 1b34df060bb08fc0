// src/resolver.rs
use crate::types::{LeviathanError, LivenessResult, ResolverConfig};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use trust_dns_resolver::config::{ResolverConfig as DnsResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

#[async_trait]
pub trait HostLookup: Send + Sync {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, LeviathanError>;
}

#[async_trait]
impl HostLookup for TokioAsyncResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, LeviathanError> {
        self.lookup_ip(hostname)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| LeviathanError::ResolutionError(format!("Failed to resolve {}: {}", hostname, e)))
    }
}

pub struct Resolver {
    lookup: Arc<dyn HostLookup>,
    semaphore: Arc<Semaphore>,
}

impl Resolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, LeviathanError> {
        let resolver = if config.use_system_resolver {
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                LeviathanError::ResolutionError(format!("Failed to create system resolver: {}", e))
            })?
        } else {
            let mut resolver_config = DnsResolverConfig::new();

            for ns in &config.nameservers {
                let socket_addr = SocketAddr::from_str(ns).map_err(|e| {
                    LeviathanError::ConfigError(format!("Invalid nameserver address {}: {}", ns, e))
                })?;
                resolver_config.add_name_server(trust_dns_resolver::config::NameServerConfig {
                    socket_addr,
                    protocol: trust_dns_resolver::config::Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: false,
                    bind_addr: None,
                });
            }

            let mut opts = ResolverOpts::default();
            opts.timeout = config.timeout;
            opts.attempts = 1;

            TokioAsyncResolver::tokio(resolver_config, opts)
        };

        Ok(Self::with_lookup(Arc::new(resolver), config.concurrency))
    }

    pub fn with_lookup(lookup: Arc<dyn HostLookup>, concurrency: usize) -> Self {
        Self {
            lookup,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// A subdomain is active when the lookup returns at least one address.
    pub async fn validate(&self, subdomain: &str) -> bool {
        !self.resolve(subdomain).await.is_empty()
    }

    /// Validates every subdomain with at most `concurrency` lookups in flight.
    /// Results keep the input order.
    pub async fn validate_batch(&self, subdomains: &[String]) -> Vec<LivenessResult> {
        info!("Resolving {} subdomains...", subdomains.len());

        let mut results: Vec<LivenessResult> = subdomains
            .iter()
            .map(|s| LivenessResult {
                subdomain: s.clone(),
                active: false,
                addresses: Vec::new(),
            })
            .collect();

        let mut futures: FuturesUnordered<_> = subdomains
            .iter()
            .enumerate()
            .map(|(idx, subdomain)| async move { (idx, self.resolve(subdomain).await) })
            .collect();

        while let Some((idx, addresses)) = futures.next().await {
            results[idx].active = !addresses.is_empty();
            results[idx].addresses = addresses.iter().map(|ip| ip.to_string()).collect();
        }

        results
    }

    async fn resolve(&self, hostname: &str) -> Vec<IpAddr> {
        // The semaphore is never closed.
        let _permit = self.semaphore.acquire().await.ok();

        match self.lookup.lookup(hostname).await {
            Ok(addresses) => addresses,
            Err(e) => {
                debug!("{}", e);
                Vec::new()
            }
        }
    }
}
