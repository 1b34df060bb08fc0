use crate::aggregator::{normalize, Aggregator};
use crate::config::validate_config;
use crate::output::Reporter;
use crate::resolver::Resolver;
use crate::session::Session;
use crate::sources::{create_source, Source};
use crate::types::{Config, LeviathanError, RunReport, RunStats, SourceOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;

pub struct LeviathanEngine {
    session: Session,
    sources: Vec<Box<dyn Source>>,
    resolver: Option<Arc<Resolver>>,
    reporter: Arc<dyn Reporter>,
}

impl LeviathanEngine {
    /// Fails only on configuration problems, before any source is queried.
    pub fn new(config: Config, reporter: Arc<dyn Reporter>) -> Result<Self, LeviathanError> {
        validate_config(&config)?;

        // Proxy parsing and reachability are checked here
        let session = Session::new(&config)?;

        let mut sources = Vec::new();
        for name in &config.sources {
            match create_source(name, &config) {
                Some(source) => sources.push(source),
                None => warn!("Unknown source: {}", name),
            }
        }

        if sources.is_empty() {
            return Err(LeviathanError::ConfigError(
                "No valid sources configured".to_string(),
            ));
        }

        let resolver = if config.resolver.enabled {
            Some(Arc::new(Resolver::new(&config.resolver)?))
        } else {
            None
        };

        Ok(Self {
            session,
            sources,
            resolver,
            reporter,
        })
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn Source>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_resolver(mut self, resolver: Option<Resolver>) -> Self {
        self.resolver = resolver.map(Arc::new);
        self
    }

    pub fn sources(&self) -> &[Box<dyn Source>] {
        &self.sources
    }

    /// Runs every enabled source concurrently and waits for all of them.
    ///
    /// Source failures are absorbed; the report always lists whatever was found.
    pub async fn run(&self, domain: &str) -> Result<RunReport, LeviathanError> {
        // Adapters compare and join against the same form the aggregator stores.
        let normalized = match normalize(domain) {
            Some(normalized) => normalized,
            None => return Err(LeviathanError::InvalidDomain(domain.to_string())),
        };
        let domain = normalized.as_str();

        info!("Enumerating subdomains for: {}", domain);
        let start_time = Instant::now();
        let aggregator = Arc::new(Aggregator::new(Arc::clone(&self.reporter)));
        let mut sources_skipped = Vec::new();
        let mut tasks = FuturesUnordered::new();

        for (index, source) in self.sources.iter().enumerate() {
            let source_name = source.name().to_string();
            if !source.is_enabled() {
                info!("[{}] Skipping source: no API key configured", source_name);
                self.reporter.source_skipped(&source_name, "no API key configured");
                sources_skipped.push(source_name);
                continue;
            }

            let handle = tokio::spawn(enumerate_source(
                source.clone_source(),
                domain.to_string(),
                self.session.clone(),
                Arc::clone(&aggregator),
                Arc::clone(&self.reporter),
            ));
            tasks.push(async move { (index, source_name, handle.await) });
        }

        let mut outcomes = Vec::new();
        while let Some((index, source_name, joined)) = tasks.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                error!("[{}] Source task aborted: {}", source_name, e);
                SourceOutcome {
                    name: source_name,
                    findings: 0,
                    accepted: 0,
                    error: Some(e.to_string()),
                }
            });
            outcomes.push((index, outcome));
        }
        outcomes.sort_by_key(|(index, _)| *index);

        aggregator.close();
        let subdomains = aggregator.subdomains();

        let liveness = match &self.resolver {
            Some(resolver) => Some(resolver.validate_batch(&subdomains).await),
            None => None,
        };

        let report = RunReport {
            domain: domain.to_string(),
            stats: RunStats {
                unique_subdomains: subdomains.len(),
                active_count: liveness
                    .as_ref()
                    .map(|results| results.iter().filter(|r| r.active).count()),
                sources_used: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
                sources_skipped,
                duration: start_time.elapsed(),
            },
            subdomains,
            liveness,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        info!(
            "Completed enumeration for {}: found {} unique subdomains",
            report.domain, report.stats.unique_subdomains
        );

        if let Err(e) = self.reporter.final_listing(&report) {
            error!("Failed to write results: {}", e);
        }

        Ok(report)
    }
}

async fn enumerate_source(
    source: Box<dyn Source>,
    domain: String,
    session: Session,
    aggregator: Arc<Aggregator>,
    reporter: Arc<dyn Reporter>,
) -> SourceOutcome {
    let source_name = source.name().to_string();
    let start = Instant::now();

    match source.enumerate(&domain, &session).await {
        Ok(findings) => {
            let accepted = findings
                .iter()
                .filter(|finding| aggregator.record(&source_name, finding))
                .count();
            info!(
                "{}: Found {} subdomains ({} new) for {} in {:?}",
                source_name,
                findings.len(),
                accepted,
                domain,
                start.elapsed()
            );
            SourceOutcome {
                name: source_name,
                findings: findings.len(),
                accepted,
                error: None,
            }
        }
        Err(e) => {
            error!("{}: Failed to enumerate {}: {}", source_name, domain, e);
            reporter.source_failed(&source_name, &e);
            SourceOutcome {
                name: source_name,
                findings: 0,
                accepted: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NullReporter;
    use crate::types::SourceInfo;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    struct StaticSource {
        name: String,
        enabled: bool,
        findings: Vec<String>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl StaticSource {
        fn new(name: &str, findings: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                enabled: true,
                findings: findings.iter().map(|s| s.to_string()).collect(),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Source for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn info(&self) -> SourceInfo {
            SourceInfo {
                name: self.name.clone(),
                needs_key: false,
                is_default: true,
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn enumerate(&self, _domain: &str, _session: &Session) -> Result<Vec<String>, LeviathanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.name == "broken" {
                return Err(LeviathanError::HttpStatus(500));
            }
            Ok(self.findings.clone())
        }

        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(self.clone())
        }
    }

    fn engine(sources: Vec<Box<dyn Source>>) -> LeviathanEngine {
        LeviathanEngine::new(Config::default(), Arc::new(NullReporter))
            .unwrap()
            .with_sources(sources)
    }

    #[tokio::test]
    async fn test_empty_domain_rejected() {
        let err = engine(vec![]).run("   ").await.unwrap_err();
        assert!(matches!(err, LeviathanError::InvalidDomain(_)));

        let err = engine(vec![]).run(" . ").await.unwrap_err();
        assert!(matches!(err, LeviathanError::InvalidDomain(_)));
    }

    #[tokio::test]
    async fn test_disabled_source_is_never_called() {
        let mut disabled = StaticSource::new("shodan", &["x.example.com"]);
        disabled.enabled = false;
        let calls = Arc::clone(&disabled.calls);

        let report = engine(vec![
            Box::new(StaticSource::new("crtsh", &["a.example.com"])),
            Box::new(disabled),
        ])
        .run("example.com")
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.subdomains, vec!["a.example.com"]);
        assert_eq!(report.stats.sources_skipped, vec!["shodan"]);
    }

    #[tokio::test]
    async fn test_waits_for_slow_sources_and_absorbs_failures() {
        let mut slow = StaticSource::new("slow", &["slow.example.com", "shared.example.com"]);
        slow.delay = Duration::from_millis(50);

        let report = engine(vec![
            Box::new(slow),
            Box::new(StaticSource::new("broken", &[])),
            Box::new(StaticSource::new("fast", &["shared.example.com", "*.example.com"])),
        ])
        .run("example.com")
        .await
        .unwrap();

        let found: HashSet<_> = report.subdomains.iter().map(String::as_str).collect();
        assert_eq!(found, HashSet::from(["slow.example.com", "shared.example.com"]));
        assert_eq!(report.subdomains.len(), 2);

        let names: Vec<_> = report.stats.sources_used.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "broken", "fast"]);
        assert!(report.stats.sources_used[1].error.is_some());
        assert!(report.liveness.is_none());
    }

    #[test]
    fn test_sources_follow_config_order() {
        let config = Config {
            sources: vec!["shodan".to_string(), "bogus".to_string(), "crtsh".to_string()],
            ..Config::default()
        };
        let engine = LeviathanEngine::new(config, Arc::new(NullReporter)).unwrap();
        let names: Vec<_> = engine.sources().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["shodan", "crtsh"]);
    }

    #[test]
    fn test_unknown_sources_only_is_config_error() {
        let config = Config {
            sources: vec!["nope".to_string()],
            ..Config::default()
        };
        let err = LeviathanEngine::new(config, Arc::new(NullReporter)).err().unwrap();
        assert!(err.is_fatal());
    }
}
