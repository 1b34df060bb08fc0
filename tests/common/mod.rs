use leviathan::types::{LeviathanError, RetryConfig, RunReport};
use leviathan::{Config, Reporter};
use std::sync::Mutex;
use std::time::Duration;

/// Reporter that keeps every event for later assertions.
#[derive(Default)]
pub struct CollectingReporter {
    pub discovered: Mutex<Vec<(String, String)>>,
    pub skipped: Mutex<Vec<String>>,
    pub failed: Mutex<Vec<String>>,
    pub listings: Mutex<Vec<Vec<String>>>,
}

impl Reporter for CollectingReporter {
    fn discovered(&self, subdomain: &str, source: &str) {
        self.discovered
            .lock()
            .unwrap()
            .push((subdomain.to_string(), source.to_string()));
    }

    fn source_skipped(&self, source: &str, _reason: &str) {
        self.skipped.lock().unwrap().push(source.to_string());
    }

    fn source_failed(&self, source: &str, _error: &LeviathanError) {
        self.failed.lock().unwrap().push(source.to_string());
    }

    fn final_listing(&self, report: &RunReport) -> Result<(), LeviathanError> {
        self.listings.lock().unwrap().push(report.subdomains.clone());
        Ok(())
    }
}

/// Default configuration without the retry pause.
pub fn fast_config() -> Config {
    Config {
        timeout: Duration::from_secs(5),
        retry: RetryConfig {
            max_attempts: 3,
            delay: Duration::ZERO,
        },
        ..Config::default()
    }
}

pub fn sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items
}
