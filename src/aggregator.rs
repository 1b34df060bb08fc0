// src/aggregator.rs
use crate::output::Reporter;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct UniqueSet {
    seen: HashSet<String>,
    order: Vec<String>,
    closed: bool,
}

/// Deduplicating sink shared by every source task of a single run.
pub struct Aggregator {
    state: Mutex<UniqueSet>,
    reporter: Arc<dyn Reporter>,
}

impl Aggregator {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            state: Mutex::new(UniqueSet::default()),
            reporter,
        }
    }

    /// Records a raw finding. Returns true only when it is a new unique subdomain.
    pub fn record(&self, source: &str, raw: &str) -> bool {
        let candidate = match normalize(raw) {
            Some(candidate) => candidate,
            None => {
                debug!("[{}] Ignoring empty finding {:?}", source, raw);
                return false;
            }
        };

        if is_wildcard(&candidate) {
            info!("[{}] Ignoring subdomain with wildcard: {}", source, candidate);
            return false;
        }

        {
            let mut state = self.lock();
            if state.closed {
                warn!("[{}] Finding {} arrived after the run closed", source, candidate);
                return false;
            }
            if !state.seen.insert(candidate.clone()) {
                return false;
            }
            state.order.push(candidate.clone());
        }

        // Outside the lock: concurrent events may stream in a different order than `subdomains()`.
        self.reporter.discovered(&candidate, source);
        true
    }

    /// Stops accepting findings.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unique subdomains in first-seen order.
    pub fn subdomains(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    fn lock(&self) -> MutexGuard<'_, UniqueSet> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Trims whitespace and trailing dots and lowercases.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_end_matches('.').to_lowercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn is_wildcard(subdomain: &str) -> bool {
    subdomain.starts_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NullReporter;
    use crate::types::{LeviathanError, RunReport};
    use std::thread;

    #[derive(Default)]
    struct StreamRecorder {
        events: Mutex<Vec<String>>,
    }

    impl Reporter for StreamRecorder {
        fn discovered(&self, subdomain: &str, _source: &str) {
            self.events.lock().unwrap().push(subdomain.to_string());
        }

        fn final_listing(&self, _report: &RunReport) -> Result<(), LeviathanError> {
            Ok(())
        }
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Arc::new(NullReporter))
    }

    #[test]
    fn test_duplicates_collapse() {
        let agg = aggregator();
        assert!(agg.record("crtsh", "sub1.example.com"));
        assert!(agg.record("crtsh", "sub2.example.com"));
        assert!(!agg.record("shodan", "sub1.example.com"));
        assert_eq!(agg.subdomains(), vec!["sub1.example.com", "sub2.example.com"]);
    }

    #[test]
    fn test_wildcards_never_accepted() {
        let agg = aggregator();
        for _ in 0..5 {
            assert!(!agg.record("crtsh", "*.example.com"));
        }
        assert!(!agg.record("crtsh", "  *.dev.example.com"));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize(" Mail.Example.COM. "), Some("mail.example.com".to_string()));
        assert_eq!(normalize("   "), None);

        let agg = aggregator();
        assert!(agg.record("a", "WWW.example.com"));
        assert!(!agg.record("b", "www.example.com."));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_closed_aggregator_rejects_writes() {
        let agg = aggregator();
        agg.record("a", "one.example.com");
        agg.close();
        assert!(!agg.record("a", "two.example.com"));
        assert_eq!(agg.subdomains(), vec!["one.example.com"]);
    }

    #[test]
    fn test_concurrent_inserts_are_unique() {
        let agg = Arc::new(aggregator());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    let mut accepted = 0;
                    for i in 0..200 {
                        // Every thread submits the same 100 names twice over.
                        if agg.record(&format!("thread-{}", t), &format!("host{}.example.com", i % 100)) {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(accepted, 100);
        let subs = agg.subdomains();
        assert_eq!(subs.len(), 100);
        let unique: HashSet<_> = subs.iter().collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn test_each_accepted_name_is_streamed_once() {
        let recorder = Arc::new(StreamRecorder::default());
        let agg = Arc::new(Aggregator::new(recorder.clone()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for i in 0..50 {
                        agg.record(&format!("thread-{}", t), &format!("host{}.example.com", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Stream order may differ from first-seen order; the contents may not.
        let mut streamed = recorder.events.lock().unwrap().clone();
        let mut listed = agg.subdomains();
        assert_eq!(streamed.len(), 50);
        streamed.sort();
        listed.sort();
        assert_eq!(streamed, listed);
    }
}
