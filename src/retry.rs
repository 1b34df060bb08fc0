// src/retry.rs
use crate::types::{LeviathanError, RetryConfig};
use async_trait::async_trait;
use log::warn;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Abstracts the pause between attempts so tests can run without a real clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(*max)
            }
        }
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Backoff::Fixed(config.delay))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// The closure receives the 1-based attempt number. There is no sleep after
    /// the final attempt; the last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LeviathanError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LeviathanError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    warn!("[{}] Giving up after {} attempts: {}", label, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        "[{}] Attempt {}/{} failed: {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn policy(sleeper: Arc<RecordingSleeper>) -> RetryPolicy {
        RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(2))).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);

        let result = policy(sleeper.clone())
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(LeviathanError::HttpStatus(503))
                    } else {
                        Ok("body")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy(sleeper.clone())
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 3 {
                        Err(LeviathanError::NetworkError("connection reset".to_string()))
                    } else {
                        Err(LeviathanError::HttpStatus(500))
                    }
                }
            })
            .await;

        match result {
            Err(LeviathanError::NetworkError(msg)) => assert_eq!(msg, "connection reset"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_success_does_not_sleep() {
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = policy(sleeper.clone()).run("test", |_| async { Ok(1) }).await;

        assert_eq!(result.unwrap(), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO)).max_attempts(), 1);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(500));
    }
}
