use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fixed-delay retry: one attempt per tick, forever, no backoff and no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait one tick
    pub async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }

    /// Run `attempt` until it succeeds, sleeping one delay after each failure.
    pub async fn retry<T, E, F, Fut>(&self, what: &str, mut attempt: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut failures: u64 = 0;
        loop {
            match attempt().await {
                Ok(value) => {
                    if failures > 0 {
                        log::info!("{} succeeded after {} failed attempts", what, failures);
                    }
                    return value;
                }
                Err(err) => {
                    failures += 1;
                    log::warn!(
                        "{} failed (attempt {}): {}; retrying in {}s",
                        what,
                        failures,
                        err,
                        self.delay.as_secs()
                    );
                    self.pause().await;
                }
            }
        }
    }
}
