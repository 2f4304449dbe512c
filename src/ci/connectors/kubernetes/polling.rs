//! Fixed-interval polling with a deadline
//!
//! Every wait in the orchestrator (pod discovery, pod phase, job completion)
//! goes through [`Poller::poll_until`]. The loop suspends between probes and
//! never runs probes concurrently.

use crate::error::{AppError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Done(T),
    Continue,
}

#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    cancel: Option<Arc<AtomicBool>>,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            cancel: None,
        }
    }

    /// Abort the wait at the next tick once `flag` is raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run `probe` until it returns [`Probe::Done`], fails, or the deadline
    /// passes. The probe always runs at least once.
    pub async fn poll_until<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probe<T>>>,
    {
        let start_time = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if self.is_cancelled() {
                return Err(AppError::PollingCancelled(what.to_string()));
            }

            attempt += 1;
            if let Probe::Done(value) = probe().await? {
                debug!("✅ {} ready after {} probe(s)", what, attempt);
                return Ok(value);
            }

            if start_time.elapsed() >= self.timeout {
                return Err(AppError::PollingTimeout {
                    what: what.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }

            sleep(self.interval).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
