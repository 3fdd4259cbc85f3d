//! econfed-mock
//!
//! A programmable [`ProviderAdapter`] for orchestrator and middleware
//! tests: script a sequence of outcomes per call, count invocations, and
//! optionally delay responses to exercise timeouts.
#![warn(missing_docs)]

pub mod fixtures;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use econfed_core::adapter::ProviderAdapter;
use econfed_types::{FedError, FetchRequest, Provider, Series};

type Outcome = Result<Vec<Series>, FedError>;

/// A scripted mock adapter.
///
/// Outcomes are consumed in order, one per `fetch` call; when the script
/// runs dry the last outcome repeats. An unscripted mock answers every
/// call with `DataNotAvailable`.
pub struct MockAdapter {
    provider: Provider,
    script: Mutex<VecDeque<Outcome>>,
    last: Mutex<Option<Outcome>>,
    calls: AtomicU32,
    delay: Option<Duration>,
}

impl MockAdapter {
    /// A mock for the given provider tag with an empty script.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            delay: None,
        }
    }

    /// Queue a successful outcome.
    #[must_use]
    pub fn then_ok(self, series: Vec<Series>) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Ok(series));
        self
    }

    /// Queue a failure outcome.
    #[must_use]
    pub fn then_err(self, err: FedError) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(Err(err));
        self
    }

    /// Delay every response (timeout tests).
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch` calls observed so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch(&self, _req: &FetchRequest) -> Result<Vec<Series>, FedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Take the outcome before any delay so concurrent callers consume
        // the script in call order, not completion order.
        let next = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock().expect("last lock poisoned") = Some(clone_outcome(&outcome));
                outcome
            }
            None => {
                let last = self.last.lock().expect("last lock poisoned");
                match last.as_ref() {
                    Some(outcome) => clone_outcome(outcome),
                    None => Err(FedError::not_available(
                        self.provider,
                        "mock adapter has no scripted outcomes",
                    )),
                }
            }
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

fn clone_outcome(outcome: &Outcome) -> Outcome {
    match outcome {
        Ok(series) => Ok(series.clone()),
        Err(err) => Err(err.clone()),
    }
}
