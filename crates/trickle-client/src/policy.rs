//! Connection policy: timeout, bounded retry with backoff, cancellation
//!
//! One [`Exchange`] supervises one caller-visible request through the state
//! machine `Idle -> Connecting -> Streaming -> Completed | Failed |
//! Cancelled`. Every retry starts a fully fresh exchange: the reconstructor
//! is restarted so no duplicate or out-of-order items can leak across a
//! retry boundary.

use std::time::Duration;

use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use trickle_core::{Error, Result, StreamEvent, StreamRequest};

use crate::consumer::Reconstructor;
use crate::source::EventSource;

/// How the exchange is supervised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Maximum wait for the connection and for each subsequent event
    pub timeout: Duration,
    /// Retry attempts after the first failure
    pub max_retries: u32,
    /// Base backoff between attempts; doubles on each further attempt
    pub retry_backoff: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::for_complexity(TaskComplexity::Standard)
    }
}

/// Expected generation workload, used to scale the timeout window
///
/// A fixed universal timeout is wrong in both directions: it aborts long
/// multi-stage analyses that are still healthy and lets quick ones hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskComplexity {
    /// Short single-pass generations
    Quick,
    /// Typical structured analyses
    Standard,
    /// Long multi-stage analyses
    Extended,
}

impl PolicyConfig {
    /// Presets scaled to the expected workload
    pub fn for_complexity(complexity: TaskComplexity) -> Self {
        let timeout = match complexity {
            TaskComplexity::Quick => Duration::from_secs(30),
            TaskComplexity::Standard => Duration::from_secs(90),
            TaskComplexity::Extended => Duration::from_secs(300),
        };
        Self {
            timeout,
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Observable lifecycle of one supervised exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Not started
    Idle,
    /// Waiting for the first event
    Connecting,
    /// Events are flowing
    Streaming,
    /// Terminal: completed successfully
    Completed,
    /// Terminal: failed after exhausting retries
    Failed,
    /// Terminal: cancelled by the caller
    Cancelled,
}

/// Caller-held handle that cancels a running exchange
#[derive(Debug, Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Request cooperative cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// One supervised exchange. Terminal states are final; a new request always
/// constructs a fresh exchange.
pub struct Exchange {
    config: PolicyConfig,
    state: ExchangeState,
    // Holding a sender keeps `changed()` quiet when the caller drops their
    // handle; only an explicit cancel() flips the flag
    cancel_tx: watch::Sender<bool>,
    cancelled: watch::Receiver<bool>,
}

impl Exchange {
    /// Create an idle exchange and its cancellation handle
    pub fn new(config: PolicyConfig) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let handle = CancelHandle(tx.clone());
        (
            Self {
                config,
                state: ExchangeState::Idle,
                cancel_tx: tx,
                cancelled: rx,
            },
            handle,
        )
    }

    /// Current state-machine position
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// A further cancellation handle for this exchange
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel_tx.clone())
    }

    /// Drive the exchange to a terminal state, folding events into `recon`.
    ///
    /// Returns `Ok(())` on completion; `Err(Cancelled)` on caller
    /// cancellation; `Err(RetriesExhausted)` once every attempt has failed,
    /// with `recon`'s `last_error` set and its partial items left intact.
    pub async fn run<T, F, S>(
        &mut self,
        source: &S,
        request: &StreamRequest,
        recon: &mut Reconstructor<T, F>,
    ) -> Result<()>
    where
        F: Fn(&Map<String, Value>) -> Option<T>,
        S: EventSource + ?Sized,
    {
        let attempts = self.config.max_retries + 1;
        let mut last_error = Error::transport("exchange never started");

        for attempt in 0..attempts {
            if *self.cancelled.borrow() {
                return self.cancel_now(recon);
            }
            if attempt > 0 {
                let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying");
                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = self.cancelled.changed() => return self.cancel_now(recon),
                }
            }

            // A retried exchange is a new exchange, not a resumption
            recon.begin();
            self.state = ExchangeState::Connecting;
            match self.attempt(source, request, recon).await {
                Ok(()) => {
                    self.state = ExchangeState::Completed;
                    return Ok(());
                }
                Err(Error::Cancelled) => return self.cancel_now(recon),
                Err(err) => {
                    warn!(attempt, %err, "exchange attempt failed");
                    last_error = err;
                }
            }
        }

        self.state = ExchangeState::Failed;
        let err = Error::RetriesExhausted {
            attempts,
            last: last_error.to_string(),
        };
        recon.fail(err.to_string());
        Err(err)
    }

    /// One attempt: connect, then pump events until a terminal outcome
    async fn attempt<T, F, S>(
        &mut self,
        source: &S,
        request: &StreamRequest,
        recon: &mut Reconstructor<T, F>,
    ) -> Result<()>
    where
        F: Fn(&Map<String, Value>) -> Option<T>,
        S: EventSource + ?Sized,
    {
        let window = self.config.timeout;
        let connect = source.connect(request);
        let mut events = tokio::select! {
            _ = self.cancelled.changed() => return Err(Error::Cancelled),
            connected = timeout(window, connect) => match connected {
                Err(_) => return Err(Error::Timeout(window.as_millis() as u64)),
                Ok(Err(err)) => return Err(err),
                Ok(Ok(stream)) => stream,
            },
        };

        loop {
            let next = tokio::select! {
                _ = self.cancelled.changed() => return Err(Error::Cancelled),
                next = timeout(window, events.next()) => match next {
                    Err(_) => return Err(Error::Timeout(window.as_millis() as u64)),
                    Ok(next) => next,
                },
            };
            match next {
                None => return Err(Error::transport("stream ended without a terminal event")),
                Some(Err(err)) => return Err(err),
                Some(Ok(event)) => {
                    if self.state == ExchangeState::Connecting {
                        self.state = ExchangeState::Streaming;
                    }
                    match event {
                        StreamEvent::Error { message, .. } => {
                            // Terminal for this attempt, eligible for retry
                            return Err(Error::stream(message));
                        }
                        StreamEvent::Complete { .. } => {
                            recon.apply(event);
                            return Ok(());
                        }
                        StreamEvent::Item { .. } => recon.apply(event),
                    }
                }
            }
        }
    }

    fn cancel_now<T, F>(&mut self, recon: &mut Reconstructor<T, F>) -> Result<()>
    where
        F: Fn(&Map<String, Value>) -> Option<T>,
    {
        debug!("exchange cancelled by caller");
        self.state = ExchangeState::Cancelled;
        recon.halt();
        Err(Error::Cancelled)
    }
}
