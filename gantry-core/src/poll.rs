//! Condition poller
//!
//! Blocks the caller until an externally observable condition holds, bounding
//! the total wait and producing a legible [`TimeoutError`] when it never does.
//!
//! A poll session evaluates the predicate immediately, then sleeps for a
//! fixed interval between evaluations. The last sleep is clamped to the time
//! left before the deadline, so the final evaluation happens at the deadline
//! and a session never overruns it by more than one interval.
//!
//! # Example
//!
//! ```no_run
//! use gantry_core::poll::{Condition, Poller};
//! use std::time::Duration;
//!
//! # async fn fetch_status() -> Result<bool, std::io::Error> { Ok(true) }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let poller = Poller::new(Duration::from_secs(60), Duration::from_secs(1));
//!
//! poller
//!     .until_ok("build never started", || async {
//!         if fetch_status().await? {
//!             Ok::<(), Condition<std::io::Error>>(())
//!         } else {
//!             Err(Condition::retry(std::io::Error::other("not started yet")))
//!         }
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Timing bounds of a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum total time spent waiting for the condition
    pub timeout: Duration,
    /// Pause between two evaluations
    pub interval: Duration,
}

/// Invalid poll timing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollConfigError {
    #[error("poll interval must be greater than 0")]
    ZeroInterval,
}

impl PollConfig {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Rejects a zero interval
    pub fn validate(&self) -> Result<(), PollConfigError> {
        if self.interval.is_zero() {
            return Err(PollConfigError::ZeroInterval);
        }
        Ok(())
    }
}

/// Outcome of a failed evaluation of an error-returning predicate
///
/// Plain errors convert into [`Condition::Retry`] through `?`, so a
/// predicate only has to be explicit when it wants to stop the session.
#[derive(Debug)]
pub enum Condition<E> {
    /// Not satisfied yet; evaluate again after the interval
    Retry(E),
    /// Permanently broken; stop polling now
    Abort(E),
}

impl<E> Condition<E> {
    pub fn retry(error: E) -> Self {
        Self::Retry(error)
    }

    pub fn abort(error: E) -> Self {
        Self::Abort(error)
    }
}

impl<E> From<E> for Condition<E> {
    fn from(error: E) -> Self {
        Self::Retry(error)
    }
}

/// A poll session ended without the predicate ever succeeding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutError {
    /// Caller-supplied diagnostic
    pub message: String,
    /// Configured bound on the session
    pub timeout: Duration,
    /// Number of predicate evaluations made
    pub attempts: u32,
    /// Description of the last transient error, if the predicate reported one
    pub last_error: Option<String>,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (timed out after {:?}, {} attempt(s))",
            self.message, self.timeout, self.attempts
        )?;
        if let Some(last_error) = &self.last_error {
            write!(f, ": last error: {}", last_error)?;
        }
        Ok(())
    }
}

impl std::error::Error for TimeoutError {}

/// Failure of an error-returning poll
#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The predicate signalled [`Condition::Abort`]
    #[error("{message}: {error:#}")]
    Aborted { message: String, error: E },
}

impl<E> PollError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result of one evaluation, shared by all predicate flavors
enum Attempt<T, E> {
    Ready(T),
    Pending(Option<String>),
    Abort(E),
}

/// Waits for conditions on an eventually-consistent system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            config: PollConfig::new(timeout, interval),
        }
    }

    pub const fn from_config(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Polls an error-returning predicate until it returns `Ok`
    ///
    /// Errors wrapped in [`Condition::Retry`] (the default for `?`) are
    /// transient and retried until the deadline. [`Condition::Abort`] ends the
    /// session at once with [`PollError::Aborted`].
    pub async fn until_ok<F, Fut, T, E>(
        &self,
        message: impl Into<String>,
        mut predicate: F,
    ) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Condition<E>>>,
        E: fmt::Display,
    {
        let message = message.into();
        let outcome = self
            .run(&message, || {
                let fut = predicate();
                async move {
                    match fut.await {
                        Ok(value) => Attempt::Ready(value),
                        Err(Condition::Retry(e)) => Attempt::Pending(Some(format!("{:#}", e))),
                        Err(Condition::Abort(e)) => Attempt::Abort(e),
                    }
                }
            })
            .await?;

        match outcome {
            Ok(value) => Ok(value),
            Err(error) => {
                warn!(message = %message, error = %error, "Condition aborted");
                Err(PollError::Aborted { message, error })
            }
        }
    }

    /// Polls a boolean predicate until it returns `true`
    pub async fn until<F, Fut>(
        &self,
        message: impl Into<String>,
        mut predicate: F,
    ) -> Result<(), TimeoutError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.until_some(message, || {
            let fut = predicate();
            async move { fut.await.then_some(()) }
        })
        .await
    }

    /// Polls until the predicate observes a value
    ///
    /// `None` means "not yet"; the first `Some` is handed back to the caller.
    pub async fn until_some<F, Fut, T>(
        &self,
        message: impl Into<String>,
        mut predicate: F,
    ) -> Result<T, TimeoutError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let message = message.into();
        let outcome = self
            .run::<_, _, T, std::convert::Infallible>(&message, || {
                let fut = predicate();
                async move {
                    match fut.await {
                        Some(value) => Attempt::Ready(value),
                        None => Attempt::Pending(None),
                    }
                }
            })
            .await?;

        match outcome {
            Ok(value) => Ok(value),
            Err(never) => match never {},
        }
    }

    /// Drives one poll session
    ///
    /// The outer `Result` is the timeout; the inner one carries an abort.
    async fn run<F, Fut, T, E>(
        &self,
        message: &str,
        mut evaluate: F,
    ) -> Result<Result<T, E>, TimeoutError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last_error = None;

        loop {
            attempts += 1;

            match evaluate().await {
                Attempt::Ready(value) => {
                    debug!(
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Condition met"
                    );
                    return Ok(Ok(value));
                }
                Attempt::Abort(error) => return Ok(Err(error)),
                Attempt::Pending(error) => {
                    if let Some(error) = &error {
                        debug!(attempt = attempts, error = %error, "Condition not met yet");
                    }
                    last_error = error.or(last_error);
                }
            }

            let remaining = self.config.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    message = %message,
                    timeout = ?self.config.timeout,
                    attempts,
                    "Timed out waiting for condition"
                );
                return Err(TimeoutError {
                    message: message.to_string(),
                    timeout: self.config.timeout,
                    attempts,
                    last_error,
                });
            }

            time::sleep(self.config.interval.min(remaining)).await;
        }
    }
}
