//! Retry Controller
//!
//! Wraps an operation in a policy:
//!
//! - **Idempotent** operations (fetches, property reads, search-index binding)
//!   are retried with a fixed delay until the retry budget is spent.
//! - **Non-idempotent** operations (puts, deletes, datatype updates, property
//!   writes) get exactly one attempt. A network failure is surfaced as
//!   `OperationFailed` because the node may or may not have applied it.
//!
//! The retried closure is called again with the same captured inputs, so
//! quorum values resolved before `run` are reused on every attempt.

use std::thread;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Result, RiakError};

/// Whether repeating an operation can change the end state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    Idempotent,
    NonIdempotent,
}

/// Which failures an idempotent operation is retried on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Network failures and pool exhaustion
    Transient,
    /// Everything except failures no repeat can fix (closed pool, bad input)
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub idempotency: Idempotency,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
    pub retry_on: RetryOn,
}

impl RetryPolicy {
    pub fn idempotent(max_retries: u32, delay: Duration) -> Self {
        Self {
            idempotency: Idempotency::Idempotent,
            max_retries,
            delay,
            retry_on: RetryOn::Transient,
        }
    }

    pub fn non_idempotent() -> Self {
        Self {
            idempotency: Idempotency::NonIdempotent,
            max_retries: 0,
            delay: Duration::ZERO,
            retry_on: RetryOn::Transient,
        }
    }

    /// Policy for reads under the client's configured budget
    pub fn reads(config: &ClientConfig) -> Self {
        Self::idempotent(config.max_retries, config.retry_delay)
    }

    /// Binding a search index converges to the same end state however often
    /// it is repeated, so any failure is retried.
    pub fn search_index(config: &ClientConfig) -> Self {
        Self::idempotent(config.max_retries, config.retry_delay).retry_on(RetryOn::Any)
    }

    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    fn should_retry(&self, err: &RiakError) -> bool {
        match self.retry_on {
            RetryOn::Transient => err.is_retryable(),
            RetryOn::Any => !matches!(
                err,
                RiakError::PoolClosed | RiakError::Config(_) | RiakError::InvalidOperation(_)
            ),
        }
    }
}

/// Final result plus how many attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Run `op` under `policy`. `op` receives the 1-based attempt number.
pub fn run<T, F>(operation: &str, policy: &RetryPolicy, op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    run_with_outcome(operation, policy, op).result
}

/// Like [`run`], but also reports the attempt count
pub fn run_with_outcome<T, F>(operation: &str, policy: &RetryPolicy, mut op: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Result<T>,
{
    if policy.idempotency == Idempotency::NonIdempotent {
        let result = op(1).map_err(|err| {
            if err.is_transient() {
                RiakError::OperationFailed {
                    operation: operation.to_string(),
                    source: Box::new(err),
                }
            } else {
                err
            }
        });
        return RetryOutcome { result, attempts: 1 };
    }

    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => {
                let remaining = (policy.max_retries + 1).saturating_sub(attempt);
                if remaining == 0 || !policy.should_retry(&err) {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
                tracing::warn!(
                    "{} failed (attempt {}, {} retries left), retrying in {:?}: {}",
                    operation,
                    attempt,
                    remaining,
                    policy.delay,
                    err
                );
                thread::sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}
