//! Retry engine with a fixed attempt budget and a per-attempt deadline.
//!
//! The same loop backs two use patterns: making a flaky side-effecting
//! command resilient, and polling a read-only convergence predicate until
//! it holds. The wrapped operation reports its outcome as an [`Attempt`]
//! instead of failing, and the loop branches on the variant.

use crate::error::{Error, Result};
use crate::types::RetryPolicy;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation produced a value
    Done(T),
    /// A transient failure; try again after the delay
    Retry(Error),
    /// A failure no further attempt can fix
    Abort(Error),
}

impl<T> From<Result<T>> for Attempt<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Attempt::Done(value),
            Err(e) if e.is_retryable() => Attempt::Retry(e),
            Err(e) => Attempt::Abort(e),
        }
    }
}

/// Values that carry a convergence signal.
///
/// When the policy treats false as failure, a falsy value is retried
/// like an error.
pub trait Truthy {
    /// Whether the value counts as success.
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for () {
    fn is_truthy(&self) -> bool {
        true
    }
}

/// Deadline of one attempt.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// A deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.started.elapsed())
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        self.started.elapsed() > self.limit
    }

    /// The full per-attempt limit.
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called after a failed attempt, before sleeping.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Attempt budget
    /// * `reason` - Why the attempt failed
    /// * `delay` - Sleep before the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, reason: &str, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _reason: &str, _delay: Duration) {}
}

/// Callback that logs each failed attempt at debug level.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, reason: &str, delay: Duration) {
        log::debug!(
            "Execution failure (attempt {attempt}/{max_attempts}): {reason}; retrying in {}s",
            delay.as_secs()
        );
    }
}

/// Execute an operation under a retry policy.
///
/// Each attempt receives its own [`Deadline`]; a value produced after the
/// deadline counts as a timeout. `Retry` outcomes and (when the policy
/// says so) falsy values are retried; `Abort` ends the loop immediately.
///
/// # Returns
/// `Some(value)` on success. Once the budget is spent, `None`, or
/// [`Error::RetryExhausted`] when the policy fails on timeout.
pub fn retry<T, F>(
    policy: &RetryPolicy,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<Option<T>>
where
    T: Truthy,
    F: FnMut(&Deadline) -> Attempt<T>,
{
    let mut last_error: Option<String> = None;

    for attempt in 1..=policy.attempts {
        let deadline = Deadline::after(policy.timeout);

        let reason = match operation(&deadline) {
            Attempt::Abort(e) => return Err(e),
            Attempt::Retry(e) => e.to_string(),
            Attempt::Done(_) if deadline.expired() => {
                format!("attempt exceeded its {}s deadline", policy.timeout.as_secs())
            }
            Attempt::Done(value) if !policy.false_is_failure || value.is_truthy() => {
                return Ok(Some(value));
            }
            Attempt::Done(_) => "condition is not met yet".to_string(),
        };

        if attempt < policy.attempts {
            if let Some(cb) = callback {
                cb.on_retry(attempt, policy.attempts, &reason, policy.delay);
            }
            thread::sleep(policy.delay);
        }
        last_error = Some(reason);
    }

    if policy.fail_on_timeout {
        return Err(Error::RetryExhausted {
            attempts: policy.attempts,
            seconds: policy.total_wait().as_secs(),
            last_error,
        });
    }
    Ok(None)
}

/// Execute an operation that must succeed within the budget.
pub fn retry_or_fail<T, F>(
    policy: &RetryPolicy,
    callback: Option<&dyn RetryCallback>,
    operation: F,
) -> Result<T>
where
    T: Truthy,
    F: FnMut(&Deadline) -> Attempt<T>,
{
    let policy = policy.clone().fail_on_timeout(true);
    match retry(&policy, callback, operation)? {
        Some(value) => Ok(value),
        // zero-attempt budget
        None => Err(Error::RetryExhausted {
            attempts: policy.attempts,
            seconds: policy.total_wait().as_secs(),
            last_error: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn failure() -> Error {
        Error::CommandFailed {
            command: "cibadmin -Q".to_string(),
            stderr: "Signon to CIB failed".to_string(),
            status: Some(107),
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_secs(5), Duration::ZERO)
    }

    #[test]
    fn test_retry_fails_twice_then_succeeds() {
        let attempts = Cell::new(0);
        let result = retry(&quick(3), None, |_| {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Attempt::Retry(failure())
            } else {
                Attempt::Done(true)
            }
        });

        assert_eq!(result.unwrap(), Some(true));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_retry_exhausted_reports_elapsed_seconds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5), Duration::from_millis(1))
            .fail_on_timeout(true);
        let attempts = Cell::new(0);

        let err = retry::<bool, _>(&policy, None, |_| {
            attempts.set(attempts.get() + 1);
            Attempt::Retry(failure())
        })
        .unwrap_err();

        assert_eq!(attempts.get(), 3);
        assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
        assert!(
            err.to_string().starts_with("execution timeout after 0 seconds (3 attempts)"),
            "{err}"
        );
        assert!(err.to_string().contains("Signon to CIB failed"));
    }

    #[test]
    fn test_retry_exhausted_seconds_is_attempts_times_delay() {
        let policy = RetryPolicy::new(2, Duration::from_secs(5), Duration::from_secs(1))
            .fail_on_timeout(true);
        let err = retry::<bool, _>(&policy, None, |_| Attempt::Done(false)).unwrap_err();
        assert!(err.to_string().starts_with("execution timeout after 2 seconds"));
    }

    #[test]
    fn test_retry_silent_exhaustion_returns_none() {
        let result = retry::<bool, _>(&quick(2), None, |_| Attempt::Retry(failure()));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_false_is_failure_policy() {
        let attempts = Cell::new(0);
        let result = retry(&quick(4), None, |_| {
            attempts.set(attempts.get() + 1);
            Attempt::Done(attempts.get() == 2)
        });
        assert_eq!(result.unwrap(), Some(true));
        assert_eq!(attempts.get(), 2);

        // without the policy the first value is the answer
        let result = retry(&quick(4).false_is_failure(false), None, |_| Attempt::Done(false));
        assert_eq!(result.unwrap(), Some(false));
    }

    #[test]
    fn test_abort_is_not_retried() {
        let attempts = Cell::new(0);
        let result = retry::<bool, _>(&quick(5), None, |_| {
            attempts.set(attempts.get() + 1);
            Attempt::Abort(Error::MissingPrimitive {
                id: "vip".to_string(),
            })
        });

        assert!(matches!(result, Err(Error::MissingPrimitive { .. })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_late_value_counts_as_timeout() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::ZERO);
        let result = retry(&policy, None, |_| {
            thread::sleep(Duration::from_millis(5));
            Attempt::Done(true)
        });
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_attempt_from_result_uses_category() {
        let attempt: Attempt<()> = Err(failure()).into();
        assert!(matches!(attempt, Attempt::Retry(_)));

        let attempt: Attempt<()> = Err(Error::InvalidScore("x".to_string())).into();
        assert!(matches!(attempt, Attempt::Abort(_)));
    }

    #[test]
    fn test_retry_or_fail_returns_value() {
        let value = retry_or_fail(&quick(1), Some(&NoCallback), |_| {
            Attempt::Done("ok".to_string())
        });
        assert_eq!(value.unwrap(), "ok");
    }
}
