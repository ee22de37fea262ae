//! Consecutive-failure circuit breaker.
//!
//! # States
//! - Closed: operations run normally, failures are counted
//! - Open: operations are rejected without being invoked
//! - HalfOpen: a single probe is let through once the open window has passed
//!
//! # Transitions
//! ```text
//! Closed   -> Open:     error_count >= max_errors
//! Open     -> HalfOpen: elapsed since last failure > timeout
//! HalfOpen -> Closed:   probe succeeds (error_count reset to 0)
//! HalfOpen -> Open:     probe fails (failure time recorded)
//! ```
//!
//! All reads and writes of the state happen under one mutex. The lock is
//! never held while the wrapped operation runs; instead the caller holds a
//! [`Permit`] that settles the outcome. Dropping an unsettled permit (the
//! caller's future was cancelled) counts as a failure, so an abandoned
//! probe can never leave the breaker stuck in HalfOpen.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub max_errors: u32,
    /// How long the circuit stays open before a probe is allowed
    pub timeout: Duration,
}

/// Error returned by [`CircuitBreaker::call`]
#[derive(Debug)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation
    Open,
    /// The operation ran and failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => f.write_str("circuit breaker is open"),
            BreakerError::Inner(e) => e.fmt(f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BreakerError::Open => None,
            BreakerError::Inner(e) => Some(e),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    error_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                error_count: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn error_count(&self) -> u32 {
        self.lock().error_count
    }

    /// Run `operation` through the breaker
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().ok_or(BreakerError::Open)?;

        match operation().await {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(e) => {
                permit.fail();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Decide under the lock whether an operation may run now
    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Some(Permit::new(self, false)),
            CircuitState::Open => {
                let expired = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() > self.config.timeout);
                if !expired {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.probe_in_flight = true;
                tracing::info!("Circuit breaker half-open, probing ranking service");
                Some(Permit::new(self, true))
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    return None;
                }
                inner.probe_in_flight = true;
                Some(Permit::new(self, true))
            }
        }
    }

    fn record_success(&self, probe: bool) {
        let mut inner = self.lock();
        // only the probe may close a tripped circuit
        if !probe && inner.state != CircuitState::Closed {
            tracing::debug!("Ignoring late success while circuit is {}", inner.state);
            return;
        }
        if inner.state != CircuitState::Closed {
            tracing::info!("Circuit breaker closed after successful call");
        }
        inner.error_count = 0;
        inner.state = CircuitState::Closed;
        if probe {
            inner.probe_in_flight = false;
        }
    }

    fn record_failure(&self, probe: bool) {
        let mut inner = self.lock();
        inner.error_count = inner.error_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());

        if probe {
            inner.probe_in_flight = false;
            inner.state = CircuitState::Open;
            tracing::warn!("Circuit breaker probe failed, reopening");
        } else if inner.error_count >= self.config.max_errors && inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            tracing::warn!(
                "Circuit breaker opened after {} consecutive failures",
                inner.error_count
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission to run one operation. Must be settled with `succeed` or
/// `fail`; dropping it unsettled records a failure.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.probe);
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_failure(self.probe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn breaker(max_errors: u32, timeout_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            max_errors,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    async fn fail(cb: &CircuitBreaker, calls: &AtomicUsize) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("boom")
        })
        .await
    }

    async fn succeed(cb: &CircuitBreaker, calls: &AtomicUsize) -> Result<u8, BreakerError<&'static str>> {
        cb.call(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<u8, &'static str>(1)
        })
        .await
    }

    #[tokio::test]
    async fn test_trips_after_max_errors_and_short_circuits() {
        let cb = breaker(3, 10_000);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            assert!(matches!(fail(&cb, &calls).await, Err(BreakerError::Inner("boom"))));
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.error_count(), 3);

        let result = succeed(&cb, &calls).await;
        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "open circuit must not invoke the operation");
    }

    #[tokio::test]
    async fn test_half_open_probe_success_closes() {
        let cb = breaker(3, 30);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let _ = fail(&cb, &calls).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(succeed(&cb, &calls).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.error_count(), 0);
    }

    #[tokio::test]
    async fn test_half_open_probe_failure_reopens() {
        let cb = breaker(2, 30);
        let calls = AtomicUsize::new(0);

        let _ = fail(&cb, &calls).await;
        let _ = fail(&cb, &calls).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(matches!(fail(&cb, &calls).await, Err(BreakerError::Inner(_))));
        assert_eq!(cb.state(), CircuitState::Open);

        // The failed probe restarted the open window
        assert!(matches!(succeed(&cb, &calls).await, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_count() {
        let cb = breaker(3, 10_000);
        let calls = AtomicUsize::new(0);

        let _ = fail(&cb, &calls).await;
        let _ = fail(&cb, &calls).await;
        succeed(&cb, &calls).await.unwrap();
        let _ = fail(&cb, &calls).await;
        let _ = fail(&cb, &calls).await;

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.error_count(), 2);
    }

    #[tokio::test]
    async fn test_only_one_probe_in_half_open() {
        let cb = breaker(1, 10);
        let calls = AtomicUsize::new(0);

        let _ = fail(&cb, &calls).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let probe = cb.try_acquire().expect("probe should be admitted");
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.try_acquire().is_none(), "second caller must be rejected while probing");

        probe.succeed();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_late_success_does_not_close_tripped_circuit() {
        let cb = breaker(1, 60_000);

        let slow = cb.try_acquire().expect("closed circuit admits calls");
        cb.try_acquire().expect("closed circuit admits calls").fail();
        assert_eq!(cb.state(), CircuitState::Open);

        slow.succeed();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.error_count(), 1);
        assert!(cb.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_probe_does_not_wedge_half_open() {
        let cb = breaker(1, 20);
        let calls = AtomicUsize::new(0);

        let _ = fail(&cb, &calls).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let slow = cb.call(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), &'static str>(())
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());

        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(succeed(&cb, &calls).await.unwrap(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_all_counted() {
        let cb = Arc::new(breaker(100, 10_000));
        let mut handles = Vec::new();

        for _ in 0..20 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                let _ = cb
                    .call(|| async {
                        tokio::task::yield_now().await;
                        Err::<(), &'static str>("boom")
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.error_count(), 20);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_error_display() {
        let open: BreakerError<std::io::Error> = BreakerError::Open;
        assert_eq!(open.to_string(), "circuit breaker is open");
    }
}
