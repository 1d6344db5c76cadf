//! Bounded exponential backoff for cluster writes

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, TokioClock};
use crate::error::{KubeError, Result};

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the second attempt
    pub initial: Duration,
    /// Multiplier applied after every attempt
    pub factor: f64,
    /// Up to this fraction of the delay is added at random
    pub jitter: f64,
    /// Maximum number of attempts
    pub steps: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            factor: 1.5,
            jitter: 0.4,
            steps: 10,
        }
    }
}

impl Backoff {
    /// Policy with no delay between attempts
    pub fn immediate(steps: u32) -> Self {
        Self {
            initial: Duration::ZERO,
            factor: 1.0,
            jitter: 0.0,
            steps,
        }
    }

    /// Delay after the given (zero-based) failed attempt, before jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.initial.mul_f64(self.factor.powi(exponent))
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter > 0.0 {
            base + base.mul_f64(rand::random::<f64>() * self.jitter)
        } else {
            base
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted
///
/// The last error is returned on exhaustion. Cancellation is checked before
/// every attempt and interrupts the sleep between attempts.
pub async fn retry<T, F, Fut>(
    policy: &Backoff,
    clock: &dyn Clock,
    token: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let steps = policy.steps.max(1);
    let mut attempt = 0;

    loop {
        if token.is_cancelled() {
            return Err(KubeError::Cancelled);
        }

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => e,
        };

        attempt += 1;
        if attempt >= steps {
            tracing::debug!(attempts = attempt, error = %err, "Giving up after retries");
            return Err(err);
        }

        let delay = policy.delay(attempt - 1);
        tracing::debug!(attempt, delay = ?delay, error = %err, "Retrying");

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(KubeError::Cancelled),
            _ = clock.sleep(delay) => {}
        }
    }
}

/// Backoff policy bundled with its clock and cancellation token
#[derive(Clone)]
pub struct Retrier {
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    token: CancellationToken,
}

impl Retrier {
    pub fn new(clock: Arc<dyn Clock>, token: CancellationToken) -> Self {
        Self {
            clock,
            backoff: Backoff::default(),
            token,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Retry `op` under this policy
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry(&self.backoff, self.clock.as_ref(), &self.token, op).await
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(Arc::new(TokioClock), CancellationToken::new())
    }
}

impl std::fmt::Debug for Retrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrier")
            .field("backoff", &self.backoff)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> KubeError {
        KubeError::Conflict {
            resource: "ConfigMap x".to_string(),
            message: "try again".to_string(),
        }
    }

    #[test]
    fn test_base_delay_grows_exponentially() {
        let policy = Backoff::default();
        assert_eq!(policy.base_delay(0), Duration::from_millis(500));
        assert_eq!(policy.base_delay(1), Duration::from_millis(750));
        assert_eq!(policy.base_delay(2), Duration::from_millis(1125));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let clock = ManualClock::new();
        let token = CancellationToken::new();
        let calls = &AtomicU32::new(0);

        let value = retry(&Backoff::default(), &clock, &token, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        // jitter only ever lengthens the delay, by at most 40%
        assert!(sleeps[0] >= Duration::from_millis(500) && sleeps[0] <= Duration::from_millis(700));
        assert!(sleeps[1] >= Duration::from_millis(750) && sleeps[1] <= Duration::from_millis(1050));
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let clock = ManualClock::new();
        let token = CancellationToken::new();
        let calls = &AtomicU32::new(0);

        let err = retry(&Backoff::default(), &clock, &token, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(transient())
        })
        .await
        .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(clock.sleeps().len(), 9);
    }

    #[tokio::test]
    async fn test_retry_stops_when_cancelled() {
        let clock = ManualClock::new();
        let token = CancellationToken::new();
        let calls = &AtomicU32::new(0);

        let cancel = &token;
        let err = retry(&Backoff::default(), &clock, &token, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            cancel.cancel();
            Err::<(), _>(transient())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, KubeError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_cancellation() {
        let retrier = Retrier::new(Arc::new(ManualClock::new()), CancellationToken::new());
        let calls = &AtomicU32::new(0);

        let err = retrier
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(KubeError::Cancelled)
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
