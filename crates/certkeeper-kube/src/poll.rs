//! Fixed-interval polling with a deadline

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::{KubeError, Result};

/// Evaluate `condition` immediately, then every `interval`, until it reports
/// `true` or `timeout` has elapsed
///
/// An error from `condition` aborts the poll; conditions that want to keep
/// trying must swallow their errors and return `Ok(false)`.
pub async fn poll_immediate<F, Fut>(
    clock: &dyn Clock,
    token: &CancellationToken,
    interval: Duration,
    timeout: Duration,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = clock.now();

    loop {
        if token.is_cancelled() {
            return Err(KubeError::Cancelled);
        }

        if condition().await? {
            return Ok(());
        }

        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= timeout {
            return Err(KubeError::Timeout(format!("{:?}", timeout)));
        }

        let wait = interval.min(timeout - elapsed);
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(KubeError::Cancelled),
            _ = clock.sleep(wait) => {}
        }
    }
}
