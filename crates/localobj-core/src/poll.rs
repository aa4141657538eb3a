use crate::config::PollConfig;
use crate::error::StoreError;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::fmt::Display;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run `probe` until it succeeds, the deadline passes, or `token` is cancelled.
///
/// Delays start at `initial_interval` and double after every failed attempt,
/// capped at `max_interval`. Neither a probe nor a sleep may run past the
/// deadline.
pub async fn poll_until_ready<F, Fut, E>(
    config: &PollConfig,
    token: &CancellationToken,
    mut probe: F,
) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let timeout = config.timeout();
    let deadline = Instant::now() + timeout;
    let mut delays = ExponentialBuilder::default()
        .with_factor(2.0)
        .with_min_delay(config.initial_interval())
        .with_max_delay(config.max_interval())
        .with_max_times(usize::MAX)
        .build();

    info!(
        "Polling store readiness (timeout {:?}, initial interval {:?})",
        timeout,
        config.initial_interval()
    );

    let mut attempt: u32 = 0;
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(StoreError::Cancelled),
            outcome = tokio::time::timeout(deadline - now, probe()) => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                info!(attempt, "Store is ready");
                return Ok(());
            }
            Ok(Err(e)) => debug!(attempt, error = %e, "Readiness probe failed"),
            Err(_) => debug!(attempt, "Readiness probe did not finish before the deadline"),
        }

        let delay = delays
            .next()
            .unwrap_or_else(|| config.max_interval())
            .min(deadline.saturating_duration_since(Instant::now()));

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(StoreError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    warn!(attempts = attempt, "Store did not become ready within {:?}", timeout);
    Err(StoreError::PollTimeout(timeout))
}
