use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run `step` now and then every `period` until `token` is cancelled. A step
/// that is in flight when cancellation arrives is dropped at its next await.
pub async fn run_periodic<F, Fut>(name: &'static str, period: Duration, token: CancellationToken, mut step: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(loop_name = name, period_secs = period.as_secs_f64(), "starting loop");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        debug!(loop_name = name, "tick");
        tokio::select! {
            _ = token.cancelled() => break,
            _ = step() => {}
        }
    }

    info!(loop_name = name, "loop stopped");
}
