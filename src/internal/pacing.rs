use std::{ops::Range, time::Duration};

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Draws a delay uniformly from `range`. An empty range yields its start.
pub(crate) fn random_delay<R: Rng + ?Sized>(rng: &mut R, range: &Range<Duration>) -> Duration {
    let lo = range.start.as_nanos() as u64;
    let hi = range.end.as_nanos() as u64;
    if hi <= lo {
        return range.start;
    }
    Duration::from_nanos(rng.random_range(lo..hi))
}

/// Sleeps for `delay` unless the token fires first. A zero delay still yields.
///
/// Returns `false` when the pause was cut short by cancellation.
pub(crate) async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
