//! Time source used for token timestamps and announcement delays

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Injectable clock.
///
/// The default implementation sleeps on tokio's timer, so tests running
/// with a paused runtime (`start_paused = true`) advance it deterministically.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Wall-clock time stamped on tokens
    fn now(&self) -> DateTime<Utc>;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the system time and tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
