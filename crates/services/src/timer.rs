//! Periodic tick delivery for running sessions.

use std::fmt;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::TimerError;

/// Receiving side of one scheduled ticker.
pub type TickReceiver = mpsc::UnboundedReceiver<()>;

/// Cancellable handle to a scheduled ticker. Dropping it also cancels.
#[derive(Default)]
pub struct TickHandle {
    abort: Option<AbortHandle>,
}

impl TickHandle {
    #[must_use]
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort: Some(abort) }
    }

    /// Handle with nothing behind it, for schedulers driven by hand.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Stop the ticker. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.abort.as_ref().is_some_and(|a| !a.is_finished())
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A started ticker: the handle stays with the session, the receiver goes
/// to whoever drives the session loop.
#[derive(Debug)]
pub struct TickSubscription {
    pub handle: TickHandle,
    pub ticks: TickReceiver,
}

/// Source of periodic ticks.
pub trait TickScheduler: Send + Sync {
    /// Start delivering one unit tick per `period`.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::Unavailable` if the ticker cannot be started.
    fn schedule(&self, period: Duration) -> Result<TickSubscription, TimerError>;
}

/// Ticker backed by a `tokio` interval task on the current runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTickScheduler;

impl TickScheduler for TokioTickScheduler {
    fn schedule(&self, period: Duration) -> Result<TickSubscription, TimerError> {
        if period.is_zero() {
            return Err(TimerError::Unavailable("tick period must be non-zero".into()));
        }
        let runtime = Handle::try_current().map_err(|e| TimerError::Unavailable(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        Ok(TickSubscription {
            handle: TickHandle::new(task.abort_handle()),
            ticks: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_outside_a_runtime_is_unavailable() {
        let err = TokioTickScheduler
            .schedule(Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, TimerError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_ticks_until_cancelled() {
        let TickSubscription { mut handle, mut ticks } = TokioTickScheduler
            .schedule(Duration::from_secs(1))
            .unwrap();

        for _ in 0..3 {
            assert_eq!(ticks.recv().await, Some(()));
        }
        assert!(handle.is_active());

        handle.cancel();
        handle.cancel();
        assert_eq!(ticks.recv().await, None);
        assert!(!handle.is_active());
    }

    #[test]
    fn detached_handle_cancels_quietly() {
        let mut handle = TickHandle::detached();
        assert!(!handle.is_active());
        handle.cancel();
    }
}
