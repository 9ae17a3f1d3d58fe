use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::context::SessionContext;
use super::CHECK_INTERVAL;

/// Invoked once when a session crosses its idle window.
#[async_trait]
pub trait SignOutHook: Send + Sync {
    async fn idle_expired(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    /// No activity has been recorded yet.
    NoBaseline,
    Active { remaining: Duration },
    Expired,
}

/// Periodically compares the session's elapsed idle time against its window.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    context: Arc<SessionContext>,
    check_interval: Duration,
}

impl IdleTimer {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            check_interval: CHECK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    pub fn check(&self) -> IdleVerdict {
        if self.context.last_activity().is_none() {
            return IdleVerdict::NoBaseline;
        }
        if self.context.is_idle() {
            IdleVerdict::Expired
        } else {
            IdleVerdict::Active {
                remaining: self.context.remaining(),
            }
        }
    }

    /// Run the periodic check on the runtime until the session expires or the
    /// returned handle is dropped.
    pub fn spawn(self, hook: Arc<dyn SignOutHook>) -> IdleTimerHandle {
        let period = self.check_interval;
        let task = tokio::spawn(async move {
            // First check happens one full period after start, not immediately.
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.check() {
                    IdleVerdict::Expired => {
                        tracing::info!(
                            last_activity = ?self.context.last_activity(),
                            "Session idle window elapsed, signing out"
                        );
                        hook.idle_expired().await;
                        break;
                    }
                    IdleVerdict::Active { remaining } => {
                        tracing::trace!(remaining_ms = remaining.as_millis() as u64, "Idle check passed");
                    }
                    IdleVerdict::NoBaseline => {
                        tracing::trace!("Idle check skipped, no activity recorded");
                    }
                }
            }
        });

        IdleTimerHandle { task }
    }
}

/// Owns the running timer task. Dropping it stops the timer.
#[derive(Debug)]
pub struct IdleTimerHandle {
    task: JoinHandle<()>,
}

impl IdleTimerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for IdleTimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
