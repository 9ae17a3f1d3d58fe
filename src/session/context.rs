use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::clock::Clock;
use super::IDLE_WINDOW;

/// Last-activity holder shared by the idle timer and the indicator of one session.
///
/// `touch`, `remaining` and `reset` are the only ways to observe or move the
/// timestamp. The timestamp never moves backwards while the context is alive.
pub struct SessionContext {
    idle_window: Duration,
    last_activity: RwLock<Option<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_window(IDLE_WINDOW, clock)
    }

    pub fn with_window(idle_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            idle_window,
            last_activity: RwLock::new(None),
            clock,
        }
    }

    pub fn idle_window(&self) -> Duration {
        self.idle_window
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Record activity at the current instant.
    pub fn touch(&self) {
        let now = self.clock.now();
        let mut last = self.last_activity.write().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(previous) if previous >= now => {}
            _ => *last = Some(now),
        }
    }

    /// Manual extension from the indicator. Returns the remaining time, which is
    /// the full window unless the clock went backwards since the last touch.
    pub fn reset(&self) -> Duration {
        self.touch();
        self.remaining()
    }

    /// Time since the last recorded activity, `None` without a baseline.
    pub fn elapsed(&self) -> Option<Duration> {
        let last = self.last_activity()?;
        let now = self.clock.now();
        // A clock that moved backwards counts as no time elapsed.
        Some((now - last).to_std().unwrap_or(Duration::ZERO))
    }

    /// `max(0, window - elapsed)`; the full window when nothing was recorded yet.
    pub fn remaining(&self) -> Duration {
        match self.elapsed() {
            Some(elapsed) => self.idle_window.saturating_sub(elapsed),
            None => self.idle_window,
        }
    }

    /// Idle iff a baseline exists and the elapsed time meets the window.
    pub fn is_idle(&self) -> bool {
        self.elapsed().map_or(false, |elapsed| elapsed >= self.idle_window)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("idle_window", &self.idle_window)
            .field("last_activity", &self.last_activity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;

    fn context() -> (Arc<ManualClock>, SessionContext) {
        let clock = Arc::new(ManualClock::default());
        let ctx = SessionContext::new(clock.clone());
        (clock, ctx)
    }

    #[test]
    fn no_baseline_is_never_idle() {
        let (clock, ctx) = context();
        clock.advance(Duration::from_secs(3600));
        assert!(ctx.last_activity().is_none());
        assert!(!ctx.is_idle());
        assert_eq!(ctx.remaining(), IDLE_WINDOW);
    }

    #[test]
    fn remaining_counts_down_and_saturates_at_zero() {
        let (clock, ctx) = context();
        ctx.touch();

        clock.advance(Duration::from_millis(119_000));
        assert_eq!(ctx.remaining(), Duration::from_millis(481_000));

        clock.advance(Duration::from_millis(600_000));
        assert_eq!(ctx.remaining(), Duration::ZERO);
        assert!(ctx.is_idle());
    }

    #[test]
    fn idle_exactly_at_window_boundary() {
        let (clock, ctx) = context();
        ctx.touch();

        clock.advance(Duration::from_millis(599_999));
        assert!(!ctx.is_idle());

        clock.advance(Duration::from_millis(1));
        assert!(ctx.is_idle());
    }

    #[test]
    fn touch_never_moves_backwards() {
        let (clock, ctx) = context();
        ctx.touch();
        let first = ctx.last_activity();

        clock.rewind(Duration::from_secs(30));
        ctx.touch();
        assert_eq!(ctx.last_activity(), first);

        clock.advance(Duration::from_secs(60));
        ctx.touch();
        assert!(ctx.last_activity() > first);
    }

    #[test]
    fn reset_restores_full_window_and_is_idempotent() {
        let (clock, ctx) = context();
        ctx.touch();
        clock.advance(Duration::from_secs(500));

        assert_eq!(ctx.reset(), IDLE_WINDOW);
        assert_eq!(ctx.reset(), IDLE_WINDOW);
        assert_eq!(ctx.remaining(), IDLE_WINDOW);
    }

    #[test]
    fn custom_window_is_respected() {
        let clock = Arc::new(ManualClock::default());
        let ctx = SessionContext::with_window(Duration::from_secs(10), clock.clone());
        ctx.touch();
        clock.advance(Duration::from_secs(4));
        assert_eq!(ctx.remaining(), Duration::from_secs(6));
        clock.advance(Duration::from_secs(6));
        assert!(ctx.is_idle());
    }
}
