//! Idle-session tracking for signed-in admins.
//!
//! A [`SessionContext`] holds the last-activity timestamp of one session. The
//! [`IdleTimer`] and the [`SessionIndicator`] both receive the same context, so
//! the timer signs a session out exactly when the indicator reaches zero.

use std::time::Duration;

pub mod clock;
pub mod context;
pub mod idle_timer;
pub mod indicator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::SessionContext;
pub use idle_timer::{IdleTimer, IdleTimerHandle, IdleVerdict, SignOutHook};
pub use indicator::{format_remaining, IndicatorView, SessionIndicator};

/// Permitted inactivity before a session is signed out.
pub const IDLE_WINDOW: Duration = Duration::from_millis(600_000);

/// How often the idle timer compares the elapsed time against the window.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How often the indicator stream recomputes remaining time.
pub const INDICATOR_TICK: Duration = Duration::from_secs(1);

/// Remaining time at or below which the indicator switches to its warning state.
pub const WARNING_THRESHOLD: Duration = Duration::from_millis(120_000);

/// User interactions that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Click,
    KeyPress,
    Scroll,
    PointerMove,
    /// Any request against an admin data route.
    Request,
}
