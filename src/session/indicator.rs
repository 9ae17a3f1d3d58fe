use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::context::SessionContext;
use super::WARNING_THRESHOLD;

/// What the admin shell should show for the remaining idle time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndicatorView {
    /// Remaining time reached zero; the gate takes over from here.
    Hidden,
    Normal { remaining_ms: u64, display: String },
    Warning { remaining_ms: u64, display: String },
}

impl IndicatorView {
    pub fn is_warning(&self) -> bool {
        matches!(self, IndicatorView::Warning { .. })
    }
}

/// Remaining-time readout over a shared [`SessionContext`].
#[derive(Debug, Clone)]
pub struct SessionIndicator {
    context: Arc<SessionContext>,
}

impl SessionIndicator {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self { context }
    }

    pub fn view(&self) -> IndicatorView {
        Self::view_for(self.context.remaining())
    }

    /// One-click extension. The returned view is never in the warning state.
    pub fn reset(&self) -> IndicatorView {
        Self::view_for(self.context.reset())
    }

    pub fn view_for(remaining: Duration) -> IndicatorView {
        if remaining.is_zero() {
            return IndicatorView::Hidden;
        }
        let remaining_ms = remaining.as_millis() as u64;
        let display = format_remaining(remaining);
        if remaining <= WARNING_THRESHOLD {
            IndicatorView::Warning { remaining_ms, display }
        } else {
            IndicatorView::Normal { remaining_ms, display }
        }
    }
}

/// `m:ss` with zero-padded seconds, truncating sub-second remainders.
pub fn format_remaining(remaining: Duration) -> String {
    let ms = remaining.as_millis();
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use crate::session::IDLE_WINDOW;

    fn indicator() -> (Arc<ManualClock>, Arc<SessionContext>, SessionIndicator) {
        let clock = Arc::new(ManualClock::default());
        let context = Arc::new(SessionContext::new(clock.clone()));
        let indicator = SessionIndicator::new(context.clone());
        (clock, context, indicator)
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_remaining(Duration::from_millis(600_000)), "10:00");
        assert_eq!(format_remaining(Duration::from_millis(481_000)), "8:01");
        assert_eq!(format_remaining(Duration::from_millis(65_999)), "1:05");
        assert_eq!(format_remaining(Duration::from_millis(999)), "0:00");
        assert_eq!(format_remaining(Duration::ZERO), "0:00");
    }

    #[test]
    fn shows_normal_state_early_in_window() {
        let (clock, context, indicator) = indicator();
        context.touch();
        clock.advance(Duration::from_millis(119_000));

        let view = indicator.view();
        assert_eq!(
            view,
            IndicatorView::Normal {
                remaining_ms: 481_000,
                display: "8:01".to_string()
            }
        );
        assert!(!view.is_warning());
    }

    #[test]
    fn warns_in_final_two_minutes() {
        let (clock, context, indicator) = indicator();
        context.touch();

        clock.advance(Duration::from_millis(479_999));
        assert!(!indicator.view().is_warning());

        clock.advance(Duration::from_millis(1));
        let view = indicator.view();
        assert!(view.is_warning());
        assert_eq!(
            view,
            IndicatorView::Warning {
                remaining_ms: 120_000,
                display: "2:00".to_string()
            }
        );
    }

    #[test]
    fn hidden_once_remaining_reaches_zero() {
        let (clock, context, indicator) = indicator();
        context.touch();
        clock.advance(IDLE_WINDOW);
        assert_eq!(indicator.view(), IndicatorView::Hidden);
    }

    #[test]
    fn reset_clears_warning_and_restores_full_window() {
        let (clock, context, indicator) = indicator();
        context.touch();
        clock.advance(Duration::from_millis(550_000));
        assert!(indicator.view().is_warning());

        let view = indicator.reset();
        assert_eq!(
            view,
            IndicatorView::Normal {
                remaining_ms: IDLE_WINDOW.as_millis() as u64,
                display: "10:00".to_string()
            }
        );
        assert_eq!(indicator.reset(), view);
    }

    #[test]
    fn remaining_matches_window_minus_elapsed() {
        for elapsed_ms in [0u64, 1_000, 59_999, 480_000, 599_000, 650_000] {
            let (clock, context, indicator) = indicator();
            context.touch();
            clock.advance(Duration::from_millis(elapsed_ms));

            let expected = IDLE_WINDOW.as_millis() as u64;
            let expected = expected.saturating_sub(elapsed_ms);
            match indicator.view() {
                IndicatorView::Hidden => assert_eq!(expected, 0),
                IndicatorView::Normal { remaining_ms, .. } | IndicatorView::Warning { remaining_ms, .. } => {
                    assert_eq!(remaining_ms, expected)
                }
            }
        }
    }
}
