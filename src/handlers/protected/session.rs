use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use tokio::time::{interval, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::auth::clear_session_cookie;
use crate::identity::{GateView, IdentityGate, MountedGate, SignOutReason, Subject};
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::session::{IndicatorView, Interaction, SessionIndicator, INDICATOR_TICK};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub session: Uuid,
    pub subject: Subject,
    pub last_activity: Option<DateTime<Utc>>,
    pub idle_window_ms: u64,
    pub indicator: IndicatorView,
}

impl SessionStatus {
    fn of(current: &CurrentSession) -> Self {
        Self {
            session: current.session,
            subject: current.subject.clone(),
            last_activity: current.context.last_activity(),
            idle_window_ms: current.context.idle_window().as_millis() as u64,
            indicator: SessionIndicator::new(current.context.clone()).view(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityReport {
    pub kind: Interaction,
}

/// GET /api/session - Current session and indicator. Not counted as activity.
pub async fn get(Extension(current): Extension<CurrentSession>) -> ApiResponse<SessionStatus> {
    ApiResponse::success(SessionStatus::of(&current))
}

/// POST /api/session/extend - Reset the idle clock from the indicator
pub async fn extend(Extension(current): Extension<CurrentSession>) -> ApiResponse<IndicatorView> {
    let view = SessionIndicator::new(current.context.clone()).reset();
    tracing::info!(session = %current.session, "Session extended");
    ApiResponse::success(view)
}

/// POST /api/session/activity - Interaction reported by the admin shell
pub async fn activity(
    Extension(current): Extension<CurrentSession>,
    payload: Result<Json<ActivityReport>, JsonRejection>,
) -> ApiResult<IndicatorView> {
    let Json(report) = payload?;
    current.context.touch();
    tracing::trace!(session = %current.session, kind = ?report.kind, "Interaction recorded");
    Ok(ApiResponse::success(SessionIndicator::new(current.context.clone()).view()))
}

/// DELETE /api/session - Sign out
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResponse<serde_json::Value> {
    state.identity.sign_out(current.session, SignOutReason::Explicit).await;
    let cookie = clear_session_cookie(&state.config.session.cookie_name, state.config.session.cookie_secure);
    ApiResponse::success(json!({
        "signed_out": true,
        "redirect": state.config.session.login_path,
    }))
    .with_cookie(cookie)
}

struct IndicatorFeed {
    indicator: SessionIndicator,
    gate: MountedGate,
    ticker: Interval,
    session: Uuid,
    path: String,
    finished: bool,
}

enum FeedTick {
    Indicator,
    Auth { open: bool },
}

/// GET /api/session/events - Indicator recomputed every second, plus sign-in
/// state changes. The stream ends after the session signs out, which drops
/// the mounted gate and its subscription.
pub async fn events(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    OriginalUri(uri): OriginalUri,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut ticker = interval(INDICATOR_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let gate = IdentityGate::new(state.config.session.login_path.clone())
        .mount(state.identity.as_ref(), Some(current.session));

    let feed = IndicatorFeed {
        indicator: SessionIndicator::new(current.context.clone()),
        gate,
        ticker,
        session: current.session,
        path: uri.path().to_string(),
        finished: false,
    };

    let stream = stream::unfold(feed, |mut feed| async move {
        if feed.finished {
            tracing::debug!(session = %feed.session, "Session event stream closed");
            return None;
        }
        let tick = tokio::select! {
            _ = feed.ticker.tick() => FeedTick::Indicator,
            changed = feed.gate.changed() => FeedTick::Auth { open: changed.is_some() },
        };
        let event = match tick {
            FeedTick::Indicator => json_event("indicator", &feed.indicator.view()),
            FeedTick::Auth { open } => {
                let view = if open {
                    feed.gate.view(&feed.path)
                } else {
                    GateView::Redirect(feed.gate.login_path().to_string())
                };
                match view {
                    GateView::Render(subject) => json_event(
                        "auth",
                        &json!({ "status": "signed_in", "session": feed.session, "subject": subject }),
                    ),
                    GateView::Redirect(redirect) => {
                        feed.finished = true;
                        json_event("auth", &json!({ "status": "signed_out", "redirect": redirect }))
                    }
                    GateView::Nothing => {
                        feed.finished = true;
                        json_event("auth", &json!({ "status": "signed_out" }))
                    }
                    GateView::Loading => json_event("indicator", &feed.indicator.view()),
                }
            }
        };
        Some((Ok(event), feed))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode session event");
            Event::default().event(name).data("{}")
        }
    }
}
