use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{generate_jwt, token_expiry, validate_jwt, verify_password, Claims};
use crate::config::AppConfig;
use crate::content::admins;
use crate::database::DocumentStore;
use crate::session::{Clock, IdleTimer, IdleTimerHandle, SessionContext, SignOutHook, SystemClock, CHECK_INTERVAL, IDLE_WINDOW};

use super::{AuthEvent, AuthState, IdentityError, IdentityProvider, SignIn, SignOutReason, Subject, Subscription};

const EVENT_CAPACITY: usize = 64;

struct SessionEntry {
    subject: Subject,
    context: Arc<SessionContext>,
    // Dropping the entry stops the timer.
    _timer: IdleTimerHandle,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    events: broadcast::Sender<AuthEvent>,
    clock: Arc<dyn Clock>,
    jwt_secret: String,
    token_ttl_hours: u64,
    idle_window: Duration,
    check_interval: Duration,
}

/// Admin accounts from the `admins` collection, sessions in process memory.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityProvider")
            .field("sessions", &self.active_sessions())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl LocalIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_secret: impl Into<String>, token_ttl_hours: u64) -> Self {
        Self::with_clock(store, jwt_secret, token_ttl_hours, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DocumentStore>,
        jwt_secret: impl Into<String>,
        token_ttl_hours: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                sessions: RwLock::new(HashMap::new()),
                events,
                clock,
                jwt_secret: jwt_secret.into(),
                token_ttl_hours,
                idle_window: IDLE_WINDOW,
                check_interval: CHECK_INTERVAL,
            }),
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self::new(store, config.security.jwt_secret.clone(), config.session.token_ttl_hours)
    }

    /// Shorter idle checks, for tests. Must be called before any sign-in.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.check_interval = check_interval;
        }
        self
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    fn publish(&self, session: Uuid, state: AuthState, reason: Option<SignOutReason>) {
        // No receivers is fine.
        let _ = self.inner.events.send(AuthEvent { session, state, reason });
    }

    fn lookup(&self, session: Uuid) -> Option<(Subject, Arc<SessionContext>)> {
        let sessions = self.inner.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(&session)
            .map(|entry| (entry.subject.clone(), entry.context.clone()))
    }
}

/// Signs a session out from its idle timer.
struct IdleSignOut {
    provider: Weak<Inner>,
    session: Uuid,
}

#[async_trait]
impl SignOutHook for IdleSignOut {
    async fn idle_expired(&self) {
        let Some(inner) = self.provider.upgrade() else {
            return;
        };
        let provider = LocalIdentityProvider { inner };
        let session = self.session;
        // Sign-out drops the timer handle, which aborts the task running this hook.
        tokio::spawn(async move {
            provider.sign_out(session, SignOutReason::Idle).await;
        });
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let Some(account) = admins::by_email(self.inner.store.as_ref(), email).await else {
            tracing::info!(email = %admins::normalize_email(email), "Sign-in refused, unknown account");
            return Err(IdentityError::InvalidCredentials);
        };

        let verified = verify_password(password, &account.password_hash).map_err(|e| {
            tracing::error!(account = %account.id, error = %e, "Stored password hash is unreadable");
            IdentityError::Hash(e.to_string())
        })?;
        if !verified {
            tracing::info!(account = %account.id, "Sign-in refused, wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        let session = Uuid::new_v4();
        let claims = Claims::new(account.id.clone(), account.email.clone(), session, self.inner.token_ttl_hours);
        let token = generate_jwt(&claims, &self.inner.jwt_secret)?;
        let subject = Subject {
            id: account.id,
            email: account.email,
        };

        let context = Arc::new(SessionContext::with_window(self.inner.idle_window, self.inner.clock.clone()));
        context.touch();
        let timer = IdleTimer::new(context.clone())
            .with_interval(self.inner.check_interval)
            .spawn(Arc::new(IdleSignOut {
                provider: Arc::downgrade(&self.inner),
                session,
            }));

        {
            let mut sessions = self.inner.sessions.write().unwrap_or_else(|e| e.into_inner());
            sessions.insert(
                session,
                SessionEntry {
                    subject: subject.clone(),
                    context,
                    _timer: timer,
                },
            );
        }

        tracing::info!(session = %session, subject = %subject.email, "Admin signed in");
        self.publish(
            session,
            AuthState::SignedIn {
                session,
                subject: subject.clone(),
            },
            None,
        );

        Ok(SignIn {
            session,
            subject,
            token,
            expires_at: token_expiry(self.inner.clock.now(), self.inner.token_ttl_hours),
        })
    }

    async fn sign_out(&self, session: Uuid, reason: SignOutReason) -> bool {
        let removed = {
            let mut sessions = self.inner.sessions.write().unwrap_or_else(|e| e.into_inner());
            sessions.remove(&session)
        };
        let Some(entry) = removed else {
            return false;
        };

        tracing::info!(session = %session, subject = %entry.subject.email, ?reason, "Admin signed out");
        self.publish(session, AuthState::SignedOut, Some(reason));
        true
    }

    async fn resolve(&self, token: &str) -> AuthState {
        let claims = match validate_jwt(token, &self.inner.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                return AuthState::SignedOut;
            }
        };

        let Some((subject, context)) = self.lookup(claims.sid) else {
            return AuthState::SignedOut;
        };
        // The timer only checks once per interval; never serve an idle session in between.
        if context.is_idle() {
            self.sign_out(claims.sid, SignOutReason::Idle).await;
            return AuthState::SignedOut;
        }
        AuthState::SignedIn {
            session: claims.sid,
            subject,
        }
    }

    fn subscribe(&self, session: Uuid) -> Subscription {
        // Receiver first so no event between the snapshot and the subscription is lost.
        let events = self.inner.events.subscribe();
        let initial = match self.lookup(session) {
            Some((subject, _)) => AuthState::SignedIn { session, subject },
            None => AuthState::SignedOut,
        };
        Subscription::new(session, initial, events)
    }

    fn session_context(&self, session: Uuid) -> Option<Arc<SessionContext>> {
        self.lookup(session).map(|(_, context)| context)
    }
}
