//! Sign-in state for admin sessions.
//!
//! [`IdentityProvider`] is the seam between the HTTP layer and whatever holds
//! the credentials. [`gate::IdentityGate`] turns the provider's state into a
//! render/redirect decision for protected views.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::JwtError;
use crate::session::SessionContext;

pub mod gate;
pub mod local;

pub use gate::{GateState, GateView, IdentityGate, MountedGate};
pub use local::LocalIdentityProvider;

/// The signed-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthState {
    SignedIn { session: Uuid, subject: Subject },
    SignedOut,
}

impl AuthState {
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            AuthState::SignedIn { subject, .. } => Some(subject),
            AuthState::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignOutReason {
    /// The admin signed out.
    Explicit,
    /// The idle window elapsed.
    Idle,
}

/// State change of one session, as published by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthEvent {
    pub session: Uuid,
    pub state: AuthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SignOutReason>,
}

/// A freshly signed-in session.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub session: Uuid,
    pub subject: Subject,
    /// Value for the session cookie.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password hashing error: {0}")]
    Hash(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError>;

    /// Returns whether the session existed.
    async fn sign_out(&self, session: Uuid, reason: SignOutReason) -> bool;

    /// Sign-in state behind a session cookie. Errors resolve to signed out.
    async fn resolve(&self, token: &str) -> AuthState;

    /// Current state of `session` first, then each change to it.
    fn subscribe(&self, session: Uuid) -> Subscription;

    /// Last-activity context of a live session.
    fn session_context(&self, session: Uuid) -> Option<Arc<SessionContext>>;
}

/// Admin authorization seam. Every signed-in subject is currently an admin;
/// role checks belong here once accounts carry roles.
pub fn authorize_admin(subject: &Subject) -> bool {
    tracing::trace!(subject = %subject.email, "Admin authorization granted");
    true
}

/// Stream of state changes for one session. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    session: Uuid,
    initial: Option<AuthState>,
    events: broadcast::Receiver<AuthEvent>,
}

impl Subscription {
    pub fn new(session: Uuid, initial: AuthState, events: broadcast::Receiver<AuthEvent>) -> Self {
        Self {
            session,
            initial: Some(initial),
            events,
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Next state for this session. `None` once the provider is gone.
    pub async fn next(&mut self) -> Option<AuthState> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.events.recv().await {
                Ok(event) if event.session == self.session => return Some(event.state),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %self.session, skipped, "Auth subscription lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
