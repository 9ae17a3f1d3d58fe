use uuid::Uuid;

use super::{AuthState, IdentityProvider, Subject, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No state has arrived from the provider yet.
    Unresolved,
    SignedIn(Subject),
    SignedOut,
}

/// What a protected view should do for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    Loading,
    Render(Subject),
    Redirect(String),
    /// Signed out while already on the login view.
    Nothing,
}

/// Render/redirect decision for protected views.
#[derive(Debug, Clone)]
pub struct IdentityGate {
    state: GateState,
    login_path: String,
}

impl IdentityGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            state: GateState::Unresolved,
            login_path: login_path.into(),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn observe(&mut self, state: AuthState) -> &GateState {
        self.state = match state {
            AuthState::SignedIn { subject, .. } => GateState::SignedIn(subject),
            AuthState::SignedOut => GateState::SignedOut,
        };
        &self.state
    }

    pub fn view(&self, current_path: &str) -> GateView {
        match &self.state {
            GateState::Unresolved => GateView::Loading,
            GateState::SignedIn(subject) => GateView::Render(subject.clone()),
            GateState::SignedOut if self.is_login_path(current_path) => GateView::Nothing,
            GateState::SignedOut => GateView::Redirect(self.login_path.clone()),
        }
    }

    fn is_login_path(&self, current_path: &str) -> bool {
        let path = current_path.split(['?', '#']).next().unwrap_or(current_path);
        path.trim_end_matches('/') == self.login_path.trim_end_matches('/')
    }

    /// Subscribe to the provider for `session`. Without a session the gate is
    /// signed out immediately and nothing is subscribed.
    pub fn mount(self, provider: &dyn IdentityProvider, session: Option<Uuid>) -> MountedGate {
        let mut gate = self;
        let subscription = match session {
            Some(session) => Some(provider.subscribe(session)),
            None => {
                gate.observe(AuthState::SignedOut);
                None
            }
        };
        MountedGate { gate, subscription }
    }
}

/// A gate kept current by its provider subscription.
#[derive(Debug)]
pub struct MountedGate {
    gate: IdentityGate,
    subscription: Option<Subscription>,
}

impl MountedGate {
    pub fn view(&self, current_path: &str) -> GateView {
        self.gate.view(current_path)
    }

    pub fn state(&self) -> &GateState {
        self.gate.state()
    }

    pub fn login_path(&self) -> &str {
        self.gate.login_path()
    }

    /// Wait for the next state. Returns `None` when nothing more will arrive.
    pub async fn changed(&mut self) -> Option<&GateState> {
        let state = self.subscription.as_mut()?.next().await?;
        Some(self.gate.observe(state))
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn unmount(self) -> IdentityGate {
        self.gate
    }
}
