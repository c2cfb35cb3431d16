use tokio::sync::watch;
use tracing::info;

use crate::domain::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The session has not been restored yet; render nothing.
    Hydrating,
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Wait,
    Render,
    /// Navigate to the login route. Issued once per loss of session.
    Redirect(String),
    /// Redirect already issued; keep waiting for navigation.
    Redirecting,
}

/// Guards protected pages. Not a security boundary; the backend verifies
/// every request.
#[derive(Debug, Clone)]
pub struct RouteGate {
    login_route: String,
    state: GateState,
    redirected: bool,
}

impl RouteGate {
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
            state: GateState::Hydrating,
            redirected: false,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn evaluate(&mut self, snapshot: &SessionSnapshot) -> GateDecision {
        self.state = if !snapshot.hydrated {
            GateState::Hydrating
        } else if snapshot.is_logged_in {
            GateState::Authenticated
        } else {
            GateState::Unauthenticated
        };

        match self.state {
            GateState::Hydrating => GateDecision::Wait,
            GateState::Authenticated => {
                self.redirected = false;
                GateDecision::Render
            }
            GateState::Unauthenticated if self.redirected => GateDecision::Redirecting,
            GateState::Unauthenticated => {
                self.redirected = true;
                info!(route = %self.login_route, "No session, redirecting to login");
                GateDecision::Redirect(self.login_route.clone())
            }
        }
    }

    /// Follow the auth store until hydration finishes, then decide.
    pub async fn wait(&mut self, changes: &mut watch::Receiver<SessionSnapshot>) -> GateDecision {
        loop {
            let snapshot = changes.borrow_and_update().clone();
            let decision = self.evaluate(&snapshot);
            if decision != GateDecision::Wait {
                return decision;
            }
            if changes.changed().await.is_err() {
                // Store dropped before hydrating
                let decision = self.evaluate(&SessionSnapshot {
                    hydrated: true,
                    ..Default::default()
                });
                return decision;
            }
        }
    }
}
