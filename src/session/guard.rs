use std::fmt;

use super::manager::{SessionManager, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Faq,
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Report,
    GetStarted,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Home,
        Route::Faq,
        Route::Login,
        Route::Register,
        Route::ForgotPassword,
        Route::Dashboard,
        Route::Report,
        Route::GetStarted,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Faq => "/faq",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::Dashboard => "/dashboard",
            Route::Report => "/report",
            Route::GetStarted => "/get-started",
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        Self::ALL.into_iter().find(|r| r.path() == normalized)
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Report | Route::GetStarted)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session check still running; show a placeholder.
    Pending,
    Allow,
    /// `replace` means the guarded view must not stay in history.
    Redirect { target: Route, replace: bool },
}

pub fn resolve_route_decision(session: &SessionState) -> RouteDecision {
    if session.loading {
        RouteDecision::Pending
    } else if session.authenticated {
        RouteDecision::Allow
    } else {
        RouteDecision::Redirect {
            target: Route::Login,
            replace: true,
        }
    }
}

pub fn decide(route: Route, session: &SessionState) -> RouteDecision {
    if route.is_protected() {
        resolve_route_decision(session)
    } else {
        RouteDecision::Allow
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn check(&self, route: Route) -> RouteDecision {
        decide(route, &self.session.state())
    }

    /// Waits until the session has finished loading, then returns the one
    /// final decision. Never returns `Pending`.
    pub async fn wait(&self, route: Route) -> RouteDecision {
        if !route.is_protected() {
            return RouteDecision::Allow;
        }

        let mut changes = self.session.subscribe();
        let state = match changes.wait_for(|state| !state.loading).await {
            Ok(state) => *state,
            Err(_) => SessionState::resolved(false),
        };

        resolve_route_decision(&state)
    }
}
