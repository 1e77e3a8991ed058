mod credential;
mod guard;
mod manager;

pub use credential::{Credential, CredentialError, Validity};
pub use guard::{Route, RouteDecision, RouteGuard, decide, resolve_route_decision};
pub use manager::{SessionManager, SessionState};
