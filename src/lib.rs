pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod reporter;
pub mod services;
pub mod session;
pub mod storage;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
pub use http::ApiClient;
pub use models::{AttackType, CnnType, Report, ReportSummary, ScanOutcome, ScanRequest};
pub use reporter::{ConsoleReporter, HtmlExporter, JsonExporter};
pub use services::{AuthService, ReportService, ScanService};
pub use session::{Route, RouteDecision, RouteGuard, SessionManager, SessionState, resolve_route_decision};
pub use storage::{Preferences, Store};
