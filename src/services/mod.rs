mod auth;
mod report;
mod scan;

pub use auth::{AuthService, LogoutOutcome};
pub use report::{ReportService, is_valid_email};
pub use scan::{ScanService, save_report};
