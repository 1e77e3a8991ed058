mod auth;
mod report;
mod scan;

pub use auth::{
    Ack, EmailRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    RegisteredUser,
};
pub use report::{Report, ReportSummary};
pub use scan::{AttackType, CnnType, REPORT_FILE_NAME, ScanOutcome, ScanPayload, ScanRequest};
