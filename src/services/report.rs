use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::models::{Ack, EmailRequest, Report};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

const REPORT_FAILED: &str = "Failed to load report";
const REPORTS_FAILED: &str = "Failed to load reports";
const EMAIL_FAILED: &str = "Failed to send the report. Please try again.";

pub fn is_valid_email(address: &str) -> bool {
    !address.is_empty() && EMAIL_PATTERN.is_match(address)
}

#[derive(Clone)]
pub struct ReportService {
    api: ApiClient,
}

impl ReportService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_report(&self) -> Result<Report> {
        self.api
            .get_json::<Report>("/report", REPORT_FAILED)
            .await?
            .ok_or_else(|| Error::NotFound("No reports found".to_string()))
    }

    pub async fn get_all_reports(&self) -> Result<Vec<Report>> {
        Ok(self
            .api
            .get_json::<Vec<Report>>("/report/all", REPORTS_FAILED)
            .await?
            .unwrap_or_default())
    }

    /// Asks the backend to mail the report. Malformed addresses are
    /// rejected without touching the network.
    pub async fn email_report(&self, address: &str) -> Result<String> {
        let address = address.trim();
        if !is_valid_email(address) {
            return Err(Error::validation("Please enter a valid email address."));
        }

        let ack: Option<Ack> = self
            .api
            .post_json("/email", &EmailRequest { email: address }, EMAIL_FAILED)
            .await?;

        info!(address, "report emailed");
        Ok(ack
            .and_then(|a| a.msg)
            .unwrap_or_else(|| format!("Report has been successfully sent to {}", address)))
    }
}
