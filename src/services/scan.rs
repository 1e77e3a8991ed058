use reqwest::{Method, header};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::http::{ApiClient, parse_json_body};
use crate::models::{ScanOutcome, ScanPayload, ScanRequest};
use crate::storage::Preferences;

const SCAN_FAILED: &str = "Failed to execute scanner";
const HISTORY_FAILED: &str = "Failed to load previous scans";

#[derive(Clone)]
pub struct ScanService {
    api: ApiClient,
    prefs: Preferences,
}

impl ScanService {
    pub fn new(api: ApiClient, prefs: Preferences) -> Self {
        Self { api, prefs }
    }

    /// Submits a scan and waits for the result.
    ///
    /// A `application/pdf` response is returned as-is without any JSON
    /// parsing. Any other content type must be the JSON envelope carrying
    /// `pdf_report` (required) and `adv_image` (optional); the image is
    /// cached in storage for later display.
    pub async fn execute(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        request.validate()?;

        info!(
            model_url = %request.model_url,
            attack = %request.attack_type,
            cnn = %request.cnn_type,
            "submitting scan"
        );

        let response = self
            .api
            .send(self.api.request(Method::POST, "/scan").json(request), SCAN_FAILED)
            .await?;

        let is_pdf = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_pdf_content_type);

        let bytes = response.bytes().await?;

        let outcome = if is_pdf {
            ScanOutcome::Pdf(bytes.to_vec())
        } else {
            parse_json_body::<ScanPayload>(&bytes)?
                .ok_or_else(|| Error::malformed("Invalid response from the server."))?
                .into_outcome()?
        };

        if let Some(image) = outcome.adversarial_image() {
            if let Err(e) = self.prefs.cache_adversarial_image(image) {
                warn!(error = %e, "could not cache adversarial image");
            }
        }

        Ok(outcome)
    }

    pub async fn previous_scans(&self) -> Result<serde_json::Value> {
        let value: Option<serde_json::Value> =
            self.api.get_json("/previous-scans", HISTORY_FAILED).await?;
        Ok(value.unwrap_or(serde_json::Value::Null))
    }
}

fn is_pdf_content_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
}

pub fn save_report(outcome: &ScanOutcome, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, outcome.pdf_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pdf_content_type_detection() {
        assert!(is_pdf_content_type("application/pdf"));
        assert!(is_pdf_content_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_content_type("application/json"));
        assert!(!is_pdf_content_type("application/pdfx"));
    }

    #[tokio::test]
    async fn test_blank_model_url_rejected_before_request() {
        let store = crate::storage::Store::memory();
        let api = ApiClient::new("http://127.0.0.1:9", Some(1), store.clone()).unwrap();
        let scans = ScanService::new(api, Preferences::new(store));

        let request = ScanRequest {
            model_url: "   ".to_string(),
            attack_type: crate::models::AttackType::Score,
            cnn_type: crate::models::CnnType::ResNet,
            target_class: 0,
        };
        let err = scans.execute(&request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_save_report_writes_pdf_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("security_report.pdf");

        let outcome = ScanOutcome::Report {
            pdf: b"%PDF-1.4".to_vec(),
            adv_image: None,
        };
        save_report(&outcome, &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4");
    }
}
