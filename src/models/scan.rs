use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const REPORT_FILE_NAME: &str = "security_report.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
    Score,
    Boundary,
}

impl AttackType {
    pub const ALL: [AttackType; 2] = [AttackType::Score, AttackType::Boundary];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::Score => "score",
            AttackType::Boundary => "boundary",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttackType::Score => "Score Based Attack",
            AttackType::Boundary => "Boundary Based Attack",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("Invalid attack type: '{}'. Supported: score, boundary", s)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CnnType {
    ResNet,
    EfficientNet,
    MobileNet,
}

impl CnnType {
    pub const ALL: [CnnType; 3] = [CnnType::ResNet, CnnType::EfficientNet, CnnType::MobileNet];

    pub fn as_str(&self) -> &'static str {
        match self {
            CnnType::ResNet => "ResNet",
            CnnType::EfficientNet => "EfficientNet",
            CnnType::MobileNet => "MobileNet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CnnType::ResNet => "ResNet-50",
            CnnType::EfficientNet => "EfficientNet",
            CnnType::MobileNet => "MobileNet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for CnnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CnnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "Invalid CNN type: '{}'. Supported: ResNet, EfficientNet, MobileNet",
                s
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub model_url: String,
    pub attack_type: AttackType,
    pub cnn_type: CnnType,
    pub target_class: u32,
}

impl ScanRequest {
    pub fn new(model_url: &str, attack_type: AttackType, cnn_type: CnnType) -> Result<Self> {
        let request = Self {
            model_url: model_url.trim().to_string(),
            attack_type,
            cnn_type,
            target_class: 0,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_url.trim().is_empty() {
            return Err(Error::validation("Model URL is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Pdf(Vec<u8>),
    Report {
        pdf: Vec<u8>,
        adv_image: Option<String>,
    },
}

impl ScanOutcome {
    pub fn pdf_bytes(&self) -> &[u8] {
        match self {
            ScanOutcome::Pdf(bytes) => bytes,
            ScanOutcome::Report { pdf, .. } => pdf,
        }
    }

    pub fn adversarial_image(&self) -> Option<&str> {
        match self {
            ScanOutcome::Pdf(_) => None,
            ScanOutcome::Report { adv_image, .. } => adv_image.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanPayload {
    #[serde(default)]
    pub pdf_report: Option<String>,
    #[serde(default)]
    pub adv_image: Option<String>,
}

impl ScanPayload {
    pub fn into_outcome(self) -> Result<ScanOutcome> {
        let encoded = self
            .pdf_report
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::malformed("Invalid response from the server."))?;

        let pdf = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::malformed(format!("pdf_report is not base64: {}", e)))?;

        let adv_image = self.adv_image.filter(|s| !s.trim().is_empty());

        Ok(ScanOutcome::Report { pdf, adv_image })
    }
}
