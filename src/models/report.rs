use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub created_at: String,
    pub user_id: i64,
    pub scan_url: String,
    pub attack_type: String,
    pub cnn_model: String,
    pub target_class: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub execution_time: String,
    pub iterations: i64,
    #[serde(deserialize_with = "string_or_list")]
    pub mitigations: Vec<String>,
}

impl Report {
    pub fn created_at_time(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    /// Execution time in seconds, read from the leading number of the
    /// stored value ("12.5", "12.5s", "12.5 seconds").
    pub fn execution_seconds(&self) -> Option<f64> {
        let raw = self.execution_time.trim();
        let end = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        raw[..end].parse().ok()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::String(s)) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_scans: usize,
    pub by_attack: BTreeMap<String, usize>,
    pub by_model: BTreeMap<String, usize>,
    pub total_iterations: i64,
    pub avg_iterations: f64,
    pub avg_execution_secs: Option<f64>,
    pub latest_scan: Option<String>,
}

impl ReportSummary {
    pub fn from_reports(reports: &[Report]) -> Self {
        let mut summary = Self {
            total_scans: reports.len(),
            ..Self::default()
        };

        let mut timed = Vec::new();
        for report in reports {
            *summary
                .by_attack
                .entry(report.attack_type.clone())
                .or_default() += 1;
            *summary.by_model.entry(report.cnn_model.clone()).or_default() += 1;
            summary.total_iterations += report.iterations;
            if let Some(secs) = report.execution_seconds() {
                timed.push(secs);
            }
        }

        if !reports.is_empty() {
            summary.avg_iterations = summary.total_iterations as f64 / reports.len() as f64;
        }
        if !timed.is_empty() {
            summary.avg_execution_secs = Some(timed.iter().sum::<f64>() / timed.len() as f64);
        }

        summary.latest_scan = reports
            .iter()
            .max_by_key(|r| r.created_at_time())
            .map(|r| r.created_at.clone());

        summary
    }
}
