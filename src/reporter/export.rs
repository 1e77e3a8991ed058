use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use tera::{Context as TeraContext, Tera};

use crate::models::{Report, ReportSummary};

pub struct JsonExporter;

impl JsonExporter {
    pub fn export(reports: &[Report], path: &str) -> Result<()> {
        let output = ExportData {
            exported_at: Utc::now().to_rfc3339(),
            summary: ReportSummary::from_reports(reports),
            reports: reports.to_vec(),
        };

        let json = serde_json::to_string_pretty(&output)?;
        fs::write(path, json).with_context(|| format!("Failed to write to {}", path))?;
        Ok(())
    }

    pub fn load(path: &str) -> Result<Vec<Report>> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;

        let data: ExportData = serde_json::from_str(&content)?;
        Ok(data.reports)
    }
}

pub struct HtmlExporter;

impl HtmlExporter {
    pub fn render(reports: &[Report]) -> Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_template("report", TEMPLATE)?;

        let summary = ReportSummary::from_reports(reports);

        let mut context = TeraContext::new();
        context.insert(
            "generated",
            &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        context.insert("total_scans", &summary.total_scans);
        context.insert("by_attack", &summary.by_attack);
        context.insert("by_model", &summary.by_model);
        context.insert("avg_iterations", &format!("{:.1}", summary.avg_iterations));
        context.insert(
            "avg_execution",
            &summary
                .avg_execution_secs
                .map(|s| format!("{:.2}s", s))
                .unwrap_or_else(|| "-".to_string()),
        );

        let rows: Vec<HtmlRow> = reports
            .iter()
            .map(|r| HtmlRow {
                created_at: r.created_at.clone(),
                scan_url: r.scan_url.clone(),
                cnn_model: r.cnn_model.clone(),
                attack_type: r.attack_type.clone(),
                target_class: r.target_class,
                iterations: r.iterations,
                execution_time: r.execution_time.clone(),
                mitigations: r.mitigations.clone(),
            })
            .collect();
        context.insert("rows", &rows);

        Ok(tera.render("report", &context)?)
    }

    pub fn export(reports: &[Report], path: &str) -> Result<()> {
        let html = Self::render(reports)?;
        fs::write(path, html).with_context(|| format!("Failed to write to {}", path))?;
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ExportData {
    exported_at: String,
    reports: Vec<Report>,
    summary: ReportSummary,
}

#[derive(serde::Serialize)]
struct HtmlRow {
    created_at: String,
    scan_url: String,
    cnn_model: String,
    attack_type: String,
    target_class: i64,
    iterations: i64,
    execution_time: String,
    mitigations: Vec<String>,
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Protego Scan Reports</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #0d1117; color: #c9d1d9; line-height: 1.6; }
        .container { max-width: 1200px; margin: 0 auto; padding: 2rem; }
        h1 { color: #58a6ff; margin-bottom: 0.5rem; }
        h2 { margin: 2rem 0 1rem; }
        .subtitle { color: #8b949e; margin-bottom: 2rem; }
        .summary { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 1rem; margin-bottom: 2rem; }
        .stat { background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; text-align: center; }
        .stat-value { font-size: 2rem; font-weight: bold; color: #58a6ff; }
        .stat-label { color: #8b949e; font-size: 0.875rem; }
        table { width: 100%; border-collapse: collapse; background: #161b22; border: 1px solid #30363d; border-radius: 6px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; text-align: left; border-bottom: 1px solid #30363d; vertical-align: top; }
        th { background: #21262d; font-weight: 600; }
        tr:hover { background: #21262d; }
        .mitigations { font-size: 0.875rem; color: #8b949e; margin-top: 0.5rem; padding-left: 1.25rem; }
        .url { color: #8b949e; font-size: 0.875rem; word-break: break-all; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Protego Scan Reports</h1>
        <p class="subtitle">Generated: {{ generated }}</p>

        <div class="summary">
            <div class="stat">
                <div class="stat-value">{{ total_scans }}</div>
                <div class="stat-label">Scans</div>
            </div>
            {% for attack, count in by_attack %}
            <div class="stat">
                <div class="stat-value">{{ count }}</div>
                <div class="stat-label">{{ attack | escape }}</div>
            </div>
            {% endfor %}
            {% for model, count in by_model %}
            <div class="stat">
                <div class="stat-value">{{ count }}</div>
                <div class="stat-label">{{ model | escape }}</div>
            </div>
            {% endfor %}
            <div class="stat">
                <div class="stat-value">{{ avg_iterations }}</div>
                <div class="stat-label">Avg iterations</div>
            </div>
            <div class="stat">
                <div class="stat-value">{{ avg_execution }}</div>
                <div class="stat-label">Avg execution</div>
            </div>
        </div>

        <h2>Previous Scans</h2>
        <table>
            <thead>
                <tr>
                    <th>Date</th>
                    <th>Model</th>
                    <th>Attack</th>
                    <th>Class</th>
                    <th>Iterations</th>
                    <th>Time</th>
                </tr>
            </thead>
            <tbody>
                {% for row in rows %}
                <tr>
                    <td>{{ row.created_at | escape }}</td>
                    <td>
                        {{ row.cnn_model | escape }}
                        <div class="url">{{ row.scan_url | escape }}</div>
                        {% if row.mitigations %}
                        <ol class="mitigations">
                            {% for step in row.mitigations %}
                            <li>{{ step | escape }}</li>
                            {% endfor %}
                        </ol>
                        {% endif %}
                    </td>
                    <td>{{ row.attack_type | escape }}</td>
                    <td>{{ row.target_class }}</td>
                    <td>{{ row.iterations }}</td>
                    <td>{{ row.execution_time | escape }}</td>
                </tr>
                {% endfor %}
                {% if not rows %}
                <tr><td colspan="6">No previous scans</td></tr>
                {% endif %}
            </tbody>
        </table>
    </div>
</body>
</html>"#;
