use colored::Colorize;
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::models::{Report, ReportSummary, ScanOutcome};
use crate::session::{Credential, SessionState};

pub struct ConsoleReporter;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Attack")]
    attack: String,
    #[tabled(rename = "Class")]
    target_class: i64,
    #[tabled(rename = "Iterations")]
    iterations: i64,
    #[tabled(rename = "Time")]
    execution_time: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn print_report(&self, report: &Report) {
        println!("\n{}", "TESTING AI MODEL".bold().underline());
        println!("Model - {}", report.cnn_model.white().bold());
        println!("Attack - {}", report.attack_type.white().bold());
        println!("Target class - {}", report.target_class);
        println!("Iterations - {}", report.iterations);
        println!("Execution time - {}", Self::format_time(report));
        println!("Scanned URL - {}", report.scan_url.cyan());
        if !report.created_at.is_empty() {
            println!("Created - {}", Self::format_date(report));
        }

        println!("\n{}", "Mitigation Steps:".bold());
        if report.mitigations.is_empty() {
            println!("  {}", "none reported".dimmed());
        }
        for (i, step) in report.mitigations.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        println!();
    }

    pub fn print_history(&self, reports: &[Report]) {
        if reports.is_empty() {
            println!("\n{}", "No previous scans".yellow());
            return;
        }

        let rows: Vec<HistoryRow> = reports
            .iter()
            .map(|r| HistoryRow {
                date: Self::format_date(r),
                model: r.cnn_model.clone(),
                attack: r.attack_type.clone(),
                target_class: r.target_class,
                iterations: r.iterations,
                execution_time: Self::format_time(r),
                url: r.scan_url.clone(),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();

        println!("\n{}", table);
    }

    pub fn print_summary(&self, reports: &[Report]) {
        let summary = ReportSummary::from_reports(reports);

        println!("\n{}", "Summary".bold().underline());
        println!("{} scans", summary.total_scans.to_string().bold());

        for (attack, count) in &summary.by_attack {
            println!("  {}: {}", attack.yellow(), count);
        }
        for (model, count) in &summary.by_model {
            println!("  {}: {}", model.cyan(), count);
        }

        if summary.total_scans > 0 {
            println!("  Avg iterations: {:.1}", summary.avg_iterations);
        }
        if let Some(secs) = summary.avg_execution_secs {
            println!("  Avg execution: {:.2}s", secs);
        }
        if let Some(latest) = &summary.latest_scan {
            println!("  Latest scan: {}", latest);
        }
        println!();
    }

    pub fn print_scan_outcome(&self, outcome: &ScanOutcome, saved_to: &Path) {
        println!(
            "{} report saved to {} ({} bytes)",
            "✓".green().bold(),
            saved_to.display().to_string().white().bold(),
            outcome.pdf_bytes().len()
        );
        match outcome {
            ScanOutcome::Pdf(_) => {}
            ScanOutcome::Report { adv_image: Some(_), .. } => {
                println!("  adversarial image cached, view it with `protego image`");
            }
            ScanOutcome::Report { adv_image: None, .. } => {
                println!("  {}", "no adversarial image returned".dimmed());
            }
        }
    }

    pub fn print_session(&self, state: SessionState, credential: Option<&Credential>) {
        if state.loading {
            println!("{}", "Loading...".dimmed());
            return;
        }

        if !state.authenticated {
            println!("{}", "Not logged in".yellow());
            return;
        }

        println!("{}", "Logged in".green().bold());
        if let Some(credential) = credential {
            if let Some(sub) = credential.subject() {
                println!("  user id: {}", sub);
            }
            if let Some(expiry) = credential.expires_at() {
                println!("  expires: {}", expiry.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
    }

    fn format_date(report: &Report) -> String {
        report
            .created_at_time()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| report.created_at.clone())
    }

    fn format_time(report: &Report) -> String {
        match report.execution_seconds() {
            Some(secs) => format!("{:.2}s", secs),
            None if report.execution_time.is_empty() => "-".to_string(),
            None => report.execution_time.clone(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
