use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use protego::cli::{Cli, Commands, SidebarAction};
use protego::models::ScanRequest;
use protego::services::save_report;
use protego::{App, Config, ConsoleReporter, HtmlExporter, JsonExporter, Route, RouteDecision};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_env()
        .context("Invalid PROTEGO_* environment configuration")?
        .with_overrides(cli.url, cli.timeout, cli.storage);

    let app = App::new(&config)?;
    app.session.init();

    let result = run(&app, cli.command).await;
    app.session.dispose();
    result
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "protego=debug" } else { "protego=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(app: &App, command: Commands) -> Result<()> {
    let reporter = ConsoleReporter::new();

    match command {
        Commands::Login { username, password } => {
            app.auth.login(&username, &password).await?;
            println!("{} Logged in as {}", "✓".green().bold(), username.bold());
        }

        Commands::Register {
            username,
            password,
            role,
        } => {
            let response = app
                .auth
                .register(&username, &password, role.as_deref())
                .await?;
            let msg = response
                .msg
                .unwrap_or_else(|| "User registered successfully".to_string());
            println!("{} {}", "✓".green().bold(), msg);
            println!("Run `protego login -u {} -p ...` to sign in", username);
        }

        Commands::Logout => {
            let outcome = app.auth.logout().await;
            if outcome.notified {
                println!("{} {}", "✓".green().bold(), outcome.message);
            } else {
                println!("{} {}", "!".yellow().bold(), outcome.message);
            }
        }

        Commands::Status => {
            let credential = app.session.credential();
            reporter.print_session(app.session.state(), credential.as_ref());
            println!("  backend: {}", app.api.base_url());
        }

        Commands::Scan {
            model,
            attack,
            cnn,
            output,
        } => {
            require(app, Route::GetStarted).await?;
            let request = ScanRequest::new(&model, attack, cnn)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .context("Invalid progress template")?,
            );
            spinner.set_message(format!("{} attack on {} model", attack.label(), cnn.label()));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let outcome = app.scans.execute(&request).await;
            spinner.finish_and_clear();

            let outcome = outcome?;
            save_report(&outcome, &output)
                .with_context(|| format!("Failed to save {}", output.display()))?;
            reporter.print_scan_outcome(&outcome, &output);
        }

        Commands::Report => {
            require(app, Route::Report).await?;
            let report = app.reports.get_report().await?;
            reporter.print_report(&report);
        }

        Commands::Reports { summary } => {
            require(app, Route::Dashboard).await?;
            let reports = app.reports.get_all_reports().await?;
            reporter.print_history(&reports);
            if summary {
                reporter.print_summary(&reports);
            }
        }

        Commands::Email { address } => {
            require(app, Route::Report).await?;
            let msg = app.reports.email_report(&address).await?;
            println!("{} {}", "✓".green().bold(), msg);
        }

        Commands::History => {
            require(app, Route::Dashboard).await?;
            let scans = app.scans.previous_scans().await?;
            println!("{}", serde_json::to_string_pretty(&scans)?);
        }

        Commands::Image { output } => {
            require(app, Route::Dashboard).await?;
            let Some(bytes) = app.prefs.adversarial_image_bytes()? else {
                bail!("No adversarial image cached. Run a scan first.");
            };
            fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{} adversarial image written to {}",
                "✓".green().bold(),
                output.display()
            );
        }

        Commands::Sidebar { action } => {
            let collapsed = match action {
                Some(SidebarAction::Toggle) => app.prefs.toggle_sidebar()?,
                Some(SidebarAction::Collapse) => {
                    app.prefs.set_sidebar_collapsed(true)?;
                    true
                }
                Some(SidebarAction::Expand) => {
                    app.prefs.set_sidebar_collapsed(false)?;
                    false
                }
                None => app.prefs.sidebar_collapsed()?,
            };
            println!("sidebar: {}", if collapsed { "collapsed" } else { "expanded" });
        }

        Commands::Export { format, output } => {
            require(app, Route::Dashboard).await?;
            let reports = app.reports.get_all_reports().await?;

            match format.as_str() {
                "json" => {
                    let path = output.unwrap_or_else(|| "reports.json".to_string());
                    JsonExporter::export(&reports, &path)?;
                    println!(
                        "{} exported {} reports to {}",
                        "✓".green().bold(),
                        reports.len(),
                        path
                    );
                }
                "html" => {
                    let path = output.unwrap_or_else(|| "reports.html".to_string());
                    HtmlExporter::export(&reports, &path)?;
                    println!(
                        "{} exported {} reports to {}",
                        "✓".green().bold(),
                        reports.len(),
                        path
                    );
                }
                other => bail!("Unsupported format: '{}'. Supported: json, html", other),
            }
        }
    }

    Ok(())
}

async fn require(app: &App, route: Route) -> Result<()> {
    match app.guard.wait(route).await {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Redirect { target, .. } => bail!(
            "Not logged in or session expired ({} requires login, redirecting to {}). Run `protego login` first.",
            route,
            target
        ),
        RouteDecision::Pending => bail!("Session check did not finish"),
    }
}

