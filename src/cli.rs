use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::{AttackType, CnnType, REPORT_FILE_NAME};

#[derive(Parser)]
#[command(name = "protego")]
#[command(version, about = "Terminal dashboard for the Protego AI vulnerability scanner")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend origin, overrides PROTEGO_BASE_URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Request timeout in seconds, overrides PROTEGO_TIMEOUT_SECS
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Storage file, overrides PROTEGO_STORAGE_PATH
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        role: Option<String>,
    },

    Logout,

    Status,

    Scan {
        /// URL of the model under test
        #[arg(short, long)]
        model: String,

        /// score or boundary
        #[arg(short, long)]
        attack: AttackType,

        /// ResNet, EfficientNet or MobileNet
        #[arg(short, long)]
        cnn: CnnType,

        #[arg(short, long, default_value = REPORT_FILE_NAME)]
        output: PathBuf,
    },

    Report,

    Reports {
        #[arg(short, long)]
        summary: bool,
    },

    Email {
        address: String,
    },

    History,

    Image {
        #[arg(short, long, default_value = "adversarial.png")]
        output: PathBuf,
    },

    Sidebar {
        #[arg(value_enum)]
        action: Option<SidebarAction>,
    },

    Export {
        #[arg(short, long, default_value = "html")]
        format: String,

        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SidebarAction {
    Toggle,
    Collapse,
    Expand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_arguments_parse_into_enums() {
        let cli = Cli::try_parse_from([
            "protego", "scan", "--model", "http://x/model", "--attack", "score", "--cnn", "ResNet",
        ])
        .unwrap();

        match cli.command {
            Commands::Scan {
                model,
                attack,
                cnn,
                output,
            } => {
                assert_eq!(model, "http://x/model");
                assert_eq!(attack, AttackType::Score);
                assert_eq!(cnn, CnnType::ResNet);
                assert_eq!(output, PathBuf::from("security_report.pdf"));
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_unknown_attack_rejected_before_submission() {
        let result = Cli::try_parse_from([
            "protego", "scan", "--model", "http://x/model", "--attack", "gradient", "--cnn",
            "ResNet",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "protego", "scan", "--model", "http://x/model", "--attack", "score", "--cnn", "VGG",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "protego",
            "status",
            "--url",
            "http://scanner:8000",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("http://scanner:8000"));
        assert_eq!(cli.timeout, Some(5));
    }
}
