//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// quayscan -- look up known vulnerabilities of images hosted on Quay.
///
/// Use `quayscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "quayscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to the quayscan.toml configuration file (defaults are used if missing).
    #[arg(short, long, default_value = "quayscan.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report with a vulnerability table.
    Text,
    /// Machine-readable JSON keyed by image reference.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan one or more images for vulnerabilities.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Scan images given on the command line or listed in a file.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["image", "file"])))]
pub struct ScanArgs {
    /// Single image reference, e.g. quay.io/coreos/etcd:v3.5.0
    #[arg(short, long)]
    pub image: Option<String>,

    /// JSON or YAML file with an `images` list.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Number of concurrent workers (overrides [scan].workers).
    #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub workers: Option<usize>,

    /// Quay API token (overrides QUAY_TOKEN and [quay].token).
    #[arg(long)]
    pub token: Option<String>,

    /// Exit with code 4 when any vulnerability is reported.
    #[arg(long)]
    pub fail_on_vulns: bool,
}

// ---- config ----

/// Manage quayscan configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, quay, scan).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_scan_image() {
        let cli = Cli::try_parse_from(["quayscan", "scan", "--image", "quay.io/org/app:v1"])
            .expect("should parse scan --image");
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.image.as_deref(), Some("quay.io/org/app:v1"));
                assert!(args.file.is_none());
                assert!(args.workers.is_none(), "workers should default to config");
                assert!(!args.fail_on_vulns);
            }
            _ => panic!("expected Scan command"),
        }
        assert_eq!(cli.config, PathBuf::from("quayscan.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn test_cli_parse_scan_file_with_options() {
        let cli = Cli::try_parse_from([
            "quayscan",
            "scan",
            "-f",
            "images.yaml",
            "-w",
            "8",
            "--token",
            "secret",
            "--fail-on-vulns",
        ])
        .expect("should parse scan with options");
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.file, Some(PathBuf::from("images.yaml")));
                assert_eq!(args.workers, Some(8));
                assert_eq!(args.token.as_deref(), Some("secret"));
                assert!(args.fail_on_vulns);
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn test_cli_scan_requires_input() {
        let result = Cli::try_parse_from(["quayscan", "scan"]);
        assert!(result.is_err(), "scan without --image or --file should fail");
    }

    #[test]
    fn test_cli_scan_image_and_file_conflict() {
        let result = Cli::try_parse_from([
            "quayscan",
            "scan",
            "--image",
            "quay.io/org/app:v1",
            "--file",
            "images.json",
        ]);
        assert!(result.is_err(), "--image and --file are mutually exclusive");
    }

    #[test]
    fn test_cli_scan_rejects_zero_workers() {
        let result =
            Cli::try_parse_from(["quayscan", "scan", "-i", "quay.io/org/app:v1", "-w", "0"]);
        assert!(result.is_err(), "zero workers should be rejected");
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "quayscan",
            "scan",
            "-i",
            "quay.io/org/app:v1",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_invalid_output_format() {
        let result = Cli::try_parse_from(["quayscan", "--output", "xml", "config", "validate"]);
        assert!(result.is_err(), "unknown output format should fail");
    }

    #[test]
    fn test_cli_parse_config_validate() {
        let cli = Cli::try_parse_from(["quayscan", "-c", "/etc/quayscan.toml", "config", "validate"])
            .expect("should parse config validate");
        assert_eq!(cli.config, PathBuf::from("/etc/quayscan.toml"));
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Validate,
            }) => {}
            _ => panic!("expected Config Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["quayscan", "config", "show", "--section", "quay"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("quay")),
            _ => panic!("expected Config Show command"),
        }
    }
}
