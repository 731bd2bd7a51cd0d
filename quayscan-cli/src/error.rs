//! CLI-specific error types and exit code mapping

use quayscan_core::error::QuayscanError;
use quayscan_scanner::VulnScannerError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Image list file could not be loaded.
    #[error("input error: {0}")]
    Input(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from quayscan-core.
    #[error("{0}")]
    Core(#[from] QuayscanError),

    /// The scan completed and reported vulnerabilities (`--fail-on-vulns`).
    #[error("scan error: {0}")]
    Scan(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                    |
    /// |------|--------------------------------------------|
    /// | 0    | Success                                    |
    /// | 1    | General / command / input error            |
    /// | 2    | Configuration error                        |
    /// | 4    | Vulnerabilities found (`--fail-on-vulns`)  |
    /// | 10   | IO error                                   |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(QuayscanError::Config(_)) => 2,
            Self::Scan(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Input(_) | Self::Core(_) => 1,
        }
    }
}

impl From<VulnScannerError> for CliError {
    fn from(e: VulnScannerError) -> Self {
        match e {
            VulnScannerError::Config { .. } => Self::Config(e.to_string()),
            VulnScannerError::ClientInit(_) => Self::Command(e.to_string()),
        }
    }
}
