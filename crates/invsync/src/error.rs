//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use invsync_config::ConfigError;
use invsync_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const DATABASE: i32 = 4;
    pub const CONNECTION: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration value for {field}: {reason}")]
    #[diagnostic(
        code(invsync::validation),
        help(
            "Set it in the config file ({path}) or through an INVSYNC_ environment variable.\n\
             Run: invsync config show"
        )
    )]
    Validation {
        field: String,
        reason: String,
        path: String,
    },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(code(invsync::config))]
    Config { message: String },

    // ── Backends ─────────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(invsync::connection_failed),
        help("Check the hub URL, the CA certificate and the bearer token.\n{reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Could not start watching for {source_name}")]
    #[diagnostic(
        code(invsync::watch_failed),
        help("Disable the watch under [watch] or fix hub access.\n{reason}")
    )]
    WatchFailed { source_name: String, reason: String },

    // ── Store ────────────────────────────────────────────────────────
    #[error("Database error at {path}")]
    #[diagnostic(
        code(invsync::database),
        help("Check that the path is writable and not used by another process.")
    )]
    Database {
        path: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    #[diagnostic(code(invsync::core))]
    Core(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config { .. } => exit_code::CONFIG,
            Self::ConnectionFailed { .. } | Self::WatchFailed { .. } => exit_code::CONNECTION,
            Self::Database { .. } => exit_code::DATABASE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attaches the config file path to validation failures.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation {
                field,
                reason,
                path: path.display().to_string(),
            },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::WatchFailed {
                source_name,
                reason,
            } => Self::WatchFailed {
                source_name,
                reason,
            },
            CoreError::Config { message } => Self::Config { message },
            other => Self::Core(other),
        }
    }
}
