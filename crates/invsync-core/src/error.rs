// ── Core error types ──
//
// Errors surfaced by the synchronization engine. Backend transport details
// are folded into fetch-level variants by the `From<invsync_api::Error>`
// impl; persistence failures keep the underlying SQLite error.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fetch errors ─────────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out")]
    Timeout,

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Conversion errors ────────────────────────────────────────────
    #[error("Cannot convert {kind} '{name}': {reason}")]
    Conversion {
        kind: &'static str,
        name: String,
        reason: String,
    },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Watch / lifecycle errors ─────────────────────────────────────
    #[error("Cannot start watch for data source {source_name}: {reason}")]
    WatchFailed { source_name: String, reason: String },

    #[error("Data source {source_name} used before initialization")]
    NotInitialized { source_name: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Async event channel closed")]
    ChannelClosed,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn conversion(
        kind: &'static str,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<invsync_api::Error> for CoreError {
    fn from(err: invsync_api::Error) -> Self {
        match err {
            invsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            invsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            invsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            invsync_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            invsync_api::Error::EmptyResponse { endpoint } => CoreError::Api {
                message: format!("empty response from {endpoint}"),
                status: Some(200),
            },
            invsync_api::Error::Gone { message } => CoreError::Api {
                message,
                status: Some(410),
            },
            invsync_api::Error::WatchStatus { code, message } => CoreError::Api {
                message,
                status: Some(code),
            },
            invsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
