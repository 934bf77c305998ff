use thiserror::Error;

/// Top-level error type for the `invsync-api` crate.
///
/// Covers every failure mode of the hub list/watch client and the
/// hardware-plugin inventory client. `invsync-core` maps these into
/// fetch-level failures for the owning data source.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status from a backend.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered 200 with no payload.
    #[error("Empty response from {endpoint}")]
    EmptyResponse { endpoint: String },

    // ── Watch ───────────────────────────────────────────────────────
    /// The requested resource version is no longer available; a relist is required.
    #[error("Resource version expired: {message}")]
    Gone { message: String },

    /// The watch stream delivered an `ERROR` event.
    #[error("Watch error (code {code}): {message}")]
    WatchStatus { code: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the watch must restart from a fresh list.
    pub fn is_gone(&self) -> bool {
        match self {
            Self::Gone { .. } => true,
            Self::Api { status, .. } | Self::WatchStatus { code: status, .. } => *status == 410,
            _ => false,
        }
    }
}
