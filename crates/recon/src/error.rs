use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Reconciliation payload is not valid JSON or does not match the contract.
    #[error("payload parse error: {0}")]
    PayloadParse(String),
    /// Category tag outside `matched` / `internal_only` / `provider_only`.
    #[error("unknown category: \"{0}\" (expected matched, internal_only, or provider_only)")]
    UnknownCategory(String),
    /// Accent name outside the supported palette.
    #[error("unknown accent: \"{0}\" (expected green, yellow, or red)")]
    UnknownAccent(String),
}

/// Failure of a single export path.
///
/// Remote variants are recoverable: callers follow them with the local path.
/// `Csv`, `Archive` and `Io` come from the local path or the sink and are
/// reported to the caller.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no session id, remote export unavailable")]
    MissingSession,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("CSV write error: {0}")]
    Csv(String),
    #[error("archive write error: {0}")]
    Archive(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("an export is already in progress")]
    InFlight,
}

impl ExportError {
    /// True for failures of the remote path, which the local export recovers.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::MissingSession | Self::Network(_) | Self::Http { .. })
    }
}
