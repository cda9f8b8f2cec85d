//! Reconciliation service HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).

use std::time::Duration;

use reconview_recon::export::RemoteExporter;
use reconview_recon::{Category, ExportError, ReconError, ReconPayload};
use thiserror::Error;

use crate::upload::{UploadFile, UploadPair, ValidationError};

/// Shown when an upload fails without a service-provided message.
pub const GENERIC_UPLOAD_ERROR: &str = "Upload failed";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Reconciliation service client (blocking).
#[derive(Clone)]
pub struct ReconClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Could not build the HTTP client
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success status carrying a structured `error` field
    #[error("{message}")]
    Service { status: u16, message: String },
    /// Non-success status without a structured error
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Text to show the user for a failed upload: the service's own message
    /// verbatim when it sent one, the validation message for local rejects,
    /// and a generic message otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Service { message, .. } => message.clone(),
            ClientError::Validation(e) => e.to_string(),
            _ => GENERIC_UPLOAD_ERROR.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Service { status, .. } | ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ReconError> for ClientError {
    fn from(e: ReconError) -> Self {
        ClientError::Parse(e.to_string())
    }
}

impl From<ClientError> for ExportError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Service { status, message } => ExportError::Http { status, body: message },
            ClientError::Http { status, body } => ExportError::Http { status, body },
            ClientError::Network(detail) => ExportError::Network(detail),
            other => ExportError::Network(other.to_string()),
        }
    }
}

impl ReconClient {
    /// Client against `base_url` (e.g. `http://localhost:5000`) with the default timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("reconview/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload both files and return the categorized result.
    pub fn upload_and_reconcile(&self, pair: &UploadPair) -> Result<ReconPayload, ClientError> {
        let url = format!("{}/api/upload_and_reconcile", self.base_url);
        let form = reqwest::blocking::multipart::Form::new()
            .part("internal_file", csv_part(&pair.internal)?)
            .part("provider_file", csv_part(&pair.provider)?);

        log::info!(
            "uploading {} ({} bytes) and {} ({} bytes)",
            pair.internal.name(),
            pair.internal.len(),
            pair.provider.name(),
            pair.provider.len()
        );
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check(response)?;

        let body = response.text().map_err(|e| ClientError::Network(e.to_string()))?;
        let payload = ReconPayload::from_json(&body)?;
        log::debug!(
            "reconciled: {} matched, {} internal-only, {} provider-only",
            payload.matched.len(),
            payload.internal_only.len(),
            payload.provider_only.len()
        );
        Ok(payload)
    }

    /// CSV bytes for one category of a prior session.
    pub fn export_csv(&self, category: Category, session_id: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/api/export_csv", self.base_url);
        self.get_bytes(&url, &[("category", category.as_str()), ("session_id", session_id)])
    }

    /// Zip archive of every category of a prior session.
    pub fn export_all(&self, session_id: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}/api/export_all", self.base_url);
        self.get_bytes(&url, &[("session_id", session_id)])
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn get_bytes(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, ClientError> {
        log::debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check(response)?;
        let bytes = response.bytes().map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl RemoteExporter for ReconClient {
    fn fetch_csv(&self, category: Category, session_id: &str) -> Result<Vec<u8>, ExportError> {
        Ok(self.export_csv(category, session_id)?)
    }

    fn fetch_archive(&self, session_id: &str) -> Result<Vec<u8>, ExportError> {
        Ok(self.export_all(session_id)?)
    }
}

fn csv_part(file: &UploadFile) -> Result<reqwest::blocking::multipart::Part, ClientError> {
    reqwest::blocking::multipart::Part::bytes(file.bytes().to_vec())
        .file_name(file.name().to_string())
        .mime_str("text/csv")
        .map_err(|e| ClientError::Setup(e.to_string()))
}

/// Pass success responses through; turn anything else into an error,
/// preferring the structured `error` field of a JSON body.
fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let status = status.as_u16();
    let body = response.text().unwrap_or_default();
    Err(match service_message(&body) {
        Some(message) => ClientError::Service { status, message },
        None => ClientError::Http { status, body },
    })
}

fn service_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json["error"].as_str().filter(|s| !s.is_empty()).map(String::from)
}
