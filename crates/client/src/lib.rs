//! Reconciliation service client, shared by the CLI commands and the viewer.
//!
//! Owns the wire contract with the service: the two-file upload, the
//! per-category CSV export, and the all-categories archive export.
//! Blocking, no retries.

mod client;
mod upload;

pub use client::{ClientError, ReconClient, DEFAULT_TIMEOUT, GENERIC_UPLOAD_ERROR};
pub use upload::{UploadFile, UploadPair, ValidationError, MAX_UPLOAD_BYTES};
