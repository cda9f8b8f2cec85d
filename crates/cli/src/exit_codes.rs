//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | payload          | Payload file read/parse codes            |
//! | 10-19   | service          | Upload validation and service codes      |
//! | 20-29   | export           | Local export / file save codes           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use reconview_client::ClientError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Payload (3-9)
// =============================================================================

/// Payload or output file could not be read or written.
pub const EXIT_PAYLOAD_IO: u8 = 3;

/// Payload file is not a valid reconciliation result.
pub const EXIT_PAYLOAD_PARSE: u8 = 4;

// =============================================================================
// Service (10-19)
// =============================================================================

/// Local file validation failed (not CSV, over 10MB, missing side).
/// No request was sent.
pub const EXIT_UPLOAD_INVALID: u8 = 10;

/// Service unreachable (connection refused, DNS, timeout).
pub const EXIT_SERVICE_UNREACHABLE: u8 = 11;

/// Service rejected the upload (non-success status).
pub const EXIT_SERVICE_REJECTED: u8 = 12;

/// Service answered with a body that is not a reconciliation result.
pub const EXIT_SERVICE_RESPONSE: u8 = 13;

// =============================================================================
// Export (20-29)
// =============================================================================

/// Local export failed (CSV or archive writing).
pub const EXIT_EXPORT_FAILED: u8 = 20;

/// Export file could not be saved to the output directory.
pub const EXIT_EXPORT_SAVE: u8 = 21;

/// Map a service client error to its exit code.
pub fn client_exit_code(err: &ClientError) -> u8 {
    match err {
        ClientError::Validation(_) => EXIT_UPLOAD_INVALID,
        ClientError::Network(_) => EXIT_SERVICE_UNREACHABLE,
        ClientError::Service { .. } | ClientError::Http { .. } => EXIT_SERVICE_REJECTED,
        ClientError::Parse(_) => EXIT_SERVICE_RESPONSE,
        ClientError::Setup(_) => EXIT_ERROR,
    }
}
