use httpmock::prelude::*;
use reconview_client::{ClientError, ReconClient, UploadFile, UploadPair, GENERIC_UPLOAD_ERROR};
use reconview_recon::export::RemoteExporter;
use reconview_recon::{Category, ExportError};

fn pair() -> UploadPair {
    UploadPair::new(
        Some(UploadFile::from_bytes("internal.csv", b"ref,amount\nTXN-1,10\n".to_vec()).unwrap()),
        Some(UploadFile::from_bytes("provider.csv", b"reference,value\nTXN-1,10\n".to_vec()).unwrap()),
    )
    .unwrap()
}

fn client(server: &MockServer) -> ReconClient {
    ReconClient::with_base_url(server.base_url()).unwrap()
}

// ── Upload ──────────────────────────────────────────────────────────

#[test]
fn upload_returns_payload() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/upload_and_reconcile")
            .body_includes("name=\"internal_file\"")
            .body_includes("name=\"provider_file\"");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({
                "matched": [{"ref": "TXN-1", "amount": 10, "anomaly": false}],
                "internal_only": [],
                "provider_only": [],
                "summary": {"matched": 1, "internal_only": 0, "provider_only": 0},
                "column_mappings": {"internal": {"transaction_reference": "ref"}, "provider": {}},
                "session_id": "abc-123"
            }));
    });

    let payload = client(&server).upload_and_reconcile(&pair()).unwrap();
    mock.assert();
    assert_eq!(payload.matched.len(), 1);
    assert_eq!(payload.session(), Some("abc-123"));
    assert_eq!(payload.summary.unwrap().matched, 1);
}

#[test]
fn upload_error_message_is_verbatim() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/upload_and_reconcile");
        then.status(400)
            .json_body(serde_json::json!({ "error": "Error reading CSV files: bad header" }));
    });

    let err = client(&server).upload_and_reconcile(&pair()).unwrap_err();
    assert!(matches!(err, ClientError::Service { status: 400, .. }));
    assert_eq!(err.user_message(), "Error reading CSV files: bad header");
}

#[test]
fn upload_error_without_message_is_generic() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/upload_and_reconcile");
        then.status(500).body("Internal Server Error");
    });

    let err = client(&server).upload_and_reconcile(&pair()).unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), GENERIC_UPLOAD_ERROR);
}

#[test]
fn upload_unreachable_is_generic() {
    // Nothing listens on the discard port.
    let client = ReconClient::with_base_url("http://127.0.0.1:9").unwrap();
    let err = client.upload_and_reconcile(&pair()).unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert_eq!(err.user_message(), GENERIC_UPLOAD_ERROR);
}

// ── Export ──────────────────────────────────────────────────────────

#[test]
fn export_csv_sends_category_and_session() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/export_csv")
            .query_param("category", "internal_only")
            .query_param("session_id", "abc-123");
        then.status(200)
            .header("content-type", "text/csv")
            .body("ref,amount\r\nTXN-9,5\r\n");
    });

    let bytes = client(&server).fetch_csv(Category::InternalOnly, "abc-123").unwrap();
    mock.assert();
    assert_eq!(bytes, b"ref,amount\r\nTXN-9,5\r\n");
}

#[test]
fn export_failure_maps_to_remote_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/export_csv");
        then.status(400).json_body(serde_json::json!({
            "error": "No reconciliation data found. Please perform reconciliation first."
        }));
    });

    let err = client(&server).fetch_csv(Category::Matched, "stale").unwrap_err();
    assert!(err.is_remote());
    assert!(matches!(err, ExportError::Http { status: 400, .. }));
}

#[test]
fn export_all_returns_archive_bytes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/export_all").query_param("session_id", "abc-123");
        then.status(200)
            .header("content-type", "application/zip")
            .body(b"PK\x03\x04fake".to_vec());
    });

    let bytes = client(&server).fetch_archive("abc-123").unwrap();
    mock.assert();
    assert!(bytes.starts_with(b"PK"));
}
