// Integration tests for the `reconview` binary.
// Run with: cargo test -p reconview-cli --test cli_tests -- --nocapture
//
// Manual smoke test (cannot be automated, requires a real TTY):
//   reconview view tests/fixtures/payload.json
//   Verify: tabs switch with 1-3, / filters live, q exits cleanly, terminal restored.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use tempfile::TempDir;

/// Command with settings isolated under `home` and no ambient overrides.
fn reconview(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reconview"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"))
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RECONVIEW_API_BASE")
        .env_remove("RUST_LOG");
    cmd
}

fn payload_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/payload.json")
}

fn payload_arg() -> String {
    payload_path().to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(output.status.success(), "exit code: {:?}\nstderr: {}", output.status, stderr(output));
}

// ---------------------------------------------------------------------------
// summary
// ---------------------------------------------------------------------------

#[test]
fn summary_prints_percentages_and_mappings() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["summary", &payload_arg()]).output().unwrap();
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.contains("(185 transactions)"), "{out}");
    assert!(out.contains("81.1% of total"));
    assert!(out.contains("13.5% of total"));
    assert!(out.contains("5.4% of total"));
    assert!(out.contains("Critical discrepancies"));
    assert!(out.contains("Ref No → transaction_reference"));
    assert!(out.contains("txn_status → status"));
}

#[test]
fn summary_json_contract() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["summary", &payload_arg(), "--json"]).output().unwrap();
    assert_success(&output);

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["total"], 185);
    assert_eq!(json["categories"][0]["category"], "matched");
    assert_eq!(json["categories"][0]["percent"], "81.1");
    assert_eq!(json["categories"][2]["percent"], "5.4");
    assert_eq!(json["quality"][0]["kind"], "anomalies");
    assert_eq!(json["quality"][0]["count"], 2);
    // Missing status_mismatches defaults to zero
    assert_eq!(json["quality"][3]["count"], 0);
}

#[test]
fn summary_absent_is_not_an_error() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("bare.json");
    std::fs::write(&path, r#"{"matched": [], "internal_only": [], "provider_only": []}"#).unwrap();

    let output = reconview(home.path()).args(["summary", path.to_str().unwrap()]).output().unwrap();
    assert_success(&output);
    assert!(stdout(&output).contains("Summary not available"));
}

// ---------------------------------------------------------------------------
// table
// ---------------------------------------------------------------------------

#[test]
fn table_search_sort_desc_json() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path())
        .args(["table", &payload_arg(), "-c", "matched", "--search", "COMPLETED", "--sort", "amount", "--desc", "--json"])
        .output()
        .unwrap();
    assert_success(&output);

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["state"], "rows");
    assert_eq!(json["title"], "Matched Transactions (5)");
    assert_eq!(json["search"], "COMPLETED");

    let rows = json["rows"].as_array().unwrap();
    let refs: Vec<&str> = rows.iter().map(|r| r["cells"][0].as_str().unwrap()).collect();
    // Null amount trails even when descending
    assert_eq!(refs, ["TXN-001", "TXN-002", "TXN-005"]);
    assert_eq!(rows[0]["highlight"], "high_risk_anomaly");
    assert_eq!(rows[2]["cells"][1], "-");

    let amount = json["headers"].as_array().unwrap().iter().find(|h| h["column"] == "amount").unwrap();
    assert_eq!(amount["sort"], "desc");
    // Single page: no pagination block
    assert!(json["pagination"].is_null());
}

#[test]
fn table_plain_shows_markers_and_booleans() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["table", &payload_arg(), "-c", "matched"]).output().unwrap();
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.starts_with("Matched Transactions (5)"));
    assert!(out.contains("TRANSACTION REFERENCE"));
    assert!(out.contains("[high_risk_anomaly]"));
    assert!(out.contains("[status_mismatch]"));
    assert!(out.contains('✓') && out.contains('✗'));
}

#[test]
fn table_empty_category_shows_placeholder() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["table", &payload_arg(), "-c", "provider_only"]).output().unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), "Provider Only Transactions (0)\nNo data available\n");
}

#[test]
fn table_unknown_sort_column_is_usage_error() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path())
        .args(["table", &payload_arg(), "-c", "internal_only", "--sort", "fee"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("unknown column"), "{err}");
    assert!(err.contains("transaction_reference"));
}

#[test]
fn table_unknown_category_rejected() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["table", &payload_arg(), "-c", "orphans"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// payload errors
// ---------------------------------------------------------------------------

#[test]
fn missing_payload_exit_code() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["summary", "no/such/file.json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).starts_with("error: failed to read"));
}

#[test]
fn malformed_payload_exit_code() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("broken.json");
    std::fs::write(&path, "{\"matched\": 12").unwrap();

    let output = reconview(home.path()).args(["summary", path.to_str().unwrap()]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("hint:"));
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

#[test]
fn export_local_writes_csv() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .args(["export", &payload_arg(), "-c", "matched", "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .unwrap();
    assert_success(&output);

    let saved = out_dir.join("matched_transactions.csv");
    assert_eq!(stdout(&output).trim(), saved.display().to_string());

    let csv = std::fs::read_to_string(&saved).unwrap();
    assert!(csv.starts_with(
        "transaction_reference,amount,status,anomaly,risk_level,amount_match,status_match\r\n"
    ));
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.contains("TXN-001"));
}

#[test]
fn export_empty_category_writes_nothing() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .args(["export", &payload_arg(), "-c", "provider_only", "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(stderr(&output).contains("nothing to export"));
    assert!(!out_dir.join("provider_only_transactions.csv").exists());
}

#[test]
fn export_remote_falls_back_when_unreachable() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .args([
            "export", &payload_arg(), "-c", "internal_only", "--remote",
            "--api-base", "http://127.0.0.1:9",
            "--out-dir", out_dir.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_success(&output);

    // Fallback is silent: the path on stdout, nothing on stderr
    assert_eq!(stderr(&output), "");
    let saved = out_dir.join("internal_only_transactions.csv");
    assert_eq!(stdout(&output).trim(), saved.display().to_string());

    let csv = std::fs::read_to_string(&saved).unwrap();
    assert!(csv.starts_with("transaction_reference,amount,status\r\n"));
    assert!(csv.contains("TXN-101"));
}

#[test]
fn export_all_remote_falls_back_silently() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .args([
            "export-all", &payload_arg(), "--remote",
            "--api-base", "http://127.0.0.1:9",
            "--out-dir", out_dir.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stderr(&output), "");

    let bytes = std::fs::read(out_dir.join("reconciliation_results.zip")).unwrap();
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}

#[test]
fn export_remote_saves_service_bytes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/export_csv")
            .query_param("category", "matched")
            .query_param("session_id", "b8e0b6f2-3d4c-4f7a-9a57-0c2d1e7f9a10");
        then.status(200).header("content-type", "text/csv").body("from,service\r\n1,2\r\n");
    });

    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .env("RECONVIEW_API_BASE", server.base_url())
        .args(["export", &payload_arg(), "-c", "matched", "--remote", "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .unwrap();
    assert_success(&output);
    mock.assert();

    let csv = std::fs::read_to_string(out_dir.join("matched_transactions.csv")).unwrap();
    assert_eq!(csv, "from,service\r\n1,2\r\n");
}

#[test]
fn export_all_local_writes_archive() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("exports");
    let output = reconview(home.path())
        .args(["export-all", &payload_arg(), "--out-dir", out_dir.to_str().unwrap()])
        .output()
        .unwrap();
    assert_success(&output);

    let bytes = std::fs::read(out_dir.join("reconciliation_results.zip")).unwrap();
    // Local zip header
    assert_eq!(&bytes[..4], b"PK\x03\x04");
}

#[test]
fn read_only_commands_leave_settings_alone() {
    let home = TempDir::new().unwrap();
    let payload = payload_arg();
    for args in [
        vec!["summary", payload.as_str()],
        vec!["table", payload.as_str(), "-c", "matched"],
        vec!["view", payload.as_str(), "--plain"],
    ] {
        let output = reconview(home.path()).args(&args).output().unwrap();
        assert_success(&output);
    }
    assert!(!home.path().join(".config/reconview").exists());
}

// dirs::config_dir honors XDG_CONFIG_HOME on Linux only
#[cfg(target_os = "linux")]
#[test]
fn export_dir_from_settings_file() {
    let home = TempDir::new().unwrap();
    let settings_dir = home.path().join(".config/reconview");
    std::fs::create_dir_all(&settings_dir).unwrap();
    let target = home.path().join("from-settings");
    std::fs::write(
        settings_dir.join("settings.json"),
        serde_json::json!({ "export.directory": target }).to_string(),
    )
    .unwrap();

    let output = reconview(home.path())
        .args(["export", &payload_arg(), "-c", "internal_only"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(target.join("internal_only_transactions.csv").exists());
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

fn write_csv_pair(dir: &Path) -> (PathBuf, PathBuf) {
    let internal = dir.join("ledger.csv");
    let provider = dir.join("provider.csv");
    std::fs::write(&internal, "Ref No,Amount (NGN)\nTXN-001,15000\n").unwrap();
    std::fs::write(&provider, "reference,txn_status\nTXN-001,success\n").unwrap();
    (internal, provider)
}

#[test]
fn reconcile_rejects_non_csv_without_request() {
    let home = TempDir::new().unwrap();
    let (internal, _) = write_csv_pair(home.path());
    let notes = home.path().join("notes.txt");
    std::fs::write(&notes, "hello").unwrap();

    let output = reconview(home.path())
        .args(["reconcile", internal.to_str().unwrap(), notes.to_str().unwrap(), "--api-base", "http://127.0.0.1:9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("Please upload a CSV file under 10MB"));
}

#[test]
fn reconcile_shows_service_error_verbatim() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/upload_and_reconcile");
        then.status(400).json_body(serde_json::json!({ "error": "Missing required column: amount" }));
    });

    let home = TempDir::new().unwrap();
    let (internal, provider) = write_csv_pair(home.path());
    let output = reconview(home.path())
        .args(["reconcile", internal.to_str().unwrap(), provider.to_str().unwrap(), "--api-base", &server.base_url()])
        .output()
        .unwrap();
    mock.assert();
    assert_eq!(output.status.code(), Some(12));
    assert!(stderr(&output).starts_with("error: Missing required column: amount"));
}

#[test]
fn reconcile_saves_payload_and_prints_summary() {
    let body = std::fs::read_to_string(payload_path()).unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/upload_and_reconcile")
            .body_includes("name=\"internal_file\"")
            .body_includes("name=\"provider_file\"");
        then.status(200).header("content-type", "application/json").body(body);
    });

    let home = TempDir::new().unwrap();
    let (internal, provider) = write_csv_pair(home.path());
    let saved = home.path().join("result.json");
    let output = reconview(home.path())
        .args([
            "reconcile", internal.to_str().unwrap(), provider.to_str().unwrap(),
            "-o", saved.to_str().unwrap(),
            "--api-base", &server.base_url(),
        ])
        .output()
        .unwrap();
    assert_success(&output);
    mock.assert();

    let out = stdout(&output);
    assert!(out.contains("81.1% of total"));
    assert!(out.contains("session: b8e0b6f2-3d4c-4f7a-9a57-0c2d1e7f9a10"));

    // The saved payload feeds straight back into the other commands
    let table = reconview(home.path())
        .args(["table", saved.to_str().unwrap(), "-c", "internal_only"])
        .output()
        .unwrap();
    assert_success(&table);
    assert!(stdout(&table).starts_with("Internal Only Transactions (2)"));
}

#[test]
fn reconcile_unreachable_service() {
    let home = TempDir::new().unwrap();
    let (internal, provider) = write_csv_pair(home.path());
    let output = reconview(home.path())
        .args(["reconcile", internal.to_str().unwrap(), provider.to_str().unwrap(), "--api-base", "http://127.0.0.1:9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(11));
    let err = stderr(&output);
    assert!(err.contains("error: Upload failed"), "{err}");
    assert!(err.contains("hint:  is the reconciliation service running at http://127.0.0.1:9?"));
}

// ---------------------------------------------------------------------------
// view --plain
// ---------------------------------------------------------------------------

#[test]
fn view_plain_prints_every_category() {
    let home = TempDir::new().unwrap();
    let output = reconview(home.path()).args(["view", &payload_arg(), "--plain"]).output().unwrap();
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.contains("Matched Transactions (5)"));
    assert!(out.contains("Internal Only Transactions (2)"));
    assert!(out.contains("Provider Only Transactions (0)"));
    assert!(out.contains("Reconciliation summary"));
}
