use std::cell::Cell;
use std::path::PathBuf;

use reconview_recon::aggregate::SummaryView;
use reconview_recon::export::{self, ExportFile, ExportSink, ExportSource, RemoteExporter};
use reconview_recon::table::{TableBody, TableView};
use reconview_recon::{Category, ExportError, ReconPayload, RowHighlight};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_payload() -> ReconPayload {
    let path = fixtures_dir().join("payload.json");
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ReconPayload::from_json(&json).unwrap()
}

#[derive(Default)]
struct MemorySink {
    files: Vec<ExportFile>,
}

impl ExportSink for MemorySink {
    fn save(&mut self, file: &ExportFile) -> Result<PathBuf, ExportError> {
        self.files.push(file.clone());
        Ok(PathBuf::from(&file.file_name))
    }
}

/// Remote that always fails at the transport level.
struct DownRemote {
    calls: Cell<usize>,
}

impl RemoteExporter for DownRemote {
    fn fetch_csv(&self, _category: Category, _session_id: &str) -> Result<Vec<u8>, ExportError> {
        self.calls.set(self.calls.get() + 1);
        Err(ExportError::Network("connection refused".into()))
    }

    fn fetch_archive(&self, _session_id: &str) -> Result<Vec<u8>, ExportError> {
        self.calls.set(self.calls.get() + 1);
        Err(ExportError::Network("connection refused".into()))
    }
}

// -------------------------------------------------------------------------
// Payload → tables
// -------------------------------------------------------------------------

#[test]
fn payload_splits_into_three_views() {
    let payload = load_payload();
    let views = TableView::from_payload(&payload);
    let titles: Vec<String> = views.iter().map(|v| v.render().title).collect();
    assert_eq!(
        titles,
        vec![
            "Matched Transactions (5)",
            "Internal Only Transactions (2)",
            "Provider Only Transactions (0)",
        ]
    );
    assert!(matches!(views[2].render().body, TableBody::Empty { .. }));
}

#[test]
fn matched_highlights_follow_priority() {
    let payload = load_payload();
    let view = TableView::for_category(&payload, Category::Matched);
    let classes: Vec<RowHighlight> = view.page_rows().map(|r| view.highlight(r)).collect();
    assert_eq!(
        classes,
        vec![
            RowHighlight::HighRiskAnomaly,
            RowHighlight::Anomaly,
            RowHighlight::AmountMismatch,
            RowHighlight::StatusMismatch,
            RowHighlight::Neutral,
        ]
    );
}

#[test]
fn search_sort_and_render_cells() {
    let payload = load_payload();
    let mut view = TableView::for_category(&payload, Category::Matched);
    view.set_search("completed");
    assert_eq!(view.visible_len(), 3);

    view.toggle_sort("amount");
    view.toggle_sort("amount");
    let render = view.render();
    let TableBody::Rows { headers, rows, pagination } = render.body else {
        panic!("expected rows");
    };
    assert_eq!(headers[0].label, "TRANSACTION REFERENCE");
    assert_eq!(headers[1].display(), "AMOUNT ↓");
    assert!(pagination.is_none());
    // Descending by amount, null last.
    let refs: Vec<&str> = rows.iter().map(|r| r.cells[0].as_str()).collect();
    assert_eq!(refs, vec!["TXN-001", "TXN-002", "TXN-005"]);
    assert_eq!(rows[2].cells[1], "-");
    assert_eq!(rows[0].cells[3], "✓");
}

// -------------------------------------------------------------------------
// Export
// -------------------------------------------------------------------------

#[test]
fn local_export_ignores_view_state() {
    let payload = load_payload();
    let mut view = TableView::for_category(&payload, Category::Matched);
    view.set_search("TXN-004");
    view.toggle_sort("amount");

    let mut sink = MemorySink::default();
    view.export_local(&mut sink).unwrap();
    assert_eq!(sink.files.len(), 1);
    assert_eq!(sink.files[0].file_name, "matched_transactions.csv");

    let csv = String::from_utf8(sink.files[0].bytes.clone()).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("TXN-001,15000,"));
    assert!(lines[5].starts_with("TXN-005,,"));
}

#[test]
fn remote_failure_falls_back_to_exactly_one_local_save() {
    let payload = load_payload();
    let mut view = TableView::for_category(&payload, Category::InternalOnly);
    let remote = DownRemote { calls: Cell::new(0) };
    let mut sink = MemorySink::default();

    let report = view.export_remote(&remote, &mut sink).unwrap();
    assert_eq!(remote.calls.get(), 1);
    assert_eq!(sink.files.len(), 1);
    assert_eq!(sink.files[0].file_name, "internal_only_transactions.csv");
    assert!(report.is_fallback());
    assert!(!view.is_exporting());
}

#[test]
fn remote_without_session_makes_no_request() {
    let mut payload = load_payload();
    payload.session_id = Some(String::new());
    let mut view = TableView::for_category(&payload, Category::Matched);
    let remote = DownRemote { calls: Cell::new(0) };
    let mut sink = MemorySink::default();

    let report = view.export_remote(&remote, &mut sink).unwrap();
    assert_eq!(remote.calls.get(), 0);
    assert_eq!(sink.files.len(), 1);
    match report.source {
        ExportSource::Local { reason: Some(reason) } => assert!(reason.contains("session")),
        other => panic!("expected local fallback, got {other:?}"),
    }
}

#[test]
fn archive_fallback_skips_empty_categories() {
    let payload = load_payload();
    let remote = DownRemote { calls: Cell::new(0) };
    let mut sink = MemorySink::default();

    let report = export::export_all_remote(&payload, &remote, &mut sink).unwrap();
    assert!(report.is_fallback());
    assert_eq!(sink.files[0].file_name, export::ARCHIVE_FILE_NAME);

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(sink.files[0].bytes.clone())).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["internal_only_transactions.csv", "matched_transactions.csv"]);
}

// -------------------------------------------------------------------------
// Summary
// -------------------------------------------------------------------------

#[test]
fn summary_view_from_payload() {
    let payload = load_payload();
    let view = SummaryView::build(payload.summary.as_ref(), payload.column_mappings.as_ref()).unwrap();
    assert_eq!(view.total, 185);
    assert_eq!(view.share(Category::Matched).unwrap().percent, "81.1");
    assert_eq!(view.share(Category::InternalOnly).unwrap().percent, "13.5");
    assert_eq!(view.share(Category::ProviderOnly).unwrap().percent, "5.4");

    // status_mismatches absent from the fixture.
    assert_eq!(view.quality[3].count, 0);

    let mappings = view.mappings.unwrap();
    let internal: Vec<String> = mappings.internal.iter().map(|m| m.to_string()).collect();
    assert_eq!(internal, vec!["Amount (NGN) → amount", "Ref No → transaction_reference"]);
    assert_eq!(mappings.provider.len(), 2);
}
