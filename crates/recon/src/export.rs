//! CSV export of a category list, locally or through the service.
//!
//! Local export always serializes the full source list: not the filtered,
//! sorted, or paged view. Remote export asks the service for the same file and
//! falls back to the local path on any failure; the fallback is an explicit
//! branch on `Err`, never surfaced to the user.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ExportError;
use crate::model::{Category, ReconPayload, Record, Value};

/// File name of the all-categories archive.
pub const ARCHIVE_FILE_NAME: &str = "reconciliation_results.zip";

/// A file ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Source of export bytes from the reconciliation service.
pub trait RemoteExporter {
    /// CSV for one category of a prior reconciliation session.
    fn fetch_csv(&self, category: Category, session_id: &str) -> Result<Vec<u8>, ExportError>;

    /// Zip archive of every category of a prior reconciliation session.
    fn fetch_archive(&self, session_id: &str) -> Result<Vec<u8>, ExportError>;
}

/// Destination of exported files (the platform "save file" action).
pub trait ExportSink {
    /// Persist `file`, returning where it went.
    fn save(&mut self, file: &ExportFile) -> Result<PathBuf, ExportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ExportSource {
    Remote,
    /// Built locally. `reason` is set when this was a fallback from remote.
    Local { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub source: ExportSource,
    /// `None` when there was nothing to export (empty list, local path).
    pub saved: Option<PathBuf>,
}

impl ExportReport {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ExportSource::Local { reason: Some(_) })
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize records to CSV.
///
/// Header row is the first record's keys. Missing keys and nulls become empty
/// fields, booleans `true`/`false`. Rows end with CRLF. An empty list yields
/// no bytes.
pub fn records_to_csv(records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = first.keys().collect();

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    wtr.write_record(columns.iter())
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    for record in records {
        let row = columns
            .iter()
            .map(|c| record.get(c).and_then(Value::to_text).unwrap_or_default());
        wtr.write_record(row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    wtr.into_inner().map_err(|e| ExportError::Csv(e.to_string()))
}

/// Local CSV export of a full category list. `None` for an empty list.
pub fn local_csv(category: Category, records: &[Record]) -> Result<Option<ExportFile>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExportFile {
        file_name: category.export_file_name(),
        bytes: records_to_csv(records)?,
    }))
}

/// Zip archive with one `<category>_transactions.csv` per non-empty category.
pub fn build_archive(payload: &ReconPayload) -> Result<ExportFile, ExportError> {
    let archive_err = |e: zip::result::ZipError| ExportError::Archive(e.to_string());

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for category in Category::ALL {
        let records = payload.records(category);
        if records.is_empty() {
            continue;
        }
        let csv = records_to_csv(records)?;
        zip.start_file(category.export_file_name(), options)
            .map_err(archive_err)?;
        zip.write_all(&csv)
            .map_err(|e| ExportError::Archive(e.to_string()))?;
    }
    let cursor = zip.finish().map_err(archive_err)?;

    Ok(ExportFile {
        file_name: ARCHIVE_FILE_NAME.to_string(),
        bytes: cursor.into_inner(),
    })
}

// ---------------------------------------------------------------------------
// Remote attempt + fallback
// ---------------------------------------------------------------------------

/// One remote attempt. A missing or empty session id fails without a request.
pub fn attempt_remote_csv(
    remote: &dyn RemoteExporter,
    category: Category,
    session_id: Option<&str>,
) -> Result<Vec<u8>, ExportError> {
    let session = session_id
        .filter(|s| !s.is_empty())
        .ok_or(ExportError::MissingSession)?;
    remote.fetch_csv(category, session)
}

/// Snapshot of one table's export inputs. Cheap to clone and `Send`, so the
/// remote path can run off the UI thread.
#[derive(Debug, Clone)]
pub struct ExportJob {
    category: Category,
    session_id: Option<String>,
    records: Arc<[Record]>,
}

impl ExportJob {
    pub fn new(category: Category, session_id: Option<String>, records: Arc<[Record]>) -> Self {
        Self { category, session_id, records }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Save the locally serialized CSV.
    pub fn run_local(&self, sink: &mut dyn ExportSink) -> Result<ExportReport, ExportError> {
        self.save_local(sink, None)
    }

    /// Fetch from the service; on any remote failure fall back to local.
    ///
    /// Only local-path failures (CSV writing, the sink) are returned as `Err`.
    pub fn run_remote(
        &self,
        remote: &dyn RemoteExporter,
        sink: &mut dyn ExportSink,
    ) -> Result<ExportReport, ExportError> {
        match attempt_remote_csv(remote, self.category, self.session_id.as_deref()) {
            Ok(bytes) => {
                let file = ExportFile {
                    file_name: self.category.export_file_name(),
                    bytes,
                };
                let path = sink.save(&file)?;
                log::info!("exported {} from service to {}", self.category, path.display());
                Ok(ExportReport { source: ExportSource::Remote, saved: Some(path) })
            }
            Err(reason) => {
                log::info!("remote export of {} failed ({reason}), exporting locally", self.category);
                self.save_local(sink, Some(reason.to_string()))
            }
        }
    }

    fn save_local(&self, sink: &mut dyn ExportSink, reason: Option<String>) -> Result<ExportReport, ExportError> {
        let saved = match local_csv(self.category, &self.records)? {
            Some(file) => Some(sink.save(&file)?),
            None => None,
        };
        Ok(ExportReport { source: ExportSource::Local { reason }, saved })
    }
}

/// Save the locally built all-categories archive.
pub fn export_all_local(payload: &ReconPayload, sink: &mut dyn ExportSink) -> Result<ExportReport, ExportError> {
    save_archive_local(payload, sink, None)
}

/// Fetch the all-categories archive; on any remote failure build it locally.
pub fn export_all_remote(
    payload: &ReconPayload,
    remote: &dyn RemoteExporter,
    sink: &mut dyn ExportSink,
) -> Result<ExportReport, ExportError> {
    let attempt = payload
        .session()
        .ok_or(ExportError::MissingSession)
        .and_then(|session| remote.fetch_archive(session));

    match attempt {
        Ok(bytes) => {
            let file = ExportFile { file_name: ARCHIVE_FILE_NAME.to_string(), bytes };
            let path = sink.save(&file)?;
            Ok(ExportReport { source: ExportSource::Remote, saved: Some(path) })
        }
        Err(reason) => {
            log::info!("remote archive export failed ({reason}), building locally");
            save_archive_local(payload, sink, Some(reason.to_string()))
        }
    }
}

fn save_archive_local(
    payload: &ReconPayload,
    sink: &mut dyn ExportSink,
    reason: Option<String>,
) -> Result<ExportReport, ExportError> {
    let file = build_archive(payload)?;
    let path = sink.save(&file)?;
    Ok(ExportReport { source: ExportSource::Local { reason }, saved: Some(path) })
}
