//! `reconview-recon`: presentation engine for reconciliation results.
//!
//! Pure engine crate: receives an already-categorized payload from the
//! reconciliation service, exposes search / sort / pagination / row
//! highlighting per category, CSV export, and the cross-category summary.
//! No CLI, HTTP, or filesystem dependencies; those plug in through the
//! [`export::RemoteExporter`] and [`export::ExportSink`] seams.

pub mod aggregate;
pub mod classify;
pub mod error;
pub mod export;
pub mod model;
pub mod query;
pub mod schema;
pub mod table;

pub use aggregate::SummaryView;
pub use classify::{classify_row, RowHighlight};
pub use error::{ExportError, ReconError};
pub use export::{ExportFile, ExportReport, ExportSink, ExportSource, RemoteExporter};
pub use model::{Accent, Category, ColumnMappings, ReconPayload, Record, Summary, Value, ValueKind};
pub use query::{SortDirection, SortState, PAGE_SIZE};
pub use schema::{Column, Schema};
pub use table::{TableRender, TableView};
