//! Result table engine: one interactive view per category.
//!
//! A `TableView` holds the immutable source list plus private view state
//! (search term, sort, page, export-in-flight). The visible index list is
//! re-derived from scratch whenever records, search, or sort change.

use std::sync::Arc;

use serde::Serialize;

use crate::classify::{classify_row, RowHighlight};
use crate::error::ExportError;
use crate::export::{ExportJob, ExportReport, ExportSink, RemoteExporter};
use crate::model::{Accent, Category, ReconPayload, Record, Value};
use crate::query::{self, SortDirection, SortState};
use crate::schema::{header_label, Schema};

/// Shown instead of the table when the category list is empty.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Shown for null, missing, and empty cells.
pub const PLACEHOLDER: &str = "-";

/// Display text of one cell.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Bool(true)) => "✓".to_string(),
        Some(Value::Bool(false)) => "✗".to_string(),
        Some(v) => match v.to_text() {
            Some(text) if !text.is_empty() => text,
            _ => PLACEHOLDER.to_string(),
        },
        None => PLACEHOLDER.to_string(),
    }
}

pub struct TableView {
    category: Category,
    title: String,
    accent: Accent,
    session_id: Option<String>,
    records: Arc<[Record]>,
    schema: Option<Schema>,
    search: String,
    sort: SortState,
    page: usize,
    /// Filtered + sorted indices into `records`.
    visible: Vec<usize>,
    exporting: bool,
}

impl TableView {
    pub fn new(
        records: impl Into<Arc<[Record]>>,
        category: Category,
        title: impl Into<String>,
        accent: Accent,
        session_id: Option<String>,
    ) -> Self {
        let records = records.into();
        let mut view = Self {
            category,
            title: title.into(),
            accent,
            session_id: session_id.filter(|s| !s.is_empty()),
            schema: Schema::infer(&records),
            records,
            search: String::new(),
            sort: SortState::default(),
            page: 1,
            visible: Vec::new(),
            exporting: false,
        };
        view.rederive();
        view
    }

    /// View over one category of a payload with the default title and accent.
    pub fn for_category(payload: &ReconPayload, category: Category) -> Self {
        Self::new(
            payload.records(category).to_vec(),
            category,
            category.default_title(),
            category.default_accent(),
            payload.session_id.clone(),
        )
    }

    /// One independent view per category, in display order.
    pub fn from_payload(payload: &ReconPayload) -> Vec<TableView> {
        Category::ALL
            .iter()
            .map(|&category| Self::for_category(payload, category))
            .collect()
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn accent(&self) -> Accent {
        self.accent
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The full source list, untouched by search, sort, or paging.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        query::total_pages(self.visible.len())
    }

    /// Number of rows after filtering.
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    // ── State changes ───────────────────────────────────────────────

    /// Replace the source list (a new render cycle). Search and sort are kept,
    /// the page is clamped into the new range.
    pub fn set_records(&mut self, records: impl Into<Arc<[Record]>>) {
        self.records = records.into();
        self.schema = Schema::infer(&self.records);
        self.rederive();
        self.page = query::clamp_page(self.page, self.visible.len());
    }

    /// Change the search term. Returns to page 1.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.rederive();
        self.page = 1;
    }

    /// Header click on `column`. Returns to page 1.
    /// Columns outside the schema are ignored (returns false).
    pub fn toggle_sort(&mut self, column: &str) -> bool {
        let known = self.schema.as_ref().is_some_and(|s| s.column(column).is_some());
        if !known {
            log::debug!("{}: ignoring sort on unknown column {column:?}", self.category);
            return false;
        }
        self.sort = self.sort.toggled(column);
        self.rederive();
        self.page = 1;
        true
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> usize {
        self.go_to_page(self.page.saturating_sub(1))
    }

    /// Jump to `page`, clamped to `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.page = query::clamp_page(page, self.visible.len());
        self.page
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    fn rederive(&mut self) {
        let mut visible = query::filter(&self.records, &self.search);
        if let (Some(key), Some(schema)) = (self.sort.key.as_deref(), self.schema.as_ref()) {
            if let Some(column) = schema.column(key) {
                query::sort(&self.records, &mut visible, column, self.sort.direction);
            }
        }
        self.visible = visible;
    }

    // ── Derived rows ────────────────────────────────────────────────

    /// Every filtered + sorted row.
    pub fn visible_rows(&self) -> impl Iterator<Item = &Record> {
        self.visible.iter().map(move |&i| &self.records[i])
    }

    /// Rows of the current page.
    pub fn page_rows(&self) -> impl Iterator<Item = &Record> {
        let range = query::page_range(self.visible.len(), self.page);
        self.visible[range].iter().map(move |&i| &self.records[i])
    }

    pub fn highlight(&self, row: &Record) -> RowHighlight {
        classify_row(self.category, row)
    }

    pub fn render(&self) -> TableRender {
        let title = format!("{} ({})", self.title, self.records.len());
        let body = match &self.schema {
            None => TableBody::Empty { message: NO_DATA_MESSAGE.to_string() },
            Some(schema) => {
                let headers = schema
                    .names()
                    .map(|name| HeaderCell {
                        column: name.to_string(),
                        label: header_label(name),
                        sort: self.sort.direction_for(name),
                    })
                    .collect();
                let rows = self
                    .page_rows()
                    .map(|row| RenderedRow {
                        highlight: self.highlight(row),
                        cells: schema.names().map(|c| cell_text(row.get(c))).collect(),
                    })
                    .collect();
                TableBody::Rows { headers, rows, pagination: self.pagination() }
            }
        };
        TableRender {
            category: self.category,
            title,
            accent: self.accent,
            search: self.search.clone(),
            exporting: self.exporting,
            body,
        }
    }

    /// Pagination controls, present only when there is more than one page.
    pub fn pagination(&self) -> Option<Pagination> {
        let total_pages = self.total_pages();
        if total_pages <= 1 {
            return None;
        }
        let total = self.visible.len();
        let range = query::page_range(total, self.page);
        Some(Pagination {
            page: self.page,
            total_pages,
            first: range.start + 1,
            last: range.end,
            total,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
        })
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Export inputs without touching the in-flight flag.
    pub fn export_job(&self) -> ExportJob {
        ExportJob::new(self.category, self.session_id.clone(), Arc::clone(&self.records))
    }

    /// Mark a remote export as in flight. Refused while one is pending.
    pub fn begin_export(&mut self) -> Result<ExportJob, ExportError> {
        if self.exporting {
            return Err(ExportError::InFlight);
        }
        self.exporting = true;
        Ok(self.export_job())
    }

    pub fn finish_export(&mut self) {
        self.exporting = false;
    }

    /// Local export of the full source list.
    pub fn export_local(&self, sink: &mut dyn ExportSink) -> Result<ExportReport, ExportError> {
        self.export_job().run_local(sink)
    }

    /// Remote export with local fallback, run to completion on this thread.
    pub fn export_remote(
        &mut self,
        remote: &dyn RemoteExporter,
        sink: &mut dyn ExportSink,
    ) -> Result<ExportReport, ExportError> {
        let job = self.begin_export()?;
        let result = job.run_remote(remote, sink);
        self.finish_export();
        result
    }
}

// ---------------------------------------------------------------------------
// Render output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TableRender {
    pub category: Category,
    /// `"<title> (<source count>)"`
    pub title: String,
    pub accent: Accent,
    pub search: String,
    pub exporting: bool,
    #[serde(flatten)]
    pub body: TableBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TableBody {
    Empty {
        message: String,
    },
    Rows {
        headers: Vec<HeaderCell>,
        rows: Vec<RenderedRow>,
        pagination: Option<Pagination>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub column: String,
    pub label: String,
    pub sort: Option<SortDirection>,
}

impl HeaderCell {
    /// Label with the sort arrow when this is the active column.
    pub fn display(&self) -> String {
        match self.sort {
            Some(dir) => format!("{} {}", self.label, dir.arrow()),
            None => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub highlight: RowHighlight,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub total_pages: usize,
    /// 1-based position of the first row on this page.
    pub first: usize,
    pub last: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl Pagination {
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages)
    }

    pub fn range_label(&self) -> String {
        format!("Showing {} to {} of {} results", self.first, self.last, self.total)
    }
}
