//! Interactive result viewer: one tab per category, search, sort, paging,
//! export, and a summary overlay.

mod worker;

use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use reconview_recon::aggregate::SummaryView;
use reconview_recon::export::ExportSource;
use reconview_recon::table::{TableBody, TableRender, TableView};
use reconview_recon::{Accent, ExportError, ExportReport, ReconPayload, RowHighlight};

use crate::sink::DirectorySink;
use crate::util;
pub(crate) use worker::{ExportWorker, SharedRemote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Search,
}

struct ViewerApp {
    tables: Vec<TableView>,
    /// Index into `tables` for the active tab
    active: usize,
    /// Column cursor (sort target)
    cursor_col: usize,
    /// Row cursor within the current page
    cursor_row: usize,
    scroll_col: usize,
    summary: Option<SummaryView>,
    file_name: String,
    mode: Mode,
    /// Search term before entering search mode, restored on Esc
    search_before: String,
    status: Option<String>,
    should_quit: bool,
    show_help: bool,
    show_summary: bool,
    worker: ExportWorker,
}

impl ViewerApp {
    fn new(payload: &ReconPayload, file_name: String, worker: ExportWorker) -> Self {
        Self {
            tables: TableView::from_payload(payload),
            active: 0,
            cursor_col: 0,
            cursor_row: 0,
            scroll_col: 0,
            summary: SummaryView::build(payload.summary.as_ref(), payload.column_mappings.as_ref()),
            file_name,
            mode: Mode::Normal,
            search_before: String::new(),
            status: None,
            should_quit: false,
            show_help: false,
            show_summary: false,
            worker,
        }
    }

    fn table(&self) -> &TableView {
        &self.tables[self.active]
    }

    fn table_mut(&mut self) -> &mut TableView {
        &mut self.tables[self.active]
    }

    fn num_cols(&self) -> usize {
        self.table().schema().map_or(0, |s| s.len())
    }

    fn page_len(&self) -> usize {
        self.table().page_rows().count()
    }

    fn switch_table(&mut self, idx: usize) {
        if idx >= self.tables.len() || idx == self.active {
            return;
        }
        self.active = idx;
        self.cursor_col = 0;
        self.cursor_row = 0;
        self.scroll_col = 0;
    }

    fn next_table(&mut self) {
        let next = (self.active + 1) % self.tables.len();
        self.switch_table(next);
    }

    fn prev_table(&mut self) {
        let prev = if self.active == 0 { self.tables.len() - 1 } else { self.active - 1 };
        self.switch_table(prev);
    }

    // ── Input ───────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help || self.show_summary {
            // Any key dismisses overlays
            self.show_help = false;
            self.show_summary = false;
            return;
        }
        match self.mode {
            Mode::Search => self.handle_search_key(key),
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Esc => {
                let before = std::mem::take(&mut self.search_before);
                self.apply_search(before);
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                let mut term = self.table().search().to_string();
                term.pop();
                self.apply_search(term);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let mut term = self.table().search().to_string();
                term.push(c);
                self.apply_search(term);
            }
            _ => {}
        }
    }

    fn apply_search(&mut self, term: String) {
        self.table_mut().set_search(term);
        self.cursor_row = 0;
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('s') => self.show_summary = true,
            KeyCode::Char('/') => {
                self.search_before = self.table().search().to_string();
                self.mode = Mode::Search;
            }
            KeyCode::Char('c') => self.apply_search(String::new()),
            KeyCode::Up | KeyCode::Char('k') => self.cursor_row = self.cursor_row.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor_row = (self.cursor_row + 1).min(self.page_len().saturating_sub(1));
            }
            KeyCode::Left | KeyCode::Char('h') => self.cursor_col = self.cursor_col.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => {
                self.cursor_col = (self.cursor_col + 1).min(self.num_cols().saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char('o') => self.sort_cursor_column(),
            KeyCode::PageDown | KeyCode::Char('n') => {
                self.table_mut().next_page();
                self.cursor_row = 0;
            }
            KeyCode::PageUp | KeyCode::Char('p') => {
                self.table_mut().prev_page();
                self.cursor_row = 0;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.table_mut().go_to_page(1);
                self.cursor_row = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                let last = self.table().total_pages();
                self.table_mut().go_to_page(last);
                self.cursor_row = 0;
            }
            KeyCode::Char('e') => self.export_local(),
            KeyCode::Char('E') => self.export_remote(),
            KeyCode::Char(c @ '1'..='3') => {
                let idx = (c as usize) - ('1' as usize);
                self.switch_table(idx);
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.prev_table();
                } else {
                    self.next_table();
                }
            }
            KeyCode::BackTab => self.prev_table(),
            _ => {}
        }
    }

    fn sort_cursor_column(&mut self) {
        let Some(column) = self
            .table()
            .schema()
            .and_then(|s| s.columns().get(self.cursor_col))
            .map(|c| c.name.clone())
        else {
            return;
        };
        self.table_mut().toggle_sort(&column);
        self.cursor_row = 0;
    }

    // ── Export ──────────────────────────────────────────────────────

    fn export_local(&mut self) {
        let mut sink = DirectorySink::new(self.worker.out_dir().clone());
        let result = self.table().export_local(&mut sink);
        self.status = Some(export_message(self.table().title(), &result));
    }

    fn export_remote(&mut self) {
        match self.table_mut().begin_export() {
            Ok(job) => {
                self.worker.spawn(self.active, job);
                self.status = Some(format!("{}: exporting...", self.table().title()));
            }
            Err(ExportError::InFlight) => {
                self.status = Some("export already in progress".to_string());
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Drain finished background exports.
    fn poll_exports(&mut self) {
        while let Some(outcome) = self.worker.try_recv() {
            if let Some(table) = self.tables.get_mut(outcome.table) {
                table.finish_export();
            }
            let title = self
                .tables
                .get(outcome.table)
                .map_or_else(|| outcome.category.to_string(), |t| t.title().to_string());
            self.status = Some(export_message(&title, &outcome.result));
        }
    }

    /// Wait for in-flight exports so none is cut off by exit.
    fn finish_exports(&mut self) {
        self.worker.join_pending();
        self.poll_exports();
    }

    // ── Drawing ─────────────────────────────────────────────────────

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        let render = self.table().render();
        self.draw_title(frame, chunks[0]);
        self.draw_tab_bar(frame, chunks[1]);
        self.draw_search(frame, chunks[2], &render);
        self.draw_grid(frame, chunks[3], &render);
        self.draw_pager(frame, chunks[4], &render);
        self.draw_status(frame, chunks[5], &render);

        if self.show_summary {
            self.draw_summary(frame, area);
        }
        if self.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let session = self.table().session_id().unwrap_or("no session");
        let title = format!(" reconview: {} | {} ", self.file_name, session);
        let para = Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]))
        .style(Style::default().bg(Color::Cyan));
        frame.render_widget(para, area);
    }

    fn draw_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (i, table) in self.tables.iter().enumerate() {
            let mut label = format!(" {}:{} ({}) ", i + 1, table.title(), table.records().len());
            if table.is_exporting() {
                label.push_str("* ");
            }
            let accent = accent_color(table.accent());
            if i == self.active {
                spans.push(Span::styled(
                    label,
                    Style::default().fg(Color::Black).bg(accent).add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::styled(label, Style::default().fg(accent).bg(Color::DarkGray)));
            }
            spans.push(Span::styled(" ", Style::default().bg(Color::Black)));
        }
        let para = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
        frame.render_widget(para, area);
    }

    fn draw_search(&self, frame: &mut Frame, area: Rect, render: &TableRender) {
        let (label_style, cursor) = if self.mode == Mode::Search {
            (Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD), "_")
        } else {
            (Style::default().fg(Color::DarkGray), "")
        };
        let line = Line::from(vec![
            Span::styled(" Search: ", label_style),
            Span::styled(format!("{}{}", render.search, cursor), Style::default().fg(Color::White)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect, render: &TableRender) {
        let (headers, rows) = match &render.body {
            TableBody::Empty { message } => {
                let msg = Paragraph::new(format!(" {message}")).style(Style::default().fg(Color::DarkGray));
                frame.render_widget(msg, area);
                return;
            }
            TableBody::Rows { headers, rows, .. } => (headers, rows),
        };

        let header_text: Vec<String> = headers.iter().map(|h| h.display()).collect();
        let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells.clone()).collect();
        let widths = util::column_widths(&header_text, &cells);
        let vis_cols = visible_columns(&widths, self.scroll_col_for(&widths, area.width), area.width);

        let mut lines: Vec<Line> = Vec::with_capacity(rows.len() + 1);
        let header_spans: Vec<Span> = vis_cols
            .iter()
            .map(|&c| {
                let style = if c == self.cursor_col {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                };
                Span::styled(format!(" {}", util::fit_cell(&header_text[c], widths[c])), style)
            })
            .collect();
        lines.push(Line::from(header_spans));

        if rows.is_empty() {
            lines.push(Line::from(Span::styled(
                " (no matching rows)",
                Style::default().fg(Color::DarkGray),
            )));
        }

        for (r, row) in rows.iter().enumerate() {
            let base = highlight_style(row.highlight);
            let spans: Vec<Span> = vis_cols
                .iter()
                .map(|&c| {
                    let value = row.cells.get(c).map(String::as_str).unwrap_or("");
                    let style = if r == self.cursor_row && c == self.cursor_col {
                        Style::default().fg(Color::Black).bg(Color::White).add_modifier(Modifier::BOLD)
                    } else if r == self.cursor_row {
                        base.add_modifier(Modifier::BOLD)
                    } else {
                        base
                    };
                    Span::styled(format!(" {}", util::fit_cell(value, widths[c])), style)
                })
                .collect();
            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    /// First visible column so that the cursor column stays on screen.
    fn scroll_col_for(&self, widths: &[usize], area_width: u16) -> usize {
        let mut start = self.scroll_col.min(self.cursor_col);
        while start < self.cursor_col {
            let vis = visible_columns(widths, start, area_width);
            if vis.last().is_some_and(|&last| last >= self.cursor_col) {
                break;
            }
            start += 1;
        }
        start
    }

    fn draw_pager(&self, frame: &mut Frame, area: Rect, render: &TableRender) {
        let TableBody::Rows { pagination: Some(p), .. } = &render.body else {
            frame.render_widget(Paragraph::new(""), area);
            return;
        };
        let enabled = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let disabled = Style::default().fg(Color::DarkGray);
        let line = Line::from(vec![
            Span::styled(format!(" {}   ", p.range_label()), Style::default().fg(Color::Gray)),
            Span::styled("[p] Previous", if p.has_previous { enabled } else { disabled }),
            Span::raw("  "),
            Span::styled(p.page_label(), Style::default().fg(Color::Gray)),
            Span::raw("  "),
            Span::styled("Next [n]", if p.has_next { enabled } else { disabled }),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, render: &TableRender) {
        let left = match &self.status {
            Some(msg) => format!(" {msg}"),
            None => match &render.body {
                TableBody::Rows { headers, rows, .. } => headers
                    .get(self.cursor_col)
                    .zip(rows.get(self.cursor_row))
                    .map(|(h, row)| {
                        let value = row.cells.get(self.cursor_col).map(String::as_str).unwrap_or("");
                        format!(" {} = {:?}", h.label, value)
                    })
                    .unwrap_or_default(),
                TableBody::Empty { .. } => String::new(),
            },
        };
        let export_hint = if render.exporting { "exporting..." } else { "e/E: export" };
        let right = format!("{export_hint}  s: summary  ?: help ");

        let padding = (area.width as usize)
            .saturating_sub(util::display_width(&left) + util::display_width(&right));
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);

        let para = Paragraph::new(Line::from(vec![Span::styled(
            status,
            Style::default().fg(Color::Black).bg(Color::DarkGray),
        )]))
        .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(para, area);
    }

    fn draw_summary(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = match &self.summary {
            None => vec![Line::from(Span::styled(
                "  Summary not available yet",
                Style::default().fg(Color::DarkGray),
            ))],
            Some(view) => summary_lines(view),
        };
        let title = match &self.summary {
            Some(view) => format!(" Summary ({} transactions) ", view.total),
            None => " Summary ".to_string(),
        };
        let popup = centered(area, 64, lines.len() as u16 + 2);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help_lines = [
            "",
            "  Table",
            "  -----",
            "  arrows / hjkl     Move cursor",
            "  Enter / o         Sort by cursor column",
            "  n / PgDn          Next page",
            "  p / PgUp          Previous page",
            "  g / G             First / last page",
            "  /                 Search (Enter keeps, Esc reverts)",
            "  c                 Clear search",
            "",
            "  Tabs",
            "  ----",
            "  Tab / Shift+Tab   Next/prev category",
            "  1..3              Jump to category",
            "",
            "  Export",
            "  ------",
            "  e                 Export CSV (local)",
            "  E                 Export CSV via service",
            "",
            "  General",
            "  -------",
            "  s                 Summary",
            "  q / Esc           Quit",
            "  ?                 Toggle this help",
            "",
        ];
        let popup = centered(area, 52, help_lines.len() as u16 + 2);
        let lines: Vec<Line> = help_lines
            .iter()
            .map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White))))
            .collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Keybindings ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

fn summary_lines(view: &SummaryView) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    for share in &view.categories {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {}", util::fit_cell(share.label, 22)),
                Style::default().fg(accent_color(share.accent)).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{:>8}   {}% of total", share.count, share.percent)),
        ]));
    }
    lines.push(Line::from(""));
    for signal in &view.quality {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}", util::fit_cell(signal.label, 22)), Style::default().fg(Color::Magenta)),
            Span::raw(format!("{:>8}   {}", signal.count, signal.caption)),
        ]));
    }
    if let Some(mappings) = &view.mappings {
        for (side, entries) in [("Internal mapping", &mappings.internal), ("Provider mapping", &mappings.provider)] {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("  {side}"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for entry in entries {
                lines.push(Line::from(format!("    {entry}")));
            }
        }
    }
    lines.push(Line::from(""));
    lines
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(area.x + x, area.y + y, width.min(area.width), height.min(area.height))
}

/// Columns that fit from `start`, always at least one.
fn visible_columns(widths: &[usize], start: usize, area_width: u16) -> Vec<usize> {
    let available = area_width as usize;
    let mut cols = Vec::new();
    let mut used = 0usize;
    for (c, &w) in widths.iter().enumerate().skip(start) {
        let w = w + 1;
        if used + w > available && !cols.is_empty() {
            break;
        }
        used += w;
        cols.push(c);
    }
    cols
}

fn accent_color(accent: Accent) -> Color {
    match accent {
        Accent::Green => Color::Green,
        Accent::Yellow => Color::Yellow,
        Accent::Red => Color::Red,
    }
}

fn highlight_style(highlight: RowHighlight) -> Style {
    match highlight {
        RowHighlight::HighRiskAnomaly => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        RowHighlight::Anomaly => Style::default().fg(Color::LightMagenta),
        RowHighlight::AmountMismatch => Style::default().fg(Color::LightYellow),
        RowHighlight::StatusMismatch => Style::default().fg(Color::LightRed),
        RowHighlight::Neutral => Style::default().fg(Color::Gray),
        RowHighlight::UnmatchedInternal => Style::default().fg(Color::Yellow),
        RowHighlight::UnmatchedProvider => Style::default().fg(Color::Red),
    }
}

fn export_message(title: &str, result: &Result<ExportReport, ExportError>) -> String {
    match result {
        Ok(ExportReport { saved: None, .. }) => format!("{title}: nothing to export"),
        Ok(ExportReport { saved: Some(path), source }) => match source {
            ExportSource::Remote => format!("{title}: saved {} (from service)", path.display()),
            ExportSource::Local { .. } => format!("{title}: saved {}", path.display()),
        },
        Err(e) => format!("{title}: export failed: {e}"),
    }
}

/// Run the interactive viewer over a reconciliation payload.
pub fn run(payload: &ReconPayload, file_name: String, worker: ExportWorker) -> Result<(), String> {
    let app = ViewerApp::new(payload, file_name, worker);
    run_app(app)
}

fn run_app(mut app: ViewerApp) -> Result<(), String> {
    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        app.poll_exports();

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100)).map_err(|e| format!("event poll error: {}", e))? {
            if let Event::Key(key) = event::read().map_err(|e| format!("event read error: {}", e))? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    if app.worker.has_pending() {
        app.status = Some("waiting for export to finish...".to_string());
        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;
    }
    app.finish_exports();

    Ok(())
}
