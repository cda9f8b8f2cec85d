//! Plain-text rendering of table pages and the summary (no TUI, no raw mode).

use std::io::{self, Write};

use reconview_recon::aggregate::SummaryView;
use reconview_recon::table::{TableBody, TableRender};
use reconview_recon::{Category, RowHighlight};

use crate::util;

/// Print one rendered table page.
pub fn print_table(w: &mut impl Write, render: &TableRender) -> io::Result<()> {
    write!(w, "{}", render.title)?;
    if !render.search.is_empty() {
        write!(w, "  [search: {:?}]", render.search)?;
    }
    writeln!(w)?;

    let (headers, rows, pagination) = match &render.body {
        TableBody::Empty { message } => {
            writeln!(w, "{message}")?;
            return Ok(());
        }
        TableBody::Rows { headers, rows, pagination } => (headers, rows, pagination),
    };

    let flagged = render.category == Category::Matched;
    let header_text: Vec<String> = headers.iter().map(|h| h.display()).collect();
    let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells.clone()).collect();
    let widths = util::column_widths(&header_text, &cells);

    for (text, &cw) in header_text.iter().zip(&widths) {
        write!(w, "{} ", util::fit_cell(text, cw))?;
    }
    writeln!(w)?;
    for &cw in &widths {
        write!(w, "{} ", "-".repeat(cw))?;
    }
    writeln!(w)?;

    for row in rows {
        for (value, &cw) in row.cells.iter().zip(&widths) {
            write!(w, "{} ", util::fit_cell(value, cw))?;
        }
        if flagged && row.highlight != RowHighlight::Neutral {
            write!(w, " [{}]", row.highlight)?;
        }
        writeln!(w)?;
    }

    if rows.is_empty() {
        writeln!(w, "(no matching rows)")?;
    }
    if let Some(p) = pagination {
        writeln!(w)?;
        writeln!(w, "{}    {}", p.range_label(), p.page_label())?;
    }
    Ok(())
}

/// Print the summary view.
pub fn print_summary(w: &mut impl Write, view: &SummaryView) -> io::Result<()> {
    writeln!(w, "Reconciliation summary ({} transactions)", view.total)?;
    writeln!(w)?;
    for share in &view.categories {
        writeln!(
            w,
            "  {} {:>8}   {}% of total",
            util::fit_cell(share.label, 22),
            share.count,
            share.percent
        )?;
    }

    writeln!(w)?;
    writeln!(w, "Quality")?;
    for signal in &view.quality {
        writeln!(
            w,
            "  {} {:>8}   {}",
            util::fit_cell(signal.label, 22),
            signal.count,
            signal.caption
        )?;
    }

    if let Some(mappings) = &view.mappings {
        writeln!(w)?;
        writeln!(w, "Column mappings")?;
        for (side, entries) in [("internal", &mappings.internal), ("provider", &mappings.provider)] {
            writeln!(w, "  {side}")?;
            if entries.is_empty() {
                writeln!(w, "    (none)")?;
            }
            for entry in entries {
                writeln!(w, "    {entry}")?;
            }
        }
    }
    Ok(())
}
