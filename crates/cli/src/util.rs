use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Fit `s` into exactly `width` display columns.
///
/// Short text is space-padded. Long text is cut on a char boundary and ends in
/// `..` (dropped below 3 columns). A wide glyph that would straddle the cut is
/// left out and its column filled with a space.
pub(crate) fn fit_cell(s: &str, width: usize) -> String {
    let full = display_width(s);
    let (kept, marker) = if full <= width {
        (s.to_string(), "")
    } else {
        let marker = if width >= 3 { ".." } else { "" };
        let budget = width - marker.len();
        let kept: String = s
            .chars()
            .scan(0usize, |used, ch| {
                *used += ch.width().unwrap_or(0);
                (*used <= budget).then_some(ch)
            })
            .collect();
        (kept, marker)
    };
    let used = display_width(&kept) + marker.len();
    format!("{kept}{marker}{}", " ".repeat(width.saturating_sub(used)))
}

/// Column widths for a header row plus body rows, clamped to [3, 40].
pub(crate) fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    (0..headers.len())
        .map(|c| {
            let header_w = display_width(&headers[c]);
            let max_cell = rows
                .iter()
                .map(|row| row.get(c).map(|s| display_width(s)).unwrap_or(0))
                .max()
                .unwrap_or(0);
            header_w.max(max_cell).clamp(3, 40)
        })
        .collect()
}
